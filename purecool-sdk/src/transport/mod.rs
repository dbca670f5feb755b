//! Publish/subscribe transport seam
//!
//! A [`Connector`] opens one broker connection and returns two halves: a
//! [`TransportClient`] for outgoing requests, shared by every thread that
//! publishes, and an [`EventLoop`] owned by the session's delivery worker. The
//! production implementation is MQTT ([`MqttConnector`]).

mod mqtt;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;

pub use mqtt::MqttConnector;

/// Everything needed to open a broker connection
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerOptions {
    pub client_id: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub keep_alive: Duration,
    /// Capacity of the outgoing request queue
    pub channel_capacity: usize,
}

impl fmt::Debug for BrokerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerOptions")
            .field("client_id", &self.client_id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("keep_alive", &self.keep_alive)
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}

/// An event delivered by the transport's background loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connect result from the broker; `0` is success
    ConnAck(u8),
    /// A message on a subscribed topic
    Message { topic: String, payload: Vec<u8> },
    /// The connection is gone; no further events follow
    Closed(String),
}

/// Outgoing half of a connection
///
/// Calls never block on the network. Publishes are at-least-once.
pub trait TransportClient: Send + Sync {
    fn subscribe(&self, topic: &str) -> Result<(), TransportError>;

    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Ask the broker connection to close; the event loop then ends
    fn disconnect(&self) -> Result<(), TransportError>;
}

/// Incoming half of a connection
pub trait EventLoop: Send {
    /// Block until the next event; `None` once the connection has ended
    fn next_event(&mut self) -> Option<TransportEvent>;
}

/// Opens broker connections
pub trait Connector: Send + Sync {
    /// Prepare a connection to the broker in `options`
    ///
    /// The network handshake happens as the returned event loop is driven;
    /// its first event is the connect result.
    fn open(
        &self,
        options: &BrokerOptions,
    ) -> Result<(Arc<dyn TransportClient>, Box<dyn EventLoop>), TransportError>;
}
