//! A single fan's connection lifecycle
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──ConnAck 0──▶ Connected
//!      ▲                        │                        │
//!      └──── failure ───────────┘                        │
//!      └──── refused / connection lost / disconnect ─────┘
//! ```
//!
//! The connection status is the one gate consulted before every publish.

use std::fmt;
use std::sync::mpsc;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use purecool_api::{
    DeviceDescriptor, DeviceState, EnvironmentalState, StateDelta, StatusMessage,
};
use purecool_discovery::{
    DeviceLabel, MdnsBrowser, NetworkAddress, ResolveMode, Resolver, ServiceBrowser,
};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::listeners::{dispatch, ListenerId, ListenerRegistry};
use crate::poller::Poller;
use crate::sequencer::Sequencer;
use crate::transport::{BrokerOptions, Connector, MqttConnector, TransportClient};
use crate::worker::spawn_delivery_worker;

/// Connection status of a [`Session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
        }
    }
}

/// A broker address supplied by the caller, skipping discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectAddress {
    pub host: String,
    /// Defaults to 1883
    pub port: Option<u16>,
}

impl DirectAddress {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }
}

/// State shared between the caller, the delivery worker and the poller
///
/// Every connection attempt runs under its own epoch. A delivery worker only
/// changes shared state while its epoch is still the current one.
pub(crate) struct Inner {
    status_topic: String,
    epoch: Mutex<u64>,
    telemetry_interval: Duration,
    status: RwLock<ConnectionStatus>,
    state: RwLock<Option<Arc<DeviceState>>>,
    environment: RwLock<Option<Arc<EnvironmentalState>>>,
    listeners: Mutex<ListenerRegistry>,
    status_subscribers: Mutex<Vec<mpsc::Sender<ConnectionStatus>>>,
    client: RwLock<Option<Arc<dyn TransportClient>>>,
    poller: Mutex<Option<Poller>>,
    sequencer: Sequencer,
}

impl Inner {
    fn new(descriptor: &DeviceDescriptor, config: &SessionConfig) -> Self {
        Self {
            status_topic: descriptor.status_topic(),
            epoch: Mutex::new(0),
            telemetry_interval: config.telemetry_interval,
            status: RwLock::new(ConnectionStatus::Disconnected),
            state: RwLock::new(None),
            environment: RwLock::new(None),
            listeners: Mutex::new(ListenerRegistry::default()),
            status_subscribers: Mutex::new(Vec::new()),
            client: RwLock::new(None),
            poller: Mutex::new(None),
            sequencer: Sequencer::new(descriptor.command_topic()),
        }
    }

    pub(crate) fn status_topic(&self) -> &str {
        &self.status_topic
    }

    /// Start a new epoch, retiring the worker of the previous one
    fn next_epoch(&self) -> u64 {
        let mut epoch = self.epoch.lock();
        *epoch += 1;
        *epoch
    }

    /// Run `f` only if `epoch` is current, holding the epoch for its duration
    pub(crate) fn in_epoch<R>(&self, epoch: u64, f: impl FnOnce() -> R) -> Option<R> {
        let current = self.epoch.lock();
        if *current != epoch {
            return None;
        }
        Some(f())
    }

    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        *self.epoch.lock() == epoch
    }

    pub(crate) fn set_status(&self, new: ConnectionStatus) {
        let mut status = self.status.write();
        if *status == new {
            return;
        }
        tracing::info!("Session {} -> {}", *status, new);
        *status = new;
        self.status_subscribers.lock().retain(|tx| tx.send(new).is_ok());
    }

    fn connected_client(&self) -> Option<Arc<dyn TransportClient>> {
        if *self.status.read() != ConnectionStatus::Connected {
            return None;
        }
        self.client.read().clone()
    }

    fn request_current_state(&self) -> Option<u64> {
        let client = self.connected_client()?;
        self.sequencer.request_current_state(client.as_ref())
    }

    fn request_environmental_state(&self) -> Option<u64> {
        let client = self.connected_client()?;
        self.sequencer.request_environmental_state(client.as_ref())
    }

    fn set_configuration(&self, delta: &StateDelta) -> Option<u64> {
        let client = self.connected_client()?;
        if self.state.read().is_none() {
            tracing::debug!("No state snapshot yet, ignoring configuration change");
            return None;
        }
        self.sequencer.set_configuration(client.as_ref(), delta)
    }

    /// Start telemetry polling, replacing any previous poller
    pub(crate) fn start_poller(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let poller = Poller::spawn(self.telemetry_interval, move || {
            if let Some(inner) = weak.upgrade() {
                inner.request_environmental_state();
            }
        });

        let previous = self.poller.lock().replace(poller);
        if let Some(previous) = previous {
            previous.stop();
        }
    }

    /// Wake the poller so it exits; joined later by `stop_poller`
    pub(crate) fn signal_poller_stop(&self) {
        if let Some(poller) = self.poller.lock().as_mut() {
            poller.signal_stop();
        }
    }

    fn stop_poller(&self) {
        let poller = self.poller.lock().take();
        if let Some(poller) = poller {
            poller.stop();
        }
    }

    /// Decode a status-topic message, update the snapshot, then run listeners
    pub(crate) fn deliver(&self, topic: &str, payload: &[u8]) {
        if topic != self.status_topic {
            tracing::debug!("Ignoring message on unexpected topic {}", topic);
            return;
        }

        let message = match StatusMessage::decode(payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Dropping status message: {}", e);
                return;
            }
        };
        tracing::debug!("Received {}", message.kind());

        match &message {
            StatusMessage::State(state) => *self.state.write() = Some(Arc::clone(state)),
            StatusMessage::Environment(env) => *self.environment.write() = Some(Arc::clone(env)),
            StatusMessage::Other { .. } => {}
        }

        let listeners = self.listeners.lock().snapshot();
        dispatch(&listeners, &message);
    }
}

/// Session with one PureCool Link fan
///
/// Created from a manifest [`DeviceDescriptor`]. `connect` is the only call
/// that blocks; everything else may be used from any thread while the
/// delivery worker runs.
///
/// # Example
///
/// ```rust,no_run
/// use purecool_api::{DeviceDescriptor, FanMode, StateDelta};
/// use purecool_sdk::{DirectAddress, Session};
///
/// # fn run(descriptor: DeviceDescriptor) -> Result<(), purecool_sdk::SdkError> {
/// let session = Session::new(descriptor)?;
/// if session.connect_default(Some(DirectAddress::new("192.168.0.2")))? {
///     session.set_configuration(&StateDelta::new().fan_mode(FanMode::Auto));
///     session.disconnect();
/// }
/// # Ok(())
/// # }
/// ```
pub struct Session {
    descriptor: DeviceDescriptor,
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    resolver: Resolver,
    inner: Arc<Inner>,
    address: RwLock<Option<NetworkAddress>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Session over MQTT with mDNS discovery and default configuration
    pub fn new(descriptor: DeviceDescriptor) -> Result<Self> {
        Self::builder(descriptor).build()
    }

    pub fn builder(descriptor: DeviceDescriptor) -> SessionBuilder {
        SessionBuilder::new(descriptor)
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Connect to the fan's broker
    ///
    /// With `address_hint` the given host is used as is. Without one, the
    /// fan is discovered with `retry_count` attempts of `retry_timeout`
    /// each. Returns `Ok(false)` if discovery ran out or the broker did not
    /// accept the connection; everything opened so far is torn down first.
    /// On success one current-state request is published so a snapshot
    /// follows shortly.
    ///
    /// # Errors
    ///
    /// `SdkError::Credential` if the manifest credential cannot be
    /// decrypted, `SdkError::Transport` if the connection cannot be opened.
    pub fn connect(
        &self,
        address_hint: Option<DirectAddress>,
        retry_count: u32,
        retry_timeout: Duration,
    ) -> Result<bool> {
        let password = self.descriptor.broker_password()?;

        self.disconnect();
        self.inner.set_status(ConnectionStatus::Connecting);

        let mode = match address_hint {
            Some(direct) => ResolveMode::Direct {
                host: direct.host,
                port: direct.port,
            },
            None => ResolveMode::Discover {
                retry_count,
                retry_timeout,
            },
        };
        let label = DeviceLabel::new(self.descriptor.product_type(), self.descriptor.serial());

        let address = match self.resolver.resolve(self.descriptor.name(), &label, &mode) {
            Ok(address) => address,
            Err(e) => {
                tracing::info!("Could not resolve {}: {}", self.descriptor, e);
                self.inner.set_status(ConnectionStatus::Disconnected);
                return Ok(false);
            }
        };
        tracing::info!("Connecting to {} at {}", self.descriptor, address);

        let options = BrokerOptions {
            client_id: client_id(),
            host: address.host.clone(),
            port: address.port,
            username: self.descriptor.serial().to_string(),
            password,
            keep_alive: self.config.keep_alive,
            channel_capacity: self.config.channel_capacity,
        };
        *self.address.write() = Some(address);

        let (client, events) = match self.connector.open(&options) {
            Ok(opened) => opened,
            Err(e) => {
                self.inner.set_status(ConnectionStatus::Disconnected);
                return Err(e.into());
            }
        };
        *self.inner.client.write() = Some(Arc::clone(&client));

        let epoch = self.inner.next_epoch();
        let (connect_tx, connect_rx) = mpsc::channel();
        let handle =
            spawn_delivery_worker(Arc::clone(&self.inner), epoch, client, events, connect_tx);
        *self.worker.lock() = Some(handle);

        let connected = matches!(connect_rx.recv_timeout(self.config.connect_timeout), Ok(true));
        if !connected {
            tracing::info!("Connection to {} failed", self.descriptor);
            self.disconnect();
            return Ok(false);
        }

        self.inner.request_current_state();
        Ok(true)
    }

    /// [`connect`](Self::connect) with the configured retry policy
    pub fn connect_default(&self, address_hint: Option<DirectAddress>) -> Result<bool> {
        self.connect(
            address_hint,
            self.config.default_retry_count,
            self.config.default_retry_timeout,
        )
    }

    /// Close the connection and stop background threads
    ///
    /// Safe to call at any time. When it returns, the poller has stopped and
    /// no listener will run again, except when called from a listener: the
    /// delivery worker then finishes on its own once the connection closes.
    pub fn disconnect(&self) {
        self.inner.next_epoch();

        let client = self.inner.client.write().take();
        if let Some(client) = client {
            if let Err(e) = client.disconnect() {
                tracing::debug!("Disconnect request failed: {}", e);
            }
        }

        self.inner.stop_poller();

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                tracing::debug!("Disconnect requested from the delivery thread");
            } else if handle.join().is_err() {
                tracing::warn!("Delivery worker panicked");
            }
        }
        self.inner.stop_poller();

        self.inner.set_status(ConnectionStatus::Disconnected);
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.inner.status.read()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Receive every status transition from now on
    pub fn subscribe_status(&self) -> mpsc::Receiver<ConnectionStatus> {
        let (tx, rx) = mpsc::channel();
        self.inner.status_subscribers.lock().push(tx);
        rx
    }

    /// Last decoded state snapshot, if any arrived yet
    pub fn state(&self) -> Option<Arc<DeviceState>> {
        self.inner.state.read().clone()
    }

    /// Last environmental sensor report
    pub fn environment(&self) -> Option<Arc<EnvironmentalState>> {
        self.inner.environment.read().clone()
    }

    /// Address of the most recent connection attempt
    pub fn address(&self) -> Option<NetworkAddress> {
        self.address.read().clone()
    }

    /// Register a listener for every decoded status message
    ///
    /// Listeners run on the delivery thread in registration order, after the
    /// snapshot has been updated.
    pub fn add_message_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StatusMessage) + Send + Sync + 'static,
    {
        self.inner.listeners.lock().add(Arc::new(listener))
    }

    /// Remove a listener; unknown ids are ignored
    pub fn remove_message_listener(&self, id: ListenerId) {
        if !self.inner.listeners.lock().remove(id) {
            tracing::debug!("{} was not registered", id);
        }
    }

    pub fn clear_message_listeners(&self) {
        self.inner.listeners.lock().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Ask the fan for a full state snapshot
    ///
    /// Returns the sequence number of the publish, or `None` when not
    /// connected.
    pub fn request_current_state(&self) -> Option<u64> {
        self.inner.request_current_state()
    }

    /// Change the fields set in `delta`; all others are left as they are
    ///
    /// `None` when not connected or before the first state snapshot.
    pub fn set_configuration(&self, delta: &StateDelta) -> Option<u64> {
        self.inner.set_configuration(delta)
    }

    /// Ask the fan for its environmental sensor readings
    pub fn request_environmental_state(&self) -> Option<u64> {
        self.inner.request_environmental_state()
    }

    /// Number of publishes accepted by the transport so far
    pub fn publish_count(&self) -> u64 {
        self.inner.sequencer.count()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("device", &self.descriptor)
            .field("status", &self.status())
            .field("address", &self.address())
            .finish()
    }
}

fn client_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("purecool-{}", &id[..12])
}

/// Builder for [`Session`]
pub struct SessionBuilder {
    descriptor: DeviceDescriptor,
    config: SessionConfig,
    connector: Option<Arc<dyn Connector>>,
    browser: Option<Arc<dyn ServiceBrowser>>,
}

impl SessionBuilder {
    fn new(descriptor: DeviceDescriptor) -> Self {
        Self {
            descriptor,
            config: SessionConfig::default(),
            connector: None,
            browser: None,
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a different transport (default: MQTT)
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Use a different discovery browser (default: mDNS)
    pub fn with_browser(mut self, browser: Arc<dyn ServiceBrowser>) -> Self {
        self.browser = Some(browser);
        self
    }

    /// # Errors
    ///
    /// `SdkError::Config` if the configuration does not validate.
    pub fn build(self) -> Result<Session> {
        self.config.validate()?;

        let connector = self.connector.unwrap_or_else(|| Arc::new(MqttConnector::new()));
        let browser = self.browser.unwrap_or_else(|| Arc::new(MdnsBrowser::new()));
        let inner = Arc::new(Inner::new(&self.descriptor, &self.config));

        Ok(Session {
            descriptor: self.descriptor,
            config: self.config,
            connector,
            resolver: Resolver::new(browser),
            inner,
            address: RwLock::new(None),
            worker: Mutex::new(None),
        })
    }
}
