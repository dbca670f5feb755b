//! MQTT transport on rumqttc's synchronous client

use std::sync::Arc;

use rumqttc::{
    Client, ConnectReturnCode, Connection, ConnectionError, Event, MqttOptions, Packet, QoS,
};

use super::{BrokerOptions, Connector, EventLoop, TransportClient, TransportEvent};
use crate::error::TransportError;

/// Connects to the fan's MQTT 3.1.1 broker
#[derive(Debug, Default, Clone)]
pub struct MqttConnector;

impl MqttConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for MqttConnector {
    fn open(
        &self,
        options: &BrokerOptions,
    ) -> Result<(Arc<dyn TransportClient>, Box<dyn EventLoop>), TransportError> {
        if options.host.is_empty() {
            return Err(TransportError::Connect("Broker host is empty".to_string()));
        }

        let mut mqtt_options =
            MqttOptions::new(options.client_id.clone(), options.host.clone(), options.port);
        mqtt_options.set_keep_alive(options.keep_alive);
        mqtt_options.set_credentials(options.username.clone(), options.password.clone());
        mqtt_options.set_clean_session(true);

        let (client, connection) = Client::new(mqtt_options, options.channel_capacity);

        tracing::debug!(
            "Opening MQTT connection to {}:{} as {}",
            options.host,
            options.port,
            options.username
        );

        Ok((
            Arc::new(MqttClient { client }),
            Box::new(MqttEventLoop {
                connection,
                finished: false,
            }),
        ))
    }
}

struct MqttClient {
    client: Client,
}

impl TransportClient for MqttClient {
    fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.client
            .try_subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| TransportError::Subscribe(e.to_string()))
    }

    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        self.client
            .try_publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| TransportError::Publish(e.to_string()))
    }

    fn disconnect(&self) -> Result<(), TransportError> {
        self.client
            .try_disconnect()
            .map_err(|e| TransportError::Disconnect(e.to_string()))
    }
}

struct MqttEventLoop {
    connection: Connection,
    finished: bool,
}

impl EventLoop for MqttEventLoop {
    fn next_event(&mut self) -> Option<TransportEvent> {
        // rumqttc reconnects when iterated past an error, so the loop ends
        // at the first one
        while !self.finished {
            let event = match self.connection.iter().next() {
                Some(event) => event,
                None => {
                    self.finished = true;
                    return Some(TransportEvent::Closed("request queue closed".to_string()));
                }
            };

            match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    return Some(TransportEvent::ConnAck(return_code(ack.code)));
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return Some(TransportEvent::Message {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    });
                }
                Ok(_) => {}
                Err(ConnectionError::ConnectionRefused(code)) => {
                    self.finished = true;
                    return Some(TransportEvent::ConnAck(return_code(code)));
                }
                Err(e) => {
                    self.finished = true;
                    return Some(TransportEvent::Closed(e.to_string()));
                }
            }
        }

        None
    }
}

fn return_code(code: ConnectReturnCode) -> u8 {
    match code {
        ConnectReturnCode::Success => 0,
        ConnectReturnCode::RefusedProtocolVersion => 1,
        ConnectReturnCode::BadClientId => 2,
        ConnectReturnCode::ServiceUnavailable => 3,
        ConnectReturnCode::BadUserNamePassword => 4,
        ConnectReturnCode::NotAuthorized => 5,
    }
}
