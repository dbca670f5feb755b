//! Outgoing command sequencing
//!
//! Every accepted publish is stamped with the next value of a per-session
//! counter. The counter only moves when the transport accepts the publish,
//! and counting and publishing happen under one lock so numbers follow
//! publish order.

use chrono::Utc;
use parking_lot::Mutex;
use purecool_api::{Command, StateDelta};

use crate::transport::TransportClient;

pub(crate) struct Sequencer {
    topic: String,
    counter: Mutex<u64>,
}

impl Sequencer {
    pub(crate) fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            counter: Mutex::new(0),
        }
    }

    /// Number of publishes accepted so far
    pub(crate) fn count(&self) -> u64 {
        *self.counter.lock()
    }

    pub(crate) fn request_current_state(&self, client: &dyn TransportClient) -> Option<u64> {
        self.publish(client, Command::request_current_state(Utc::now()))
    }

    pub(crate) fn request_environmental_state(&self, client: &dyn TransportClient) -> Option<u64> {
        self.publish(client, Command::request_environment(Utc::now()))
    }

    pub(crate) fn set_configuration(
        &self,
        client: &dyn TransportClient,
        delta: &StateDelta,
    ) -> Option<u64> {
        self.publish(client, Command::state_set(delta, Utc::now()))
    }

    fn publish(&self, client: &dyn TransportClient, command: Command) -> Option<u64> {
        let payload = match command.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to encode {}: {}", command.kind(), e);
                return None;
            }
        };

        let mut counter = self.counter.lock();
        match client.publish(&self.topic, payload) {
            Ok(()) => {
                *counter += 1;
                tracing::debug!("Published {} #{} to {}", command.kind(), *counter, self.topic);
                Some(*counter)
            }
            Err(e) => {
                tracing::warn!("Failed to publish {}: {}", command.kind(), e);
                None
            }
        }
    }
}
