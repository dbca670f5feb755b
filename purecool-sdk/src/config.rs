//! Session configuration
//!
//! Timeouts and intervals that govern a [`Session`](crate::Session). The
//! defaults match how the fans behave on a typical home network.

use std::time::Duration;

use crate::error::SdkError;

const CONNECT_TIMEOUT_VAR: &str = "PURECOOL_CONNECT_TIMEOUT_SECS";
const TELEMETRY_INTERVAL_VAR: &str = "PURECOOL_TELEMETRY_INTERVAL_SECS";

/// Configuration for a [`Session`](crate::Session)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long `connect` waits for the broker's connect result
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// MQTT keep-alive interval
    /// Default: 30 seconds
    pub keep_alive: Duration,

    /// Interval between environmental sensor requests while connected
    /// Default: 30 seconds
    pub telemetry_interval: Duration,

    /// Discovery attempts used by [`Session::connect_default`](crate::Session::connect_default)
    /// Default: 5
    pub default_retry_count: u32,

    /// Length of each discovery attempt used by `connect_default`
    /// Default: 5 seconds
    pub default_retry_timeout: Duration,

    /// Capacity of the transport's outgoing request queue
    /// Default: 10
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            keep_alive: Duration::from_secs(30),
            telemetry_interval: Duration::from_secs(30),
            default_retry_count: 5,
            default_retry_timeout: Duration::from_secs(5),
            channel_capacity: 10,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short timeouts for fans known to be on the local segment
    pub fn responsive() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            telemetry_interval: Duration::from_secs(10),
            default_retry_count: 3,
            default_retry_timeout: Duration::from_secs(2),
            ..Default::default()
        }
    }

    /// Infrequent telemetry for long-running monitors
    pub fn low_traffic() -> Self {
        Self {
            keep_alive: Duration::from_secs(60),
            telemetry_interval: Duration::from_secs(300),
            ..Default::default()
        }
    }

    /// Defaults overridden by `PURECOOL_CONNECT_TIMEOUT_SECS` and
    /// `PURECOOL_TELEMETRY_INTERVAL_SECS`
    ///
    /// # Errors
    ///
    /// `SdkError::Config` when a variable is set but is not a whole number of
    /// seconds, or the result fails [`validate`](Self::validate).
    pub fn from_env() -> Result<Self, SdkError> {
        let mut config = Self::default();

        if let Some(secs) = env_secs(CONNECT_TIMEOUT_VAR)? {
            config.connect_timeout = secs;
        }
        if let Some(secs) = env_secs(TELEMETRY_INTERVAL_VAR)? {
            config.telemetry_interval = secs;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SdkError> {
        if self.connect_timeout.is_zero() {
            return Err(SdkError::Config(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        if self.telemetry_interval.is_zero() {
            return Err(SdkError::Config(
                "Telemetry interval must be greater than 0".to_string(),
            ));
        }

        // rumqttc rejects keep-alive below one second
        if self.keep_alive < Duration::from_secs(1) {
            return Err(SdkError::Config(
                "Keep-alive must be at least 1 second".to_string(),
            ));
        }

        if self.channel_capacity == 0 {
            return Err(SdkError::Config(
                "Channel capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_secs(var: &str) -> Result<Option<Duration>, SdkError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| {
                SdkError::Config(format!("{} must be a number of seconds, got {:?}", var, value))
            }),
        Err(_) => Ok(None),
    }
}
