//! Address resolution for a single fan.
//!
//! Direct mode returns the caller's address untouched. Discovery mode browses
//! for the fan's broker announcement and accepts the first one whose instance
//! label matches `{product-type}_{serial}`; all others are dropped.

use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::browser::{Announcement, ServiceBrowser, SERVICE_TYPE};
use crate::error::{DiscoveryError, Result};
use crate::{DeviceLabel, NetworkAddress, DEFAULT_PORT};

/// How an address should be obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveMode {
    /// Use this host, on `port` or the default broker port
    Direct { host: String, port: Option<u16> },
    /// Listen for announcements for `retry_count` windows of `retry_timeout`
    Discover {
        retry_count: u32,
        retry_timeout: Duration,
    },
}

/// Resolves a fan's broker address
pub struct Resolver {
    browser: Arc<dyn ServiceBrowser>,
}

impl Resolver {
    pub fn new(browser: Arc<dyn ServiceBrowser>) -> Self {
        Self { browser }
    }

    /// Resolve `label` according to `mode`
    ///
    /// `name` becomes the name of a directly given address.
    ///
    /// # Errors
    ///
    /// `DiscoveryError::Timeout` when discovery ran out of attempts,
    /// `DiscoveryError::Browser` when the browser could not be started.
    pub fn resolve(
        &self,
        name: &str,
        label: &DeviceLabel,
        mode: &ResolveMode,
    ) -> Result<NetworkAddress> {
        match mode {
            ResolveMode::Direct { host, port } => Ok(NetworkAddress::new(
                name,
                host.clone(),
                port.unwrap_or(DEFAULT_PORT),
            )),
            ResolveMode::Discover {
                retry_count,
                retry_timeout,
            } => self.discover(label, *retry_count, *retry_timeout),
        }
    }

    fn discover(
        &self,
        label: &DeviceLabel,
        retry_count: u32,
        retry_timeout: Duration,
    ) -> Result<NetworkAddress> {
        let mut browse = self.browser.browse(SERVICE_TYPE)?;

        for attempt in 1..=retry_count {
            tracing::debug!(
                "Waiting for {} announcement (attempt {}/{})",
                label,
                attempt,
                retry_count
            );
            let deadline = Instant::now() + retry_timeout;

            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }

                match browse.recv_timeout(remaining) {
                    Ok(announcement) => {
                        if let Some(address) = Self::accept(label, &announcement) {
                            tracing::info!(
                                "Discovered {} at {}:{}",
                                label,
                                address.host,
                                address.port
                            );
                            return Ok(address);
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => break,
                    Err(RecvTimeoutError::Disconnected) => {
                        tracing::warn!("Service browse ended before {} was found", label);
                        return Err(DiscoveryError::Timeout);
                    }
                }
            }
        }

        tracing::info!("No announcement for {} after {} attempts", label, retry_count);
        Err(DiscoveryError::Timeout)
    }

    fn accept(label: &DeviceLabel, announcement: &Announcement) -> Option<NetworkAddress> {
        let announced = parse_instance_label(&announcement.instance)?;
        if announced != *label {
            return None;
        }

        Some(NetworkAddress::new(
            announced.serial,
            announcement.host.clone(),
            announcement.port,
        ))
    }
}

/// Extract the device label from a full instance name
///
/// `475_AB-CD-1234._dyson_mqtt._tcp.local.` yields product type `475` and
/// serial `AB-CD-1234`.
pub fn parse_instance_label(instance: &str) -> Option<DeviceLabel> {
    let label = instance.split('.').next()?;
    let (product_type, serial) = label.split_once('_')?;
    if product_type.is_empty() || serial.is_empty() {
        return None;
    }

    Some(DeviceLabel::new(product_type, serial))
}
