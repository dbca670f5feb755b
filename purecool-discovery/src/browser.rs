//! Service browsing: the seam between the resolver and the network.
//!
//! [`ServiceBrowser`] starts a browse for one service type and hands back a
//! [`Browse`] that yields resolved announcements. [`MdnsBrowser`] implements
//! it on multicast DNS.

use std::net::IpAddr;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use mdns_sd::{Receiver, ServiceDaemon, ServiceEvent, ServiceInfo};

use crate::error::{DiscoveryError, Result};

/// mDNS service type PureCool Link fans announce their broker under
pub const SERVICE_TYPE: &str = "_dyson_mqtt._tcp.local.";

/// A resolved service announcement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// Full instance name, e.g. `475_AB-CD-1234._dyson_mqtt._tcp.local.`
    pub instance: String,
    pub host: String,
    pub port: u16,
}

/// Starts browses for a service type
pub trait ServiceBrowser: Send + Sync {
    fn browse(&self, service_type: &str) -> Result<Box<dyn Browse>>;
}

/// A running browse
///
/// Dropping it stops the browse.
pub trait Browse: Send {
    /// Wait up to `timeout` for the next announcement
    ///
    /// Returns `Timeout` when nothing arrived in time and `Disconnected` when
    /// the browse has ended for good.
    fn recv_timeout(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<Announcement, RecvTimeoutError>;
}

/// Multicast DNS browser
///
/// Each browse owns its own daemon, which is shut down when the browse is
/// dropped.
#[derive(Debug, Default, Clone)]
pub struct MdnsBrowser;

impl MdnsBrowser {
    pub fn new() -> Self {
        Self
    }
}

impl ServiceBrowser for MdnsBrowser {
    fn browse(&self, service_type: &str) -> Result<Box<dyn Browse>> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| DiscoveryError::Browser(format!("Failed to start mDNS daemon: {}", e)))?;
        let receiver = daemon.browse(service_type).map_err(|e| {
            DiscoveryError::Browser(format!("Failed to browse {}: {}", service_type, e))
        })?;

        tracing::debug!("Browsing for {}", service_type);

        Ok(Box::new(MdnsBrowse {
            daemon,
            receiver,
            service_type: service_type.to_string(),
        }))
    }
}

struct MdnsBrowse {
    daemon: ServiceDaemon,
    receiver: Receiver<ServiceEvent>,
    service_type: String,
}

impl MdnsBrowse {
    fn to_announcement(info: &ServiceInfo) -> Option<Announcement> {
        let addresses = info.get_addresses();
        let ip: &IpAddr = addresses
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addresses.iter().next())?;

        Some(Announcement {
            instance: info.get_fullname().to_string(),
            host: ip.to_string(),
            port: info.get_port(),
        })
    }
}

impl Browse for MdnsBrowse {
    fn recv_timeout(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<Announcement, RecvTimeoutError> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(RecvTimeoutError::Timeout);
            }

            match self.receiver.recv_timeout(remaining) {
                Ok(ServiceEvent::ServiceResolved(info)) => {
                    if let Some(announcement) = Self::to_announcement(&info) {
                        return Ok(announcement);
                    }
                    tracing::debug!("Ignoring {} without addresses", info.get_fullname());
                }
                // Found/removed/search events carry no address
                Ok(_) => {}
                Err(_) if self.receiver.is_disconnected() => {
                    return Err(RecvTimeoutError::Disconnected)
                }
                Err(_) => return Err(RecvTimeoutError::Timeout),
            }
        }
    }
}

impl Drop for MdnsBrowse {
    fn drop(&mut self) {
        if let Err(e) = self.daemon.stop_browse(&self.service_type) {
            tracing::debug!("Failed to stop browsing {}: {}", self.service_type, e);
        }
        if let Err(e) = self.daemon.shutdown() {
            tracing::debug!("Failed to shut down mDNS daemon: {}", e);
        }
    }
}
