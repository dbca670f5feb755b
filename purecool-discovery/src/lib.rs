//! PureCool Link address resolution
//!
//! This crate finds the local MQTT broker of a PureCool Link fan, either from
//! an address the caller already knows or by listening for the fan's mDNS
//! announcement.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use purecool_discovery::{DeviceLabel, MdnsBrowser, ResolveMode, Resolver};
//!
//! let resolver = Resolver::new(Arc::new(MdnsBrowser::new()));
//! let label = DeviceLabel::new("475", "AB-CD-1234");
//! let mode = ResolveMode::Discover {
//!     retry_count: 5,
//!     retry_timeout: Duration::from_secs(5),
//! };
//!
//! match resolver.resolve("Living room", &label, &mode) {
//!     Ok(address) => println!("Broker at {}:{}", address.host, address.port),
//!     Err(e) => println!("Not found: {}", e),
//! }
//! ```

use std::fmt;

mod browser;
mod error;
mod resolver;

pub use browser::{Announcement, Browse, MdnsBrowser, ServiceBrowser, SERVICE_TYPE};
pub use error::{DiscoveryError, Result};
pub use resolver::{parse_instance_label, ResolveMode, Resolver};

/// Default port of the fan's MQTT broker
pub const DEFAULT_PORT: u16 = 1883;

/// The `{product-type}_{serial}` pair a fan announces itself under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceLabel {
    pub product_type: String,
    pub serial: String,
}

impl DeviceLabel {
    pub fn new(product_type: impl Into<String>, serial: impl Into<String>) -> Self {
        Self {
            product_type: product_type.into(),
            serial: serial.into(),
        }
    }
}

impl fmt::Display for DeviceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.product_type, self.serial)
    }
}

/// A resolved broker address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAddress {
    /// Device name for direct addresses, serial for discovered ones
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl NetworkAddress {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NetworkAddress({},{},{})", self.name, self.host, self.port)
    }
}
