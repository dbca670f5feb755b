//! Device descriptors from the cloud manifest

use std::fmt;

use serde::Deserialize;

use crate::credentials;
use crate::error::{ApiError, Result};

/// Default port of the fan's local MQTT broker
pub const DEFAULT_BROKER_PORT: u16 = 1883;

/// One entry of the account manifest
///
/// Immutable once parsed. The credential stays encrypted until
/// [`DeviceDescriptor::broker_password`] is called, and is left out of the
/// `Debug` summary.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceDescriptor {
    serial: String,
    name: String,
    product_type: String,
    version: String,
    active: bool,
    auto_update: bool,
    new_version_available: bool,
    #[serde(rename = "LocalCredentials")]
    credentials: String,
}

impl DeviceDescriptor {
    /// Build a descriptor by hand, mainly for direct connections and tests
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        serial: impl Into<String>,
        name: impl Into<String>,
        product_type: impl Into<String>,
        version: impl Into<String>,
        active: bool,
        auto_update: bool,
        new_version_available: bool,
        credentials: impl Into<String>,
    ) -> Self {
        Self {
            serial: serial.into(),
            name: name.into(),
            product_type: product_type.into(),
            version: version.into(),
            active,
            auto_update,
            new_version_available,
            credentials: credentials.into(),
        }
    }

    /// Parse the manifest array returned by the account API
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Manifest` if the JSON is not an array of device
    /// entries.
    pub fn from_manifest(json: &str) -> Result<Vec<Self>> {
        serde_json::from_str(json).map_err(|e| ApiError::Manifest(e.to_string()))
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn product_type(&self) -> &str {
        &self.product_type
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn auto_update(&self) -> bool {
        self.auto_update
    }

    pub fn new_version_available(&self) -> bool {
        self.new_version_available
    }

    /// Decrypt the manifest credential into the broker password
    pub fn broker_password(&self) -> Result<String> {
        credentials::decrypt_password(&self.credentials)
    }

    /// Topic commands are published to
    pub fn command_topic(&self) -> String {
        format!("{}/{}/command", self.product_type, self.serial)
    }

    /// Topic the fan publishes its status on
    pub fn status_topic(&self) -> String {
        format!("{}/{}/status/current", self.product_type, self.serial)
    }

    /// Label the fan announces itself under on the local network
    pub fn discovery_label(&self) -> String {
        format!("{}_{}", self.product_type, self.serial)
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.serial)
    }
}

impl fmt::Debug for DeviceDescriptor {
    /// Serial, active, name, version, both update flags, then product type
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DeviceDescriptor({},{},{},{},{},{},{})",
            self.serial,
            self.active,
            self.name,
            self.version,
            self.auto_update,
            self.new_version_available,
            self.product_type
        )
    }
}
