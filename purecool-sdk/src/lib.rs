//! # PureCool Link SDK - sync sessions for PureCool Link fans
//!
//! Connects to a fan's local MQTT broker with the credential from the cloud
//! manifest, keeps the latest decoded state, and sends partial configuration
//! changes.
//!
//! ```rust,no_run
//! use purecool_api::{DeviceDescriptor, FanMode, FanSpeed, StateDelta};
//! use purecool_sdk::Session;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     purecool_sdk::logging::init_logging_from_env()?;
//!
//!     let manifest = std::fs::read_to_string("manifest.json")?;
//!     let descriptor = DeviceDescriptor::from_manifest(&manifest)?.remove(0);
//!
//!     let session = Session::new(descriptor)?;
//!     session.add_message_listener(|message| println!("{:?}", message));
//!
//!     // Discover the fan with the configured retry policy
//!     if session.connect_default(None)? {
//!         std::thread::sleep(std::time::Duration::from_secs(2));
//!         session.set_configuration(
//!             &StateDelta::new().fan_mode(FanMode::Fan).fan_speed(FanSpeed::Speed4),
//!         );
//!     }
//!
//!     session.disconnect();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Session (connect / commands / listeners)
//!     ├── Resolver (purecool-discovery, mDNS)
//!     ├── Connector → TransportClient + EventLoop (MQTT)
//!     ├── delivery worker thread (state machine over transport events)
//!     └── telemetry poller thread (environmental requests)
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod transport;

mod listeners;
mod poller;
mod sequencer;
mod session;
mod worker;

pub use config::SessionConfig;
pub use error::{Result, SdkError, TransportError};
pub use listeners::{ListenerId, MessageListener};
pub use session::{ConnectionStatus, DirectAddress, Session, SessionBuilder};

pub use purecool_api::{
    DeviceDescriptor, DeviceState, EnvironmentalState, StateDelta, StatusMessage,
};
pub use purecool_discovery::NetworkAddress;
