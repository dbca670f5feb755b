//! # PureCool Link API - wire protocol types
//!
//! Everything needed to talk to a PureCool Link fan's local MQTT broker
//! without any I/O:
//!
//! - [`DeviceDescriptor`] parsed from the cloud manifest, with topic helpers
//! - [`credentials::decrypt_password`] for the manifest's encrypted broker
//!   password
//! - [`StatusMessage`] decoding of `CURRENT-STATE`, `STATE-CHANGE` and
//!   environmental sensor reports
//! - [`Command`] encoding, including partial `STATE-SET` updates built from a
//!   [`StateDelta`]
//!
//! ```rust
//! use purecool_api::{Command, FanMode, StateDelta, StatusMessage};
//!
//! let delta = StateDelta::new().fan_mode(FanMode::Auto);
//! let payload = Command::state_set(&delta, chrono::Utc::now()).to_payload().unwrap();
//! assert!(String::from_utf8(payload).unwrap().contains(r#""fmod":"AUTO""#));
//!
//! let status = br#"{"msg":"HELLO"}"#;
//! assert_eq!(StatusMessage::decode(status).unwrap().kind(), "HELLO");
//! ```

pub mod command;
pub mod credentials;
pub mod device;
pub mod error;
pub mod state;
pub mod values;

pub use command::{Command, StateDelta, STET};
pub use device::{DeviceDescriptor, DEFAULT_BROKER_PORT};
pub use error::{ApiError, Result};
pub use state::{DeviceState, EnvironmentalState, StateReport, StatusMessage};
pub use values::{
    FanMode, FanSpeed, FanState, NightMode, Oscillation, QualityTarget, ResetFilter,
    StandbyMonitoring,
};
