//! Status message decoding
//!
//! The fan publishes JSON on its `status/current` topic. Full snapshots
//! (`CURRENT-STATE`) carry each product-state field as a token; change reports
//! (`STATE-CHANGE`) carry `[old, new]` pairs. Both decode into the same flat
//! [`DeviceState`], taking the new value of each pair. Environmental sensor
//! reports decode into [`EnvironmentalState`].

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{ApiError, Result};
use crate::values::{
    FanMode, FanSpeed, FanState, NightMode, Oscillation, QualityTarget, StandbyMonitoring,
};

pub const MSG_CURRENT_STATE: &str = "CURRENT-STATE";
pub const MSG_STATE_CHANGE: &str = "STATE-CHANGE";
pub const MSG_ENVIRONMENTAL_DATA: &str = "ENVIRONMENTAL-CURRENT-SENSOR-DATA";

/// Kind of product-state report a [`DeviceState`] was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateReport {
    /// Full snapshot
    Current,
    /// Old/new deltas after a command took effect
    Change,
}

/// Decoded snapshot of the fan's reported status
///
/// A new value is built for every status message; it is never patched in
/// place.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    pub report: StateReport,
    pub fan_mode: FanMode,
    pub fan_state: FanState,
    pub fan_speed: FanSpeed,
    pub oscillation: Oscillation,
    pub night_mode: NightMode,
    pub quality_target: QualityTarget,
    pub standby_monitoring: StandbyMonitoring,
    /// Minutes left on the sleep timer, `None` when the timer is off
    pub sleep_timer: Option<u16>,
    /// Remaining filter life in hours, as reported
    pub filter_life: String,
    pub time: Option<String>,
    pub mode_reason: Option<String>,
    pub state_reason: Option<String>,
    pub error_code: Option<String>,
    pub warning_code: Option<String>,
}

impl DeviceState {
    /// Decode a `CURRENT-STATE` or `STATE-CHANGE` payload
    pub fn from_json(payload: &[u8]) -> Result<Self> {
        let root = parse_root(payload)?;
        let kind = message_kind(&root)?;
        Self::from_root(kind, &root)
    }

    fn from_root(kind: &str, root: &Map<String, Value>) -> Result<Self> {
        let report = match kind {
            MSG_CURRENT_STATE => StateReport::Current,
            MSG_STATE_CHANGE => StateReport::Change,
            other => {
                return Err(ApiError::MalformedStatus(format!(
                    "not a product-state message: {}",
                    other
                )))
            }
        };

        let product = root
            .get("product-state")
            .and_then(Value::as_object)
            .ok_or_else(|| ApiError::MalformedStatus("missing product-state".to_string()))?;

        Ok(Self {
            report,
            fan_mode: FanMode::from_wire(required(product, "fmod")?),
            fan_state: FanState::from_wire(required(product, "fnst")?),
            fan_speed: FanSpeed::from_wire(required(product, "fnsp")?),
            oscillation: Oscillation::from_wire(required(product, "oson")?),
            night_mode: NightMode::from_wire(required(product, "nmod")?),
            quality_target: QualityTarget::from_wire(required(product, "qtar")?),
            standby_monitoring: StandbyMonitoring::from_wire(required(product, "rhtm")?),
            sleep_timer: optional(product, "sltm").and_then(parse_reading),
            filter_life: required(product, "filf")?.to_string(),
            time: top_level(root, "time"),
            mode_reason: top_level(root, "mode-reason"),
            state_reason: top_level(root, "state-reason"),
            error_code: optional(product, "ercd").map(str::to_string),
            warning_code: optional(product, "wacd").map(str::to_string),
        })
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DeviceState({},{},{},{},{},{},{},{})",
            self.fan_mode,
            self.fan_state,
            self.night_mode,
            self.fan_speed,
            self.oscillation,
            self.filter_life,
            self.quality_target,
            self.standby_monitoring
        )
    }
}

/// Decoded environmental sensor report
///
/// Sensors report `OFF` or `INIT` while warming up or when monitoring is
/// disabled; those readings decode to `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentalState {
    /// Relative humidity in percent
    pub humidity: Option<u16>,
    /// Volatile organic compounds index
    pub volatile_compounds: Option<u16>,
    /// Temperature in Kelvin
    pub temperature: Option<f32>,
    /// Dust index
    pub dust: Option<u16>,
    /// Minutes left on the sleep timer
    pub sleep_timer: Option<u16>,
    pub time: Option<String>,
}

impl EnvironmentalState {
    /// Decode an `ENVIRONMENTAL-CURRENT-SENSOR-DATA` payload
    pub fn from_json(payload: &[u8]) -> Result<Self> {
        let root = parse_root(payload)?;
        match message_kind(&root)? {
            MSG_ENVIRONMENTAL_DATA => Self::from_root(&root),
            other => Err(ApiError::MalformedStatus(format!(
                "not an environmental message: {}",
                other
            ))),
        }
    }

    fn from_root(root: &Map<String, Value>) -> Result<Self> {
        let data = root
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| ApiError::MalformedStatus("missing data".to_string()))?;

        Ok(Self {
            humidity: optional(data, "hact").and_then(parse_reading),
            volatile_compounds: optional(data, "vact").and_then(parse_reading),
            // Tenths of a Kelvin on the wire
            temperature: optional(data, "tact")
                .and_then(parse_reading)
                .map(|tenths| f32::from(tenths) / 10.0),
            dust: optional(data, "pact").and_then(parse_reading),
            sleep_timer: optional(data, "sltm").and_then(parse_reading),
            time: top_level(root, "time"),
        })
    }

    /// Temperature converted to degrees Celsius
    pub fn temperature_celsius(&self) -> Option<f32> {
        self.temperature.map(|kelvin| kelvin - 273.15)
    }
}

/// Any message received on the status topic
#[derive(Debug, Clone, PartialEq)]
pub enum StatusMessage {
    /// Product state, full or delta
    State(Arc<DeviceState>),
    /// Environmental sensor readings
    Environment(Arc<EnvironmentalState>),
    /// A message kind this library does not decode
    Other { kind: String },
}

impl StatusMessage {
    /// Decode a raw status-topic payload
    ///
    /// # Errors
    ///
    /// Returns `ApiError::MalformedStatus` for invalid JSON, a missing `msg`
    /// field, or a known message kind with missing required fields.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let root = parse_root(payload)?;
        let kind = message_kind(&root)?;

        match kind {
            MSG_CURRENT_STATE | MSG_STATE_CHANGE => {
                DeviceState::from_root(kind, &root).map(|state| Self::State(Arc::new(state)))
            }
            MSG_ENVIRONMENTAL_DATA => EnvironmentalState::from_root(&root)
                .map(|env| Self::Environment(Arc::new(env))),
            other => {
                tracing::trace!("Passing through status message of kind {}", other);
                Ok(Self::Other {
                    kind: other.to_string(),
                })
            }
        }
    }

    /// Message kind as found in the `msg` field
    pub fn kind(&self) -> &str {
        match self {
            Self::State(state) => match state.report {
                StateReport::Current => MSG_CURRENT_STATE,
                StateReport::Change => MSG_STATE_CHANGE,
            },
            Self::Environment(_) => MSG_ENVIRONMENTAL_DATA,
            Self::Other { kind } => kind.as_str(),
        }
    }
}

fn parse_root(payload: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice(payload) {
        Ok(Value::Object(root)) => Ok(root),
        Ok(_) => Err(ApiError::MalformedStatus(
            "payload is not a JSON object".to_string(),
        )),
        Err(e) => Err(ApiError::MalformedStatus(format!("invalid JSON: {}", e))),
    }
}

fn message_kind(root: &Map<String, Value>) -> Result<&str> {
    root.get("msg")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::MalformedStatus("missing msg field".to_string()))
}

/// Field value, taking the new half of a `[old, new]` change pair
fn optional<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    match fields.get(key)? {
        Value::Array(pair) => pair.get(1).and_then(Value::as_str),
        value => value.as_str(),
    }
}

fn required<'a>(fields: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    optional(fields, key)
        .ok_or_else(|| ApiError::MalformedStatus(format!("missing field {}", key)))
}

fn top_level(root: &Map<String, Value>, key: &str) -> Option<String> {
    root.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Numeric sensor or timer reading; `OFF`, `INIT` and the like are `None`
fn parse_reading(raw: &str) -> Option<u16> {
    raw.parse().ok()
}
