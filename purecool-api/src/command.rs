//! Command message encoding
//!
//! Commands are JSON objects published on the device's `command` topic. A
//! `STATE-SET` always lists every controllable field: the ones the caller asked
//! to change carry their wire token, all others carry `"STET"` so the firmware
//! leaves them alone. The sleep timer (`sltm`) is the one field sent as a bare
//! integer rather than a string.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};
use crate::values::{
    FanMode, FanSpeed, NightMode, Oscillation, QualityTarget, ResetFilter, StandbyMonitoring,
};

pub const MSG_STATE_SET: &str = "STATE-SET";
pub const MSG_REQUEST_CURRENT_STATE: &str = "REQUEST-CURRENT-STATE";
pub const MSG_REQUEST_ENVIRONMENT: &str = "REQUEST-PRODUCT-ENVIRONMENT-CURRENT-SENSOR-DATA";

/// Wire sentinel for "leave this field unchanged"
pub const STET: &str = "STET";

/// Origin tag carried by every `STATE-SET`: a change made by a local app
pub const LOCAL_APP_REASON: &str = "LAPP";

/// Requested changes to the fan's configuration
///
/// Every field is optional; `None` means "no change" and is encoded as
/// `"STET"`, never as the current value.
///
/// # Example
///
/// ```
/// use purecool_api::{FanMode, FanSpeed, StateDelta};
///
/// let delta = StateDelta::new()
///     .fan_mode(FanMode::Fan)
///     .fan_speed(FanSpeed::Speed3);
/// assert!(!delta.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDelta {
    pub fan_mode: Option<FanMode>,
    pub fan_speed: Option<FanSpeed>,
    pub oscillation: Option<Oscillation>,
    pub night_mode: Option<NightMode>,
    pub quality_target: Option<QualityTarget>,
    pub standby_monitoring: Option<StandbyMonitoring>,
    /// Sleep timer in minutes; `Some(0)` cancels a running timer
    pub sleep_timer: Option<u16>,
    pub reset_filter: Option<ResetFilter>,
}

impl StateDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fan_mode(mut self, value: FanMode) -> Self {
        self.fan_mode = Some(value);
        self
    }

    pub fn fan_speed(mut self, value: FanSpeed) -> Self {
        self.fan_speed = Some(value);
        self
    }

    pub fn oscillation(mut self, value: Oscillation) -> Self {
        self.oscillation = Some(value);
        self
    }

    pub fn night_mode(mut self, value: NightMode) -> Self {
        self.night_mode = Some(value);
        self
    }

    pub fn quality_target(mut self, value: QualityTarget) -> Self {
        self.quality_target = Some(value);
        self
    }

    pub fn standby_monitoring(mut self, value: StandbyMonitoring) -> Self {
        self.standby_monitoring = Some(value);
        self
    }

    pub fn sleep_timer(mut self, minutes: u16) -> Self {
        self.sleep_timer = Some(minutes);
        self
    }

    pub fn reset_filter(mut self, value: ResetFilter) -> Self {
        self.reset_filter = Some(value);
        self
    }

    /// True when no field was requested
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The `data` object of a `STATE-SET` for this delta
    pub fn to_wire_data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("fmod".into(), or_stet(&self.fan_mode, FanMode::as_wire));
        data.insert("fnsp".into(), or_stet(&self.fan_speed, FanSpeed::as_wire));
        data.insert("oson".into(), or_stet(&self.oscillation, Oscillation::as_wire));
        data.insert("sltm".into(), self.sleep_timer.map_or_else(stet, Value::from));
        data.insert("rhtm".into(), or_stet(&self.standby_monitoring, StandbyMonitoring::as_wire));
        data.insert("rstf".into(), or_stet(&self.reset_filter, ResetFilter::as_wire));
        data.insert("qtar".into(), or_stet(&self.quality_target, QualityTarget::as_wire));
        data.insert("nmod".into(), or_stet(&self.night_mode, NightMode::as_wire));
        data
    }
}

fn stet() -> Value {
    Value::from(STET)
}

/// The field's wire token, or `STET` to leave it unchanged
fn or_stet<T>(value: &Option<T>, as_wire: fn(&T) -> &str) -> Value {
    value.as_ref().map(as_wire).map_or_else(stet, Value::from)
}

/// A command ready to publish on the device's command topic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    msg: &'static str,
    time: String,
    #[serde(rename = "mode-reason", skip_serializing_if = "Option::is_none")]
    mode_reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Map<String, Value>>,
}

impl Command {
    /// Ask the fan to publish a full `CURRENT-STATE` snapshot
    pub fn request_current_state(time: DateTime<Utc>) -> Self {
        Self::request(MSG_REQUEST_CURRENT_STATE, time)
    }

    /// Ask the fan to publish its environmental sensor readings
    pub fn request_environment(time: DateTime<Utc>) -> Self {
        Self::request(MSG_REQUEST_ENVIRONMENT, time)
    }

    /// Change the fields named in `delta`, leaving every other field as is
    pub fn state_set(delta: &StateDelta, time: DateTime<Utc>) -> Self {
        Self {
            msg: MSG_STATE_SET,
            time: format_time(time),
            mode_reason: Some(LOCAL_APP_REASON),
            data: Some(delta.to_wire_data()),
        }
    }

    fn request(msg: &'static str, time: DateTime<Utc>) -> Self {
        Self {
            msg,
            time: format_time(time),
            mode_reason: None,
            data: None,
        }
    }

    /// Message kind (`msg` field)
    pub fn kind(&self) -> &'static str {
        self.msg
    }

    /// Serialize to the JSON payload published on the wire
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ApiError::Encode(e.to_string()))
    }
}

/// UTC ISO-8601 with millisecond precision, e.g. `2017-02-19T15:00:18.000Z`
pub fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
