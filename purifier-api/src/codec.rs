//! Property codec: pure translation between raw device values and domain values
//!
//! Nothing in here performs I/O or holds state. The poll loop feeds raw
//! `get_prop` replies through [`decode_properties`], and the command resolver
//! uses [`percent_to_level`] and [`encode_switch`] for the way back.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{trace, warn};

use crate::command::ValidationError;
use crate::error::{ApiError, Result};
use crate::model::{LightControl, Model};
use crate::property::{AirQuality, Mode, PropertyName, PropertyValue};

/// Breakpoints used when none (or invalid ones) are configured
pub const DEFAULT_THRESHOLDS: [f64; 4] = [5.0, 15.0, 35.0, 55.0];

/// Parse an `"on"`/`"off"` switch value
pub fn parse_switch(raw: &Value) -> Option<bool> {
    match raw.as_str()? {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}

pub fn encode_switch(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

/// Convert a value reported in tenths into decimal units
pub fn tenths_to_units(raw: &Value) -> Option<f64> {
    raw.as_f64().filter(|v| v.is_finite()).map(|v| v / 10.0)
}

/// Device speed level to a rotation-speed percentage
pub fn level_to_percent(level: u8, max: u8) -> u8 {
    if max == 0 {
        return 0;
    }
    let percent = (f64::from(level) / f64::from(max) * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Rotation-speed percentage to a device speed level
///
/// The result is clamped to `[1, max]`: a 0 % request still yields level 1,
/// since level 0 is not accepted by any firmware.
pub fn percent_to_level(percent: u8, max: u8) -> u8 {
    let max = max.max(1);
    let level = (f64::from(percent.min(100)) / 100.0 * f64::from(max)).round();
    (level as u8).clamp(1, max)
}

/// Four ascending breakpoints splitting the AQI range into five classes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirQualityThresholds([f64; 4]);

impl AirQualityThresholds {
    /// Validate a breakpoint set: all finite and non-decreasing
    pub fn new(values: [f64; 4]) -> std::result::Result<Self, ValidationError> {
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(ValidationError::invalid_value("air_quality_thresholds", bad));
        }
        if values.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(ValidationError::InvalidValue {
                parameter: "air_quality_thresholds".to_string(),
                value: format!("{:?}", values),
                reason: "breakpoints must be non-decreasing".to_string(),
            });
        }
        Ok(Self(values))
    }

    /// Build from untrusted configuration, falling back to the defaults
    pub fn from_config(raw: Option<&Value>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        let parsed = raw
            .as_array()
            .filter(|items| items.len() == 4)
            .and_then(|items| {
                let mut values = [0.0; 4];
                for (slot, item) in values.iter_mut().zip(items) {
                    *slot = item.as_f64()?;
                }
                Some(values)
            })
            .ok_or_else(|| ValidationError::invalid_value("air_quality_thresholds", raw))
            .and_then(Self::new);

        match parsed {
            Ok(thresholds) => thresholds,
            Err(e) => {
                warn!(error = %e, "Invalid air quality thresholds, using defaults");
                Self::default()
            }
        }
    }

    pub fn values(&self) -> [f64; 4] {
        self.0
    }

    /// Classify a numeric index
    pub fn classify(&self, index: f64) -> AirQuality {
        if !index.is_finite() {
            return AirQuality::Unknown;
        }
        let [t1, t2, t3, t4] = self.0;
        if index <= t1 {
            AirQuality::Excellent
        } else if index <= t2 {
            AirQuality::Good
        } else if index <= t3 {
            AirQuality::Fair
        } else if index <= t4 {
            AirQuality::Inferior
        } else {
            AirQuality::Poor
        }
    }

    /// Classify a raw reply value; numeric strings are accepted
    pub fn classify_value(&self, raw: &Value) -> AirQuality {
        match numeric(raw) {
            Some(index) => self.classify(index),
            None => AirQuality::Unknown,
        }
    }
}

impl Default for AirQualityThresholds {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLDS)
    }
}

fn numeric(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

fn percent(raw: &Value) -> Option<u8> {
    numeric(raw).map(|v| v.round().clamp(0.0, 100.0) as u8)
}

/// Decode the indicator light state for the given control variant
pub fn decode_light(control: LightControl, raw: &Value) -> Option<bool> {
    match control {
        LightControl::TriState => match raw.as_u64()? {
            0 | 1 => Some(true),
            2 => Some(false),
            _ => None,
        },
        LightControl::Switch => parse_switch(raw),
    }
}

/// Decode one batched `get_prop` reply into normalized properties
///
/// The reply must line up with [`Model::polled_properties`]. Entries that do
/// not decode (null, wrong type) are left out of the result.
pub fn decode_properties(
    model: Model,
    thresholds: &AirQualityThresholds,
    raw: &Value,
) -> Result<BTreeMap<PropertyName, PropertyValue>> {
    let requested = model.polled_properties();
    let values = raw
        .as_array()
        .ok_or_else(|| ApiError::Parse(format!("expected an array reply, got {}", raw)))?;
    if values.len() != requested.len() {
        return Err(ApiError::Parse(format!(
            "requested {} properties, got {}",
            requested.len(),
            values.len()
        )));
    }

    let mut decoded = BTreeMap::new();
    for (&key, value) in requested.iter().zip(values) {
        let entry = match key {
            "power" => parse_switch(value).map(|b| (PropertyName::Power, PropertyValue::Bool(b))),
            "mode" => value
                .as_str()
                .and_then(Mode::parse)
                .map(|m| (PropertyName::Mode, PropertyValue::Mode(m))),
            "aqi" => {
                if let Some(density) = numeric(value) {
                    decoded.insert(PropertyName::Pm25Density, PropertyValue::Float(density));
                }
                Some((
                    PropertyName::AirQuality,
                    PropertyValue::AirQuality(thresholds.classify_value(value)),
                ))
            }
            "temp_dec" => tenths_to_units(value)
                .map(|t| (PropertyName::Temperature, PropertyValue::Float(t))),
            "humidity" => percent(value).map(|h| (PropertyName::Humidity, PropertyValue::Percent(h))),
            "filter1_life" => {
                percent(value).map(|l| (PropertyName::FilterLife, PropertyValue::Percent(l)))
            }
            "favorite_level" => value.as_u64().map(|level| {
                let level = level.min(u64::from(u8::MAX)) as u8;
                (
                    PropertyName::RotationSpeed,
                    PropertyValue::Percent(level_to_percent(level, model.favorite_level_max())),
                )
            }),
            "led_b" | "led" => decode_light(model.light_control(), value)
                .map(|on| (PropertyName::Light, PropertyValue::Bool(on))),
            "buzzer" => parse_switch(value).map(|b| (PropertyName::Buzzer, PropertyValue::Bool(b))),
            "child_lock" => {
                parse_switch(value).map(|b| (PropertyName::ChildLock, PropertyValue::Bool(b)))
            }
            _ => None,
        };

        match entry {
            Some((name, value)) => {
                decoded.insert(name, value);
            }
            None => trace!(key, %value, "Skipping undecodable property"),
        }
    }

    Ok(decoded)
}
