//! Normalized purifier properties
//!
//! Properties are the unit of state exposed to callers. Each one has a
//! stable key, and every cached value is already decoded into its domain
//! form (booleans, percentages, ordinals) by the codec.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::command::ValidationError;

/// Name of a normalized property
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyName {
    Power,
    Mode,
    AirQuality,
    Pm25Density,
    Temperature,
    Humidity,
    FilterLife,
    RotationSpeed,
    Light,
    Buzzer,
    ChildLock,
}

impl PropertyName {
    pub const ALL: [PropertyName; 11] = [
        PropertyName::Power,
        PropertyName::Mode,
        PropertyName::AirQuality,
        PropertyName::Pm25Density,
        PropertyName::Temperature,
        PropertyName::Humidity,
        PropertyName::FilterLife,
        PropertyName::RotationSpeed,
        PropertyName::Light,
        PropertyName::Buzzer,
        PropertyName::ChildLock,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            PropertyName::Power => "power",
            PropertyName::Mode => "mode",
            PropertyName::AirQuality => "air_quality",
            PropertyName::Pm25Density => "pm25_density",
            PropertyName::Temperature => "temperature",
            PropertyName::Humidity => "humidity",
            PropertyName::FilterLife => "filter_life",
            PropertyName::RotationSpeed => "rotation_speed",
            PropertyName::Light => "light",
            PropertyName::Buzzer => "buzzer",
            PropertyName::ChildLock => "child_lock",
        }
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PropertyName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PropertyName::ALL
            .iter()
            .copied()
            .find(|name| name.key() == s)
            .ok_or_else(|| ValidationError::UnknownProperty(s.to_string()))
    }
}

/// Operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Auto,
    Favorite,
    Silent,
    /// Reported while powered off; never a write target
    Idle,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::Favorite => "favorite",
            Mode::Silent => "silent",
            Mode::Idle => "idle",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "auto" => Some(Mode::Auto),
            "favorite" => Some(Mode::Favorite),
            "silent" => Some(Mode::Silent),
            "idle" => Some(Mode::Idle),
            _ => None,
        }
    }
}

/// Five-level air quality ordinal, plus `Unknown` for unreadable input
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AirQuality {
    Unknown = 0,
    Excellent = 1,
    Good = 2,
    Fair = 3,
    Inferior = 4,
    Poor = 5,
}

/// A decoded property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Percent(u8),
    Float(f64),
    Mode(Mode),
    AirQuality(AirQuality),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_percent(&self) -> Option<u8> {
        match self {
            PropertyValue::Percent(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            PropertyValue::Percent(p) => Some(f64::from(*p)),
            _ => None,
        }
    }

    pub fn as_mode(&self) -> Option<Mode> {
        match self {
            PropertyValue::Mode(m) => Some(*m),
            _ => None,
        }
    }

    pub fn as_air_quality(&self) -> Option<AirQuality> {
        match self {
            PropertyValue::AirQuality(q) => Some(*q),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_keys_round_trip() {
        for name in PropertyName::ALL {
            assert_eq!(name.key().parse::<PropertyName>().unwrap(), name);
        }
        assert!(matches!(
            "volume".parse::<PropertyName>(),
            Err(ValidationError::UnknownProperty(_))
        ));
    }

    #[test]
    fn test_air_quality_ordering() {
        assert!(AirQuality::Excellent < AirQuality::Good);
        assert!(AirQuality::Inferior < AirQuality::Poor);
        assert_eq!(AirQuality::Poor as u8, 5);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(Mode::parse("favorite"), Some(Mode::Favorite));
        assert_eq!(Mode::parse("idle"), Some(Mode::Idle));
        assert_eq!(Mode::parse("turbo"), None);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(PropertyValue::Percent(40).as_f64(), Some(40.0));
        assert_eq!(PropertyValue::Bool(true).as_percent(), None);
        assert_eq!(PropertyValue::Mode(Mode::Auto).as_mode(), Some(Mode::Auto));
    }
}
