//! Per-device configuration records
//!
//! Records arrive as JSON from the host platform, so field names are
//! camelCase. Only what a device session needs is validated here.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::AirQualityThresholds;
use crate::error::ConfigError;
use crate::model::Model;

/// Port used when the address carries none
pub const DEFAULT_PORT: u16 = 54321;

/// Configuration for one purifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    /// IP address, optionally with `:port`
    pub address: String,
    /// 32 hex character device token
    pub token: String,
    pub model: Model,
    pub name: String,
    #[serde(default)]
    pub features: FeatureFlags,
    /// Display-name overrides per feature
    #[serde(default)]
    pub names: HashMap<Feature, String>,
    /// Raw breakpoints; validated by [`DeviceConfig::thresholds`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_quality_thresholds: Option<Value>,
}

impl DeviceConfig {
    pub fn new(
        address: impl Into<String>,
        token: impl Into<String>,
        model: Model,
        name: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            token: token.into(),
            model,
            name: name.into(),
            features: FeatureFlags::default(),
            names: HashMap::new(),
            air_quality_thresholds: None,
        }
    }

    /// Check the fields needed to open a session
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        self.socket_addr()?;

        let token = self.token.trim();
        if token.len() != 32 || !token.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigError::InvalidToken {
                device: self.name.clone(),
                reason: "expected 32 hexadecimal characters".to_string(),
            });
        }
        Ok(())
    }

    /// Resolve the address into a socket address, defaulting the port
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let address = self.address.trim();
        if let Ok(addr) = address.parse::<SocketAddr>() {
            return Ok(addr);
        }
        address
            .parse::<IpAddr>()
            .map(|ip| SocketAddr::new(ip, DEFAULT_PORT))
            .map_err(|_| ConfigError::InvalidAddress(self.address.clone()))
    }

    /// Validated air quality breakpoints, or the defaults
    pub fn thresholds(&self) -> AirQualityThresholds {
        AirQualityThresholds::from_config(self.air_quality_thresholds.as_ref())
    }

    /// Display name for a feature, honoring overrides
    pub fn display_name(&self, feature: Feature) -> String {
        match self.names.get(&feature) {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("{} {}", self.name, feature.default_label()),
        }
    }
}

/// Optional features that can be hidden from the accessory layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    Temperature,
    Humidity,
    AirQuality,
    Light,
    Buzzer,
    ChildLock,
}

impl Feature {
    pub const ALL: [Feature; 6] = [
        Feature::Temperature,
        Feature::Humidity,
        Feature::AirQuality,
        Feature::Light,
        Feature::Buzzer,
        Feature::ChildLock,
    ];

    pub fn default_label(&self) -> &'static str {
        match self {
            Feature::Temperature => "Temperature",
            Feature::Humidity => "Humidity",
            Feature::AirQuality => "Air Quality",
            Feature::Light => "Light",
            Feature::Buzzer => "Buzzer",
            Feature::ChildLock => "Child Lock",
        }
    }
}

fn enabled() -> bool {
    true
}

/// Visibility flags, all on by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlags {
    #[serde(default = "enabled")]
    pub temperature: bool,
    #[serde(default = "enabled")]
    pub humidity: bool,
    #[serde(default = "enabled")]
    pub air_quality: bool,
    #[serde(default = "enabled")]
    pub light: bool,
    #[serde(default = "enabled")]
    pub buzzer: bool,
    #[serde(default = "enabled")]
    pub child_lock: bool,
}

impl FeatureFlags {
    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::Temperature => self.temperature,
            Feature::Humidity => self.humidity,
            Feature::AirQuality => self.air_quality,
            Feature::Light => self.light,
            Feature::Buzzer => self.buzzer,
            Feature::ChildLock => self.child_lock,
        }
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            temperature: true,
            humidity: true,
            air_quality: true,
            light: true,
            buzzer: true,
            child_lock: true,
        }
    }
}
