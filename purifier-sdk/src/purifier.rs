//! Purifier handle with typed accessors
//!
//! A thin, cloneable wrapper over one [`DeviceRuntime`]. Getters read the
//! cache and never touch the network; setters validate, send and schedule a
//! re-poll.

use std::sync::Arc;

use purifier_api::{AirQuality, ControlIntent, Feature, Mode, Model, PropertyName, PropertyValue};
use purifier_state::{CacheUpdated, ConnectivityState, DeviceRuntime};
use tokio::sync::broadcast;

use crate::SdkError;

/// A feature the accessory layer should expose, with its display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposedFeature {
    pub feature: Feature,
    pub property: PropertyName,
    pub display_name: String,
}

fn feature_property(feature: Feature) -> PropertyName {
    match feature {
        Feature::Temperature => PropertyName::Temperature,
        Feature::Humidity => PropertyName::Humidity,
        Feature::AirQuality => PropertyName::AirQuality,
        Feature::Light => PropertyName::Light,
        Feature::Buzzer => PropertyName::Buzzer,
        Feature::ChildLock => PropertyName::ChildLock,
    }
}

/// Handle to one configured purifier
///
/// # Example
///
/// ```rust,ignore
/// let purifier = bridge.purifier("Bedroom")?;
///
/// if purifier.power()? {
///     purifier.set_rotation_speed(40).await?;
/// }
/// println!("air quality: {:?}", purifier.air_quality()?);
/// ```
#[derive(Clone)]
pub struct Purifier {
    runtime: Arc<DeviceRuntime>,
}

impl Purifier {
    pub(crate) fn new(runtime: Arc<DeviceRuntime>) -> Self {
        Self { runtime }
    }

    pub fn name(&self) -> &str {
        self.runtime.name()
    }

    pub fn model(&self) -> Model {
        self.runtime.config().model
    }

    /// The underlying runtime, for generic `read`/`write` access
    pub fn runtime(&self) -> &Arc<DeviceRuntime> {
        &self.runtime
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.runtime.connectivity()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheUpdated> {
        self.runtime.subscribe()
    }

    /// Visible features with their display names, in a stable order
    pub fn features(&self) -> Vec<ExposedFeature> {
        let config = self.runtime.config();
        Feature::ALL
            .iter()
            .copied()
            .filter(|feature| config.features.is_enabled(*feature))
            .map(|feature| ExposedFeature {
                feature,
                property: feature_property(feature),
                display_name: config.display_name(feature),
            })
            .collect()
    }

    fn read<T>(
        &self,
        name: PropertyName,
        extract: impl FnOnce(&PropertyValue) -> Option<T>,
    ) -> Result<T, SdkError> {
        let value = self.runtime.read(name)?;
        extract(&value).ok_or_else(|| {
            SdkError::Sync(purifier_state::SyncError::Parse(format!(
                "unexpected value {:?} for '{}'",
                value, name
            )))
        })
    }

    pub fn power(&self) -> Result<bool, SdkError> {
        self.read(PropertyName::Power, PropertyValue::as_bool)
    }

    pub fn mode(&self) -> Result<Mode, SdkError> {
        self.read(PropertyName::Mode, PropertyValue::as_mode)
    }

    pub fn air_quality(&self) -> Result<AirQuality, SdkError> {
        self.read(PropertyName::AirQuality, PropertyValue::as_air_quality)
    }

    pub fn pm25_density(&self) -> Result<f64, SdkError> {
        self.read(PropertyName::Pm25Density, PropertyValue::as_f64)
    }

    /// Degrees Celsius
    pub fn temperature(&self) -> Result<f64, SdkError> {
        self.read(PropertyName::Temperature, PropertyValue::as_f64)
    }

    pub fn humidity(&self) -> Result<u8, SdkError> {
        self.read(PropertyName::Humidity, PropertyValue::as_percent)
    }

    pub fn filter_life(&self) -> Result<u8, SdkError> {
        self.read(PropertyName::FilterLife, PropertyValue::as_percent)
    }

    pub fn rotation_speed(&self) -> Result<u8, SdkError> {
        self.read(PropertyName::RotationSpeed, PropertyValue::as_percent)
    }

    pub fn light(&self) -> Result<bool, SdkError> {
        self.read(PropertyName::Light, PropertyValue::as_bool)
    }

    pub fn buzzer(&self) -> Result<bool, SdkError> {
        self.read(PropertyName::Buzzer, PropertyValue::as_bool)
    }

    pub fn child_lock(&self) -> Result<bool, SdkError> {
        self.read(PropertyName::ChildLock, PropertyValue::as_bool)
    }

    pub async fn set_power(&self, on: bool) -> Result<(), SdkError> {
        Ok(self.runtime.apply(ControlIntent::Power(on)).await?)
    }

    pub async fn set_mode(&self, mode: Mode) -> Result<(), SdkError> {
        Ok(self
            .runtime
            .write("mode", &serde_json::Value::from(mode.as_str()))
            .await?)
    }

    /// Percent, `0..=100`
    pub async fn set_rotation_speed(&self, percent: u8) -> Result<(), SdkError> {
        Ok(self
            .runtime
            .write("rotation_speed", &serde_json::Value::from(percent))
            .await?)
    }

    pub async fn set_light(&self, on: bool) -> Result<(), SdkError> {
        Ok(self.runtime.apply(ControlIntent::Light(on)).await?)
    }

    pub async fn set_buzzer(&self, on: bool) -> Result<(), SdkError> {
        Ok(self.runtime.apply(ControlIntent::Buzzer(on)).await?)
    }

    pub async fn set_child_lock(&self, on: bool) -> Result<(), SdkError> {
        Ok(self.runtime.apply(ControlIntent::ChildLock(on)).await?)
    }
}

impl std::fmt::Debug for Purifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Purifier")
            .field("name", &self.name())
            .field("model", &self.model())
            .finish()
    }
}
