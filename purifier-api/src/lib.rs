//! Typed air purifier API
//!
//! This crate contains everything about a purifier that does not need a
//! network connection:
//!
//! - [`Model`]: the supported firmwares and how they differ
//! - [`codec`]: translation between raw device values and normalized
//!   [`PropertyValue`]s
//! - [`command`]: validated [`ControlIntent`]s, the resolver that turns them
//!   into [`CommandCandidate`]s, and the [`FallbackChain`] that walks them
//! - [`DeviceConfig`]: the per-device configuration record
//!
//! It uses the private `miio-client` crate only for error classification.
//!
//! ```rust
//! use purifier_api::{resolve, ControlIntent, Model};
//! use serde_json::json;
//!
//! let intent = ControlIntent::parse("rotation_speed", &json!(50))?;
//! let plan = resolve(&intent, Model::M2);
//! assert_eq!(plan.candidates[0].method, "set_level_favorite");
//! assert_eq!(plan.candidates[0].params, vec![json!(7)]);
//! # Ok::<(), purifier_api::ValidationError>(())
//! ```

pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod model;
pub mod property;

pub use codec::{decode_properties, AirQualityThresholds, DEFAULT_THRESHOLDS};
pub use command::{
    is_acknowledged, mode_switch, resolve, CommandCandidate, CommandPlan, ControlIntent,
    FallbackChain, Step, ValidationError,
};
pub use config::{DeviceConfig, Feature, FeatureFlags};
pub use error::{ApiError, ConfigError, RemoteError, RemoteErrorKind, Result};
pub use model::{LightControl, Model};
pub use property::{AirQuality, Mode, PropertyName, PropertyValue};
