//! # Purifier SDK - local control for miio air purifiers
//!
//! Keeps a cached, normalized view of each configured purifier and turns
//! simple setter calls into the right device commands for its firmware:
//!
//! ```rust,no_run
//! use purifier_sdk::{BridgeConfig, PurifierBridge};
//! use tokio::sync::broadcast::error::RecvError;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), purifier_sdk::SdkError> {
//!     let bridge = PurifierBridge::from_config(BridgeConfig::from_path("devices.json")?)?;
//!     bridge.start_all();
//!
//!     let bedroom = bridge.purifier("Bedroom")?;
//!     let mut updates = bedroom.subscribe();
//!     loop {
//!         match updates.recv().await {
//!             Ok(_) | Err(RecvError::Lagged(_)) => {
//!                 println!("{}: {:?}", bedroom.name(), bedroom.air_quality());
//!             }
//!             Err(RecvError::Closed) => break,
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! purifier-sdk (bridge, typed handles)
//!     ↓
//! purifier-state (connection manager, poll loop, cache, facade)
//!     ↓
//! purifier-api (models, codec, command resolution)
//!     ↓
//! miio-client (encrypted UDP transport)
//! ```

// Main exports
pub use bridge::{PurifierBridge, PurifierBridgeBuilder};
pub use config::BridgeConfig;
pub use error::SdkError;
pub use purifier::{ExposedFeature, Purifier};

// Re-export commonly used types
pub use purifier_api::{AirQuality, DeviceConfig, Feature, Mode, Model, PropertyName, PropertyValue};
pub use purifier_state::{
    logging, CacheUpdated, ConnectivityState, DeviceRuntime, SyncConfig, SyncError,
};

// Internal modules
mod bridge;
mod config;
mod error;
mod purifier;
