//! Purifier State Synchronization
//!
//! Keeps a local, normalized view of one air purifier in sync with the
//! physical device, and turns control intents into device commands.
//!
//! # Architecture
//!
//! ```text
//!                  DeviceRuntime (read / write / subscribe)
//!                    |                    |
//!        ConnectionManager            StateCache <- poll loop
//!          |        |                     ^
//!   reconnect    DeviceSession -----------+
//!     timer         |
//!               Transport (miio)
//! ```
//!
//! - One [`DeviceRuntime`] per configured device; nothing is shared between
//!   devices.
//! - The [`ConnectionManager`] connects, polls every 15 s once connected, and
//!   reconnects 30 s after any transport failure, indefinitely.
//! - The [`StateCache`] holds the last successful poll. Each poll replaces
//!   it as a whole and emits one [`CacheUpdated`] event.
//! - Writes run the resolved fallback chain on the live session and trigger
//!   a re-poll 250 ms after success.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use purifier_state::{DeviceRuntime, SyncConfig};
//! use purifier_api::{DeviceConfig, Model, PropertyName};
//! use serde_json::json;
//! use tokio::sync::broadcast::error::RecvError;
//!
//! let config = DeviceConfig::new("192.168.1.40", token, Model::M2, "Bedroom");
//! let runtime = DeviceRuntime::new(config, SyncConfig::default())?;
//! runtime.connect().await;
//!
//! let mut updates = runtime.subscribe();
//! runtime.write("rotation_speed", &json!(50)).await?;
//!
//! loop {
//!     match updates.recv().await {
//!         Ok(update) => {
//!             println!("air quality: {:?}", update.snapshot.get(PropertyName::AirQuality));
//!         }
//!         Err(RecvError::Lagged(_)) => continue,
//!         Err(RecvError::Closed) => break,
//!     }
//! }
//! ```

pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod poll;
pub mod runtime;
pub mod scheduler;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use cache::{CacheUpdated, StateCache, StateSnapshot};
pub use config::SyncConfig;
pub use connection::{ConnectionManager, ConnectivityState};
pub use error::{Result, SyncError};
pub use runtime::DeviceRuntime;
pub use session::{Connector, DeviceSession, MiioConnector, MiioTransport, Transport};

// Re-export the types callers need to build and drive a runtime
pub use purifier_api::{
    AirQuality, ControlIntent, DeviceConfig, Mode, Model, PropertyName, PropertyValue,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CacheUpdated, ConnectivityState, DeviceRuntime, SyncConfig, SyncError,
    };
    pub use purifier_api::{DeviceConfig, Model, PropertyName, PropertyValue};
}
