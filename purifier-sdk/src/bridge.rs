//! PurifierBridge - main entry point for the SDK
//!
//! Builds one [`DeviceRuntime`] per configured purifier and manages them as
//! a group. Devices are fully independent: a purifier that is unreachable
//! does not hold up the others.

use std::collections::HashMap;
use std::sync::Arc;

use purifier_api::DeviceConfig;
use purifier_state::{Connector, DeviceRuntime, MiioConnector, SyncConfig};
use tracing::info;

use crate::{BridgeConfig, Purifier, SdkError};

/// A set of purifiers, addressed by display name
///
/// # Example
///
/// ```rust,ignore
/// use purifier_sdk::{BridgeConfig, PurifierBridge};
///
/// let bridge = PurifierBridge::from_config(BridgeConfig::load_default()?)?;
/// bridge.start_all();
///
/// for purifier in bridge.purifiers() {
///     println!("{} ({})", purifier.name(), purifier.model());
/// }
/// ```
pub struct PurifierBridge {
    /// In configuration order
    purifiers: Vec<Purifier>,
    by_name: HashMap<String, usize>,
}

impl PurifierBridge {
    /// Build a bridge that talks miio to every configured device
    pub fn from_config(config: BridgeConfig) -> Result<Self, SdkError> {
        Self::builder().build(config)
    }

    pub fn builder() -> PurifierBridgeBuilder {
        PurifierBridgeBuilder::default()
    }

    /// Connect every purifier in the background
    pub fn start_all(&self) {
        info!(devices = self.purifiers.len(), "Starting purifier bridge");
        for purifier in &self.purifiers {
            purifier.runtime().start();
        }
    }

    /// Stop every runtime: no more polling or reconnecting
    pub fn shutdown(&self) {
        for purifier in &self.purifiers {
            purifier.runtime().shutdown();
        }
    }

    pub fn get(&self, name: &str) -> Option<&Purifier> {
        self.by_name.get(name).map(|&index| &self.purifiers[index])
    }

    /// Like [`PurifierBridge::get`], but a missing name is an error
    pub fn purifier(&self, name: &str) -> Result<&Purifier, SdkError> {
        self.get(name)
            .ok_or_else(|| SdkError::DeviceNotFound(name.to_string()))
    }

    pub fn purifiers(&self) -> impl Iterator<Item = &Purifier> {
        self.purifiers.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.purifiers.iter().map(Purifier::name).collect()
    }

    pub fn len(&self) -> usize {
        self.purifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.purifiers.is_empty()
    }
}

/// Builder for [`PurifierBridge`]
pub struct PurifierBridgeBuilder {
    sync: SyncConfig,
    connector: Arc<dyn Connector>,
}

impl Default for PurifierBridgeBuilder {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            connector: Arc::new(MiioConnector),
        }
    }
}

impl PurifierBridgeBuilder {
    pub fn with_sync_config(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    /// Use a custom transport for every device
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn build(self, config: BridgeConfig) -> Result<PurifierBridge, SdkError> {
        let mut purifiers = Vec::with_capacity(config.devices.len());
        let mut by_name = HashMap::new();

        for device in config.devices {
            let name = device.name.clone();
            if by_name.contains_key(&name) {
                return Err(SdkError::DuplicateName(name));
            }
            let runtime = self.runtime_for(device)?;
            by_name.insert(name, purifiers.len());
            purifiers.push(Purifier::new(Arc::new(runtime)));
        }

        Ok(PurifierBridge { purifiers, by_name })
    }

    fn runtime_for(&self, device: DeviceConfig) -> Result<DeviceRuntime, SdkError> {
        Ok(DeviceRuntime::with_connector(
            device,
            self.sync.clone(),
            Arc::clone(&self.connector),
        )?)
    }
}
