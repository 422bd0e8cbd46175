//! Synchronization facade for one device
//!
//! [`DeviceRuntime`] is the only type the accessory layer talks to. It owns
//! the connection manager and the state cache for exactly one configured
//! device and exposes `read`, `write` and a cache-updated subscription.

use std::sync::Arc;

use purifier_api::{
    mode_switch, resolve, ControlIntent, DeviceConfig, FallbackChain, PropertyName,
    PropertyValue, Step,
};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{CacheUpdated, StateCache, StateSnapshot};
use crate::config::SyncConfig;
use crate::connection::{ConnectionManager, ConnectivityState};
use crate::error::{Result, SyncError};
use crate::session::{Connector, MiioConnector};

/// Connection manager, session and cache for one device
pub struct DeviceRuntime {
    manager: ConnectionManager,
    cache: Arc<StateCache>,
}

impl DeviceRuntime {
    /// Build a runtime that talks miio to the configured address
    pub fn new(config: DeviceConfig, sync: SyncConfig) -> Result<Self> {
        Self::with_connector(config, sync, Arc::new(MiioConnector))
    }

    /// Build a runtime over a custom transport
    pub fn with_connector(
        config: DeviceConfig,
        sync: SyncConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        config.validate()?;
        let cache = Arc::new(StateCache::new(sync.event_buffer_size));
        let manager = ConnectionManager::new(config, sync, connector, Arc::clone(&cache));
        Ok(Self { manager, cache })
    }

    pub fn name(&self) -> &str {
        &self.manager.config().name
    }

    pub fn config(&self) -> &DeviceConfig {
        self.manager.config()
    }

    /// Connect in the background; failures are retried until shutdown
    pub fn start(&self) {
        info!(device = %self.name(), model = %self.config().model, "Starting device runtime");
        self.manager.start();
    }

    /// Connect and wait for the first attempt to finish
    pub async fn connect(&self) {
        self.manager.connect().await;
    }

    /// Stop polling and reconnecting, and release the session
    pub fn shutdown(&self) {
        info!(device = %self.name(), "Shutting down device runtime");
        self.manager.disconnect();
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.manager.state()
    }

    /// Whether a reconnect is scheduled
    pub fn pending_reconnect(&self) -> bool {
        self.manager.pending_reconnect()
    }

    /// Latest cached value of a property
    pub fn read(&self, name: PropertyName) -> Result<PropertyValue> {
        if !self.manager.ever_connected() {
            return Err(SyncError::NotConnected);
        }
        self.cache.get(name).ok_or(SyncError::NoData(name))
    }

    /// [`DeviceRuntime::read`] by property key, e.g. `"air_quality"`
    pub fn read_key(&self, key: &str) -> Result<PropertyValue> {
        self.read(key.parse()?)
    }

    pub fn snapshot(&self) -> Option<Arc<StateSnapshot>> {
        self.cache.snapshot()
    }

    /// When the cached snapshot was last refreshed
    pub fn last_refreshed(&self) -> Option<Instant> {
        self.cache.snapshot().map(|snapshot| snapshot.refreshed_at())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheUpdated> {
        self.cache.subscribe()
    }

    /// Fetch the full property set now
    pub async fn refresh(&self) -> Result<()> {
        self.manager.refresh().await
    }

    /// Validate and apply a named intent, e.g. `write("power", &json!(true))`
    pub async fn write(&self, intent: &str, value: &Value) -> Result<()> {
        let intent = ControlIntent::parse(intent, value).map_err(|e| {
            debug!(device = %self.name(), error = %e, "Rejected invalid write");
            e
        })?;
        self.apply(intent).await
    }

    /// Execute an already validated intent
    pub async fn apply(&self, intent: ControlIntent) -> Result<()> {
        let session = self.manager.session()?;
        let plan = resolve(&intent, self.config().model);

        if let Some(mode) = plan.required_mode {
            let current = self.cache.get(PropertyName::Mode).and_then(|v| v.as_mode());
            if current != Some(mode) {
                if let Err(e) = session.execute(&mode_switch(mode)).await {
                    warn!(
                        device = %self.name(),
                        intent = intent.name(),
                        error = %e,
                        "Mode switch before write failed, continuing"
                    );
                }
            }
        }

        let mut chain = FallbackChain::new(plan.candidates);
        while let Some(candidate) = chain.current().cloned() {
            match chain.record(session.execute(&candidate).await) {
                Step::Succeed(_) => {
                    debug!(device = %self.name(), command = %candidate, "Write acknowledged");
                    self.manager
                        .schedule_refresh(self.manager.sync_config().repoll_delay);
                    return Ok(());
                }
                Step::Advance(e) => {
                    warn!(
                        device = %self.name(),
                        command = %candidate,
                        error = %e,
                        "Command unsupported, trying next candidate"
                    );
                }
                Step::Abort(e) => {
                    warn!(
                        device = %self.name(),
                        command = %candidate,
                        error = %e,
                        "Write failed"
                    );
                    return Err(e.into());
                }
            }
        }

        Err(SyncError::Parse(format!(
            "no command resolved for intent '{}'",
            intent.name()
        )))
    }
}

impl std::fmt::Debug for DeviceRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRuntime")
            .field("name", &self.name())
            .field("model", &self.config().model)
            .field("connectivity", &self.connectivity())
            .finish()
    }
}
