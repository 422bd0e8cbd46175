//! Connection lifecycle for one device
//!
//! ```text
//! disconnected -> connecting -> connected -> disconnected -> connecting (after delay) -> ...
//! ```
//!
//! Every connection attempt gets a new generation number. Sessions, poll
//! results and failure reports carry the generation they belong to, and
//! anything from an older generation is ignored. Results from a replaced
//! session are dropped this way, without cancelling calls in flight.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use purifier_api::{AirQualityThresholds, DeviceConfig};
use tracing::{debug, info, warn};

use crate::cache::StateCache;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::poll;
use crate::scheduler::{self, cancel_slot, TaskHandle};
use crate::session::{Connector, DeviceSession, FailureSink};

/// Connectivity of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Disconnected,
    Connecting,
    Connected,
}

struct Inner {
    state: ConnectivityState,
    session: Option<Arc<DeviceSession>>,
    generation: u64,
    ever_connected: bool,
    reconnect: Option<TaskHandle>,
    poll: Option<TaskHandle>,
    repoll: Option<TaskHandle>,
}

struct Shared {
    this: Weak<Shared>,
    config: DeviceConfig,
    sync: SyncConfig,
    thresholds: AirQualityThresholds,
    cache: Arc<StateCache>,
    connector: Arc<dyn Connector>,
    inner: Mutex<Inner>,
}

impl Shared {
    /// One connection attempt; no-op while connecting or connected
    async fn connect(&self) {
        let generation = {
            let mut inner = self.inner.lock();
            if inner.state != ConnectivityState::Disconnected {
                debug!(device = %self.config.name, state = ?inner.state, "Connect skipped");
                return;
            }
            inner.state = ConnectivityState::Connecting;
            inner.generation += 1;
            inner.generation
        };

        debug!(device = %self.config.name, generation, "Connecting");
        let result = self
            .connector
            .connect(&self.config, self.sync.request_timeout)
            .await;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(device = %self.config.name, generation, "Discarding superseded connection attempt");
            return;
        }

        match result {
            Ok(transport) => {
                let sink: Weak<dyn FailureSink> = self.this.clone();
                let session = Arc::new(DeviceSession::new(generation, transport, sink));

                cancel_slot(&mut inner.reconnect);
                cancel_slot(&mut inner.poll);
                inner.poll = Some(self.spawn_poll_loop(Arc::clone(&session)));
                inner.session = Some(session);
                inner.state = ConnectivityState::Connected;
                inner.ever_connected = true;
                info!(device = %self.config.name, generation, "Connected");
            }
            Err(e) => {
                inner.state = ConnectivityState::Disconnected;
                warn!(
                    device = %self.config.name,
                    error = %e,
                    retry_in = ?self.sync.reconnect_delay,
                    "Connection failed"
                );
                self.schedule_reconnect(&mut inner);
            }
        }
    }

    /// Arm the reconnect timer unless one is already pending
    fn schedule_reconnect(&self, inner: &mut Inner) {
        if inner.reconnect.as_ref().is_some_and(TaskHandle::is_pending) {
            debug!(device = %self.config.name, "Reconnect already scheduled");
            return;
        }

        let weak = self.this.clone();
        inner.reconnect = Some(scheduler::schedule_after(
            self.sync.reconnect_delay,
            async move {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                // Fired: free the slot so a failure below can arm it again.
                shared.inner.lock().reconnect = None;
                shared.connect().await;
            },
        ));
    }

    fn spawn_poll_loop(&self, session: Arc<DeviceSession>) -> TaskHandle {
        let weak = self.this.clone();
        let mut ticker = tokio::time::interval(self.sync.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        scheduler::spawn(async move {
            loop {
                // The first tick completes immediately.
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                let _ = shared.poll_once(&session).await;
            }
        })
    }

    fn disconnect(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.state = ConnectivityState::Disconnected;
        inner.session = None;
        cancel_slot(&mut inner.poll);
        cancel_slot(&mut inner.reconnect);
        cancel_slot(&mut inner.repoll);
        debug!(device = %self.config.name, "Disconnected");
    }

    fn current_session(&self) -> Result<Arc<DeviceSession>, SyncError> {
        let inner = self.inner.lock();
        match &inner.session {
            Some(session) => Ok(Arc::clone(session)),
            None if inner.ever_connected => Err(SyncError::Unavailable),
            None => Err(SyncError::NotConnected),
        }
    }

    /// Fetch once through `session` and commit the result if still current
    async fn poll_once(&self, session: &DeviceSession) -> Result<(), SyncError> {
        match poll::fetch_snapshot(session, self.config.model, &self.thresholds).await {
            Ok(snapshot) => {
                let inner = self.inner.lock();
                if inner.generation != session.generation() || inner.session.is_none() {
                    debug!(
                        device = %self.config.name,
                        generation = session.generation(),
                        "Discarding poll result from a replaced session"
                    );
                    return Ok(());
                }
                self.cache.replace(snapshot);
                Ok(())
            }
            Err(e) => {
                warn!(device = %self.config.name, error = %e, "Poll failed, keeping previous snapshot");
                Err(e.into())
            }
        }
    }
}

impl FailureSink for Shared {
    fn report_failure(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.generation != generation || inner.state != ConnectivityState::Connected {
            return;
        }

        warn!(device = %self.config.name, generation, "Session failed, scheduling reconnect");
        inner.state = ConnectivityState::Disconnected;
        inner.session = None;
        cancel_slot(&mut inner.poll);
        self.schedule_reconnect(&mut inner);
    }
}

/// Owns the session lifecycle for one device
///
/// Dropping the manager cancels its poll loop and any pending timers.
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    pub fn new(
        config: DeviceConfig,
        sync: SyncConfig,
        connector: Arc<dyn Connector>,
        cache: Arc<StateCache>,
    ) -> Self {
        let thresholds = config.thresholds();
        let shared = Arc::new_cyclic(|this| Shared {
            this: this.clone(),
            config,
            sync,
            thresholds,
            cache,
            connector,
            inner: Mutex::new(Inner {
                state: ConnectivityState::Disconnected,
                session: None,
                generation: 0,
                ever_connected: false,
                reconnect: None,
                poll: None,
                repoll: None,
            }),
        });
        Self { shared }
    }

    /// Attempt a connection now
    ///
    /// Returns once the attempt has finished. A failed attempt arms the
    /// reconnect timer; the failure itself is only logged.
    pub async fn connect(&self) {
        self.shared.connect().await;
    }

    /// Start connecting in the background
    pub fn start(&self) {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move { shared.connect().await });
    }

    /// Stop polling, cancel timers and release the session
    pub fn disconnect(&self) {
        self.shared.disconnect();
    }

    pub fn state(&self) -> ConnectivityState {
        self.shared.inner.lock().state
    }

    /// Whether any connection attempt has ever succeeded
    pub fn ever_connected(&self) -> bool {
        self.shared.inner.lock().ever_connected
    }

    /// Whether a reconnect timer is armed
    pub fn pending_reconnect(&self) -> bool {
        self.shared
            .inner
            .lock()
            .reconnect
            .as_ref()
            .is_some_and(TaskHandle::is_pending)
    }

    /// The live session, or why there is none
    pub fn session(&self) -> Result<Arc<DeviceSession>, SyncError> {
        self.shared.current_session()
    }

    /// Fetch the full property set once through the live session
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let session = self.shared.current_session()?;
        self.shared.poll_once(&session).await
    }

    /// Re-poll after `delay`, replacing any re-poll already scheduled
    pub fn schedule_refresh(&self, delay: Duration) {
        let weak = Arc::downgrade(&self.shared);
        let task = scheduler::schedule_after(delay, async move {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if let Ok(session) = shared.current_session() {
                let _ = shared.poll_once(&session).await;
            }
        });

        let mut inner = self.shared.inner.lock();
        cancel_slot(&mut inner.repoll);
        inner.repoll = Some(task);
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.shared.config
    }

    pub fn sync_config(&self) -> &SyncConfig {
        &self.shared.sync
    }

    pub fn cache(&self) -> &Arc<StateCache> {
        &self.shared.cache
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shared.disconnect();
    }
}
