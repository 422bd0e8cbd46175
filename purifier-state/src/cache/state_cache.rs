//! Thread-safe snapshot cache with update notifications

use std::sync::Arc;

use parking_lot::RwLock;
use purifier_api::{PropertyName, PropertyValue};
use tokio::sync::broadcast;
use tracing::trace;

use super::StateSnapshot;

/// Emitted once per successful refresh, covering every property
#[derive(Debug, Clone)]
pub struct CacheUpdated {
    pub snapshot: Arc<StateSnapshot>,
}

/// Holds the current snapshot for one device
///
/// Readers get an `Arc` to the snapshot and never hold the lock while using
/// it. Writers swap the whole snapshot, so a reader sees either the old or
/// the new set of values, never a mix.
pub struct StateCache {
    current: RwLock<Option<Arc<StateSnapshot>>>,
    updates: broadcast::Sender<CacheUpdated>,
}

impl StateCache {
    pub fn new(buffer: usize) -> Self {
        let (updates, _) = broadcast::channel(buffer.max(1));
        Self {
            current: RwLock::new(None),
            updates,
        }
    }

    /// Current snapshot, if any poll has succeeded
    pub fn snapshot(&self) -> Option<Arc<StateSnapshot>> {
        self.current.read().clone()
    }

    pub fn get(&self, name: PropertyName) -> Option<PropertyValue> {
        self.current
            .read()
            .as_ref()
            .and_then(|snapshot| snapshot.get(name).cloned())
    }

    /// Replace the snapshot wholesale and notify subscribers
    pub fn replace(&self, snapshot: StateSnapshot) -> Arc<StateSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write() = Some(Arc::clone(&snapshot));

        let receivers = self
            .updates
            .send(CacheUpdated {
                snapshot: Arc::clone(&snapshot),
            })
            .unwrap_or(0);
        trace!(properties = snapshot.len(), receivers, "Snapshot replaced");
        snapshot
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheUpdated> {
        self.updates.subscribe()
    }
}

impl Default for StateCache {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use purifier_api::Mode;
    use std::collections::BTreeMap;

    fn snapshot(power: bool) -> StateSnapshot {
        let mut values = BTreeMap::new();
        values.insert(PropertyName::Power, PropertyValue::Bool(power));
        values.insert(PropertyName::Mode, PropertyValue::Mode(Mode::Auto));
        StateSnapshot::new(values)
    }

    #[test]
    fn test_empty_cache() {
        let cache = StateCache::default();
        assert!(cache.snapshot().is_none());
        assert!(cache.get(PropertyName::Power).is_none());
    }

    #[test]
    fn test_replace_is_total() {
        let cache = StateCache::default();
        cache.replace(snapshot(true));

        let mut values = BTreeMap::new();
        values.insert(PropertyName::Power, PropertyValue::Bool(false));
        cache.replace(StateSnapshot::new(values));

        assert_eq!(cache.get(PropertyName::Power), Some(PropertyValue::Bool(false)));
        // Mode was not part of the newer snapshot.
        assert!(cache.get(PropertyName::Mode).is_none());
    }

    #[tokio::test]
    async fn test_one_event_per_replace() {
        let cache = StateCache::default();
        let mut rx = cache.subscribe();

        cache.replace(snapshot(true));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.snapshot.get(PropertyName::Power), Some(&PropertyValue::Bool(true)));
        assert!(rx.try_recv().is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Subscribers see every replace in order and the last one wins
            #[test]
            fn prop_events_follow_replaces(powers in prop::collection::vec(any::<bool>(), 1..32)) {
                let cache = StateCache::new(64);
                let mut rx = cache.subscribe();

                for power in &powers {
                    cache.replace(snapshot(*power));
                }

                let mut seen = Vec::new();
                while let Ok(event) = rx.try_recv() {
                    seen.push(event.snapshot.get(PropertyName::Power).and_then(PropertyValue::as_bool));
                }
                let expected: Vec<Option<bool>> = powers.iter().map(|p| Some(*p)).collect();
                prop_assert_eq!(seen, expected);
                prop_assert_eq!(
                    cache.get(PropertyName::Power),
                    powers.last().map(|p| PropertyValue::Bool(*p))
                );
            }
        }
    }
}
