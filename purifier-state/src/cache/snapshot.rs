//! Immutable view of one successful poll

use std::collections::BTreeMap;

use purifier_api::{PropertyName, PropertyValue};
use tokio::time::Instant;

/// Normalized property values from one successful fetch
///
/// Snapshots are never edited. A newer poll produces a new snapshot that
/// replaces this one as a whole.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    values: BTreeMap<PropertyName, PropertyValue>,
    refreshed_at: Instant,
}

impl StateSnapshot {
    /// Create a snapshot stamped with the current (monotonic) time
    pub fn new(values: BTreeMap<PropertyName, PropertyValue>) -> Self {
        Self {
            values,
            refreshed_at: Instant::now(),
        }
    }

    pub fn get(&self, name: PropertyName) -> Option<&PropertyValue> {
        self.values.get(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyName, &PropertyValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// When the fetch behind this snapshot completed
    pub fn refreshed_at(&self) -> Instant {
        self.refreshed_at
    }
}
