//! Last-known device state

mod snapshot;
mod state_cache;

pub use snapshot::StateSnapshot;
pub use state_cache::{CacheUpdated, StateCache};
