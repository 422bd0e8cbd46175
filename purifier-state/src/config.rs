//! Engine timing configuration

use std::time::Duration;

/// Timing used by the connection manager, poll loop and facade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Time between full property fetches
    /// Default: 15 seconds
    pub poll_interval: Duration,

    /// Fixed delay before reconnecting after a failure
    /// Default: 30 seconds
    pub reconnect_delay: Duration,

    /// Delay before re-polling after a successful write
    /// Default: 250 milliseconds
    pub repoll_delay: Duration,

    /// Per-request timeout, also used for the handshake
    /// Default: 5 seconds
    pub request_timeout: Duration,

    /// Capacity of the cache-updated broadcast channel
    /// Default: 16
    pub event_buffer_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            reconnect_delay: Duration::from_secs(30),
            repoll_delay: Duration::from_millis(250),
            request_timeout: Duration::from_secs(5),
            event_buffer_size: 16,
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short intervals for local development against a bench device
    pub fn fast_polling() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            reconnect_delay: Duration::from_secs(5),
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_repoll_delay(mut self, delay: Duration) -> Self {
        self.repoll_delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.reconnect_delay, Duration::from_secs(30));
        assert_eq!(config.repoll_delay, Duration::from_millis(250));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_builders() {
        let config = SyncConfig::new()
            .with_poll_interval(Duration::from_secs(60))
            .with_reconnect_delay(Duration::from_secs(10));
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.reconnect_delay, Duration::from_secs(10));
        assert_eq!(config.repoll_delay, Duration::from_millis(250));

        let config = SyncConfig::new().with_event_buffer_size(2);
        assert_eq!(config.event_buffer_size, 2);
    }
}
