//! Broadcast hub configuration

use std::time::Duration;

/// Configuration for the broadcast hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Frames buffered per subscriber before it is considered lagging
    pub subscriber_queue: usize,

    /// Maximum time a single frame write may take before the subscriber is dropped
    pub write_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_queue: 256,
            write_timeout: Duration::from_secs(5),
        }
    }
}

impl HubConfig {
    /// Set the per-subscriber queue length
    pub fn subscriber_queue(mut self, frames: usize) -> Self {
        self.subscriber_queue = frames.max(1);
        self
    }

    /// Set the per-frame write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert_eq!(config.subscriber_queue, 256);
        assert_eq!(config.write_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_queue_never_zero() {
        // broadcast channels panic on zero capacity
        let config = HubConfig::default().subscriber_queue(0);
        assert_eq!(config.subscriber_queue, 1);
    }
}
