//! Broadcast hub statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of hub activity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Samples handed to `publish`
    pub samples_published: u64,
    /// Frames successfully written to subscribers
    pub frames_delivered: u64,
    /// Subscribers ever registered
    pub subscribers_registered: u64,
    /// Subscribers removed because of a write failure, lag or disconnect
    pub subscribers_dropped: u64,
    /// Subscribers currently connected
    pub active_subscribers: u64,
}

/// Live counters behind [`HubStats`]
#[derive(Debug, Default)]
pub(crate) struct HubCounters {
    published: AtomicU64,
    delivered: AtomicU64,
    registered: AtomicU64,
    dropped: AtomicU64,
}

impl HubCounters {
    pub(crate) fn on_publish(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_register(&self) {
        self.registered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, active_subscribers: usize) -> HubStats {
        HubStats {
            samples_published: self.published.load(Ordering::Relaxed),
            frames_delivered: self.delivered.load(Ordering::Relaxed),
            subscribers_registered: self.registered.load(Ordering::Relaxed),
            subscribers_dropped: self.dropped.load(Ordering::Relaxed),
            active_subscribers: active_subscribers as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_counters_are_zero() {
        let counters = HubCounters::default();
        assert_eq!(counters.snapshot(0), HubStats::default());
    }

    #[test]
    fn test_snapshot() {
        let counters = HubCounters::default();
        counters.on_register();
        counters.on_register();
        counters.on_publish();
        counters.on_delivered();
        counters.on_delivered();
        counters.on_drop();

        let stats = counters.snapshot(1);
        assert_eq!(stats.samples_published, 1);
        assert_eq!(stats.frames_delivered, 2);
        assert_eq!(stats.subscribers_registered, 2);
        assert_eq!(stats.subscribers_dropped, 1);
        assert_eq!(stats.active_subscribers, 1);
    }
}
