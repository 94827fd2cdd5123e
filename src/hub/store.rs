//! Broadcast hub implementation
//!
//! The hub owns the subscriber set and fans every published sample out to
//! all subscribers registered at the time of publishing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, watch, RwLock};

use crate::error::Result;
use crate::protocol::encode;
use crate::sample::Sample;

use super::config::HubConfig;
use super::stats::{HubCounters, HubStats};
use super::subscriber::{Delivery, DropReason, SubscriberEntry, SubscriberId, SubscriberInfo};

/// Fan-out point between the sample source and the subscribers
///
/// Publishing never waits on a subscriber: each subscriber has its own
/// bounded queue and delivery task. The subscriber map is only mutated
/// under its lock (adds from the listener, removes from delivery tasks).
pub struct BroadcastHub {
    /// Encoded frames, one receiver per subscriber
    tx: broadcast::Sender<Bytes>,

    /// Registered subscribers
    subscribers: RwLock<HashMap<SubscriberId, SubscriberEntry>>,

    next_id: AtomicU64,

    /// Set to true once on shutdown
    shutdown: watch::Sender<bool>,

    counters: HubCounters,

    config: HubConfig,
}

impl BroadcastHub {
    /// Create a new hub with default configuration
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Create a new hub with custom configuration
    pub fn with_config(config: HubConfig) -> Self {
        let (tx, _) = broadcast::channel(config.subscriber_queue);
        let (shutdown, _) = watch::channel(false);

        Self {
            tx,
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            shutdown,
            counters: HubCounters::default(),
            config,
        }
    }

    /// Get the hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a new subscriber connection
    ///
    /// The subscriber receives every sample published after this call
    /// returns, in publish order. Returns `None` if the hub has shut down.
    pub async fn register<S>(self: &Arc<Self>, peer: impl Into<String>, stream: S) -> Option<SubscriberId>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let peer = peer.into();

        // Held across spawn + insert so the task cannot remove itself
        // before its entry exists.
        let mut subscribers = self.subscribers.write().await;

        if *self.shutdown.borrow() {
            tracing::debug!(peer = %peer, "Subscriber rejected: hub shut down");
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let delivery = Delivery {
            id,
            stream,
            frames: self.tx.subscribe(),
            shutdown: self.shutdown.subscribe(),
            write_timeout: self.config.write_timeout,
        };

        let task = tokio::spawn(delivery.run(Arc::clone(self)));

        subscribers.insert(
            id,
            SubscriberEntry {
                info: SubscriberInfo {
                    id,
                    peer: peer.clone(),
                    registered_at: Instant::now(),
                },
                task,
            },
        );
        self.counters.on_register();

        tracing::info!(
            subscriber_id = id,
            peer = %peer,
            subscribers = subscribers.len(),
            "Subscriber added"
        );

        Some(id)
    }

    /// Deliver a sample to every registered subscriber
    ///
    /// Returns the number of subscriber queues the frame was placed on.
    /// Subscriber failures never surface here.
    pub fn publish(&self, sample: &Sample) -> Result<usize> {
        let frame = encode(sample)?;
        self.counters.on_publish();

        // send() fails only when there are no receivers
        let queued = self.tx.send(frame).unwrap_or(0);

        tracing::trace!(
            timestamp = sample.timestamp,
            subscribers = queued,
            "Sample published"
        );

        Ok(queued)
    }

    /// Explicitly disconnect a subscriber
    pub async fn disconnect(&self, id: SubscriberId) -> bool {
        let entry = self.subscribers.write().await.remove(&id);

        match entry {
            Some(entry) => {
                entry.task.abort();
                self.counters.on_drop();
                tracing::info!(
                    subscriber_id = id,
                    peer = %entry.info.peer,
                    reason = %DropReason::Removed,
                    "Subscriber dropped"
                );
                true
            }
            None => false,
        }
    }

    /// Remove a subscriber whose delivery task has ended
    pub(super) async fn remove(&self, id: SubscriberId, reason: DropReason) {
        let entry = self.subscribers.write().await.remove(&id);

        let Some(entry) = entry else {
            // Already removed by disconnect() or shutdown()
            return;
        };

        if reason.is_drop() {
            self.counters.on_drop();
            tracing::info!(
                subscriber_id = id,
                peer = %entry.info.peer,
                reason = %reason,
                "Subscriber dropped"
            );
        } else {
            tracing::debug!(subscriber_id = id, peer = %entry.info.peer, "Subscriber closed");
        }
    }

    /// Number of registered subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Snapshot of the registered subscribers
    pub async fn subscribers(&self) -> Vec<SubscriberInfo> {
        let mut list: Vec<SubscriberInfo> = self
            .subscribers
            .read()
            .await
            .values()
            .map(|entry| entry.info.clone())
            .collect();
        list.sort_by_key(|info| info.id);
        list
    }

    /// Get hub statistics
    pub async fn stats(&self) -> HubStats {
        let active = self.subscriber_count().await;
        self.counters.snapshot(active)
    }

    pub(super) fn counters(&self) -> &HubCounters {
        &self.counters
    }

    /// Whether `shutdown` has been called
    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Close every subscriber connection and wait for the delivery tasks
    ///
    /// Later registrations are refused.
    pub async fn shutdown(&self) {
        let entries: Vec<SubscriberEntry> = {
            let mut subscribers = self.subscribers.write().await;
            self.shutdown.send_replace(true);
            subscribers.drain().map(|(_, entry)| entry).collect()
        };

        let count = entries.len();
        for entry in entries {
            if let Err(e) = entry.task.await {
                tracing::debug!(subscriber_id = entry.info.id, error = %e, "Delivery task ended abnormally");
            }
        }

        tracing::info!(closed = count, "Broadcast hub shut down");
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
