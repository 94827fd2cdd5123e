//! Per-subscriber delivery task
//!
//! Each subscriber owns a broadcast receiver (its outbound queue) and a
//! task that drains it into the connection. The task ends on the first
//! write failure, when the queue overflows, when the peer hangs up, or on
//! hub shutdown, and then removes the subscriber from the hub.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::error::Error;
use crate::protocol::write_frame;

use super::store::BroadcastHub;

/// Unique identifier of a subscriber within a hub
pub type SubscriberId = u64;

/// Public view of a registered subscriber
#[derive(Debug, Clone)]
pub struct SubscriberInfo {
    /// Subscriber ID
    pub id: SubscriberId,
    /// Peer description (usually the remote socket address)
    pub peer: String,
    /// When the subscriber was registered
    pub registered_at: Instant,
}

/// Why a subscriber left the hub
#[derive(Debug)]
pub enum DropReason {
    /// Writing a frame failed
    WriteFailed(Error),
    /// Writing a frame did not complete in time
    WriteTimeout(Duration),
    /// The subscriber fell behind by this many frames
    Lagged(u64),
    /// The peer closed its side of the connection
    Disconnected,
    /// Removed through `BroadcastHub::disconnect`
    Removed,
    /// The hub is shutting down
    Shutdown,
}

impl DropReason {
    /// Whether this removal counts as a dropped subscriber in the stats
    pub fn is_drop(&self) -> bool {
        !matches!(self, DropReason::Shutdown)
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::WriteFailed(e) => write!(f, "write failed: {}", e),
            DropReason::WriteTimeout(t) => write!(f, "write timed out after {:?}", t),
            DropReason::Lagged(n) => write!(f, "lagged by {} frames", n),
            DropReason::Disconnected => write!(f, "peer disconnected"),
            DropReason::Removed => write!(f, "removed"),
            DropReason::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Hub-side record of a subscriber
pub(super) struct SubscriberEntry {
    pub(super) info: SubscriberInfo,
    pub(super) task: JoinHandle<()>,
}

/// Everything a delivery task needs
pub(super) struct Delivery<S> {
    pub(super) id: SubscriberId,
    pub(super) stream: S,
    pub(super) frames: broadcast::Receiver<Bytes>,
    pub(super) shutdown: watch::Receiver<bool>,
    pub(super) write_timeout: Duration,
}

impl<S> Delivery<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Pump frames into the connection until something ends it
    pub(super) async fn run(self, hub: Arc<BroadcastHub>) {
        let Delivery {
            id,
            stream,
            mut frames,
            mut shutdown,
            write_timeout,
        } = self;

        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut scratch = [0u8; 64];

        let reason = if *shutdown.borrow_and_update() {
            DropReason::Shutdown
        } else {
            loop {
                let frame = tokio::select! {
                    _ = shutdown.changed() => break DropReason::Shutdown,
                    read = reader.read(&mut scratch) => match read {
                        // Subscribers never send; anything else is ignored
                        Ok(0) | Err(_) => break DropReason::Disconnected,
                        Ok(_) => continue,
                    },
                    frame = frames.recv() => frame,
                };

                let frame = match frame {
                    Ok(frame) => frame,
                    Err(broadcast::error::RecvError::Lagged(n)) => break DropReason::Lagged(n),
                    Err(broadcast::error::RecvError::Closed) => break DropReason::Shutdown,
                };

                tokio::select! {
                    _ = shutdown.changed() => break DropReason::Shutdown,
                    written = tokio::time::timeout(write_timeout, write_frame(&mut writer, &frame)) => {
                        match written {
                            Ok(Ok(())) => hub.counters().on_delivered(),
                            Ok(Err(e)) => break DropReason::WriteFailed(e),
                            Err(_) => break DropReason::WriteTimeout(write_timeout),
                        }
                    }
                }
            }
        };

        let _ = writer.shutdown().await;
        hub.remove(id, reason).await;
    }
}
