//! Broadcast hub for sample fan-out
//!
//! The hub takes samples from the single producer and pushes them to every
//! connected subscriber. It uses `tokio::sync::broadcast` so that each
//! sample is encoded once and shared by all subscriber queues.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<BroadcastHub>
//!                 ┌─────────────────────────────┐
//!   publish() ──► │ tx: broadcast::Sender<Bytes>│
//!                 │ subscribers: HashMap<Id,    │
//!                 │   SubscriberEntry>          │
//!                 └──────────────┬──────────────┘
//!                                │
//!          ┌─────────────────────┼─────────────────────┐
//!          ▼                     ▼                     ▼
//!    [Delivery task]       [Delivery task]       [Delivery task]
//!    frames.recv()         frames.recv()         frames.recv()
//!          │                     │                     │
//!          ▼                     ▼                     ▼
//!         TCP                   TCP                   TCP
//! ```
//!
//! A subscriber whose write fails, whose queue overflows, or whose peer
//! hangs up is removed. The publisher is never told and never waits.

pub mod config;
pub mod stats;
pub mod store;
pub mod subscriber;

pub use config::HubConfig;
pub use stats::HubStats;
pub use store::BroadcastHub;
pub use subscriber::{DropReason, SubscriberId, SubscriberInfo};
