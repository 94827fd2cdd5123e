//! Subscriber-facing server pieces

pub mod config;
pub mod listener;

pub use config::{SessionConfig, SourceMode, DEFAULT_DEVICE_NAME};
pub use listener::SubscriberListener;
