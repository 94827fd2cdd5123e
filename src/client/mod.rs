//! Subscriber client
//!
//! Connects to a running server and reads the frame stream back into
//! samples.

pub mod watcher;

pub use watcher::Watcher;
