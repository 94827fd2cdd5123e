//! Session lifecycle
//!
//! A session owns one listener, one hub and one sample source. The
//! controller opens them in order and tears them down together.

pub mod controller;
pub mod state;

pub use controller::{Session, SessionController, SessionReport};
pub use state::{SessionPhase, SessionState};
