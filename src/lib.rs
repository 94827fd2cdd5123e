//! pulsecast: heart-rate sample ingestion and TCP fan-out
//!
//! A session takes samples from one producer (a live sensor or a replayed
//! trace file) and pushes each one, as soon as it is produced, to every TCP
//! subscriber currently connected.
//!
//! # Wire format
//!
//! Every sample goes out as one frame:
//!
//! ```text
//! +----------------------+-------------------------------+
//! | length (u32, BE)     | MessagePack [timestamp, bytes] |
//! +----------------------+-------------------------------+
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pulsecast::server::{SessionConfig, SourceMode};
//! use pulsecast::session::SessionController;
//!
//! # async fn example() -> pulsecast::error::Result<()> {
//! let config = SessionConfig::with_mode(SourceMode::replay("hr-1718000000.trace"));
//!
//! let report = SessionController::replay(config)
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!
//! println!("published {} samples", report.stats.samples_published);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod hub;
pub mod protocol;
pub mod sample;
pub mod server;
pub mod session;
pub mod source;
pub mod trace;

pub use error::{Error, Result};
pub use hub::BroadcastHub;
pub use sample::Sample;
pub use server::{SessionConfig, SourceMode};
pub use session::{SessionController, SessionReport};
