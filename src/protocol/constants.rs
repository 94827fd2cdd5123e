//! Protocol constants

use std::time::Duration;

/// Default subscriber listener port
pub const DEFAULT_PORT: u16 = 8888;

/// Size of the big-endian length prefix in front of every frame
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest record the length prefix can describe
pub const MAX_RECORD_SIZE: usize = u32::MAX as usize;

/// Interval between replayed samples
pub const DEFAULT_REPLAY_TICK: Duration = Duration::from_millis(100);
