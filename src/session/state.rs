//! Session state machine
//!
//! ```text
//! Idle ──► Starting ──► Running ──► Stopping ──► Stopped
//!              │                        ▲
//!              └────── (start failed) ──┘
//! ```

use std::fmt;
use std::time::{Duration, Instant};

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Created, nothing opened yet
    Idle,
    /// Opening the listener and the trace
    Starting,
    /// Producer and listener running
    Running,
    /// Tearing down
    Stopping,
    /// Terminal
    Stopped,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Starting => "starting",
            SessionPhase::Running => "running",
            SessionPhase::Stopping => "stopping",
            SessionPhase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Phase tracking for one session
#[derive(Debug)]
pub struct SessionState {
    phase: SessionPhase,
    created_at: Instant,
    running_since: Option<Instant>,
}

impl SessionState {
    /// Create an idle session state
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            created_at: Instant::now(),
            running_since: None,
        }
    }

    /// Current phase
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Idle -> Starting
    pub fn start(&mut self) {
        if self.phase == SessionPhase::Idle {
            self.transition(SessionPhase::Starting);
        }
    }

    /// Starting -> Running
    pub fn mark_running(&mut self) {
        if self.phase == SessionPhase::Starting {
            self.running_since = Some(Instant::now());
            self.transition(SessionPhase::Running);
        }
    }

    /// Starting | Running -> Stopping
    pub fn stop(&mut self) {
        if matches!(self.phase, SessionPhase::Starting | SessionPhase::Running) {
            self.transition(SessionPhase::Stopping);
        }
    }

    /// Stopping -> Stopped
    pub fn mark_stopped(&mut self) {
        if self.phase == SessionPhase::Stopping {
            self.transition(SessionPhase::Stopped);
        }
    }

    /// Time spent in Running (up to now if still running)
    pub fn running_duration(&self) -> Duration {
        self.running_since.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Time since the session was created
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    fn transition(&mut self, next: SessionPhase) {
        tracing::debug!(from = %self.phase, to = %next, "Session phase");
        self.phase = next;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
