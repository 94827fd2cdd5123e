//! Trace replay
//!
//! Plays a recorded trace back in a loop, one sample per tick. Emitted
//! timestamps are shifted onto the wall clock:
//!
//! ```text
//! wall_ts = anchor + (trace_ts - trace_base_ts)
//! ```
//!
//! `anchor` starts at the playback start time. Each time the cursor wraps
//! to the beginning of the trace it moves to one tick after the last
//! emitted timestamp, so looped playback keeps moving forward in time.
//!
//! Samples are emitted at the fixed tick rate whatever the recorded spacing
//! was; only the timestamps carry the recorded timing.

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::hub::BroadcastHub;
use crate::sample::{unix_now, Sample};
use crate::trace::Trace;

/// Re-timing cursor over a trace
#[derive(Debug, Clone)]
pub struct ReplayClock {
    trace: Trace,
    /// Samples emitted so far; the trace index is `cursor % len`
    cursor: u64,
    base_ts: f64,
    anchor: f64,
    last_emitted: f64,
    tick: f64,
}

impl ReplayClock {
    /// Start playback of `trace` at wall-clock time `playback_start`
    pub fn new(trace: Trace, playback_start: f64, tick: Duration) -> Self {
        let base_ts = trace.base_timestamp();
        Self {
            trace,
            cursor: 0,
            base_ts,
            anchor: playback_start,
            last_emitted: playback_start,
            tick: tick.as_secs_f64(),
        }
    }

    /// Number of samples emitted so far
    pub fn emitted(&self) -> u64 {
        self.cursor
    }

    /// Number of completed passes over the trace
    pub fn passes(&self) -> u64 {
        self.cursor / self.trace.len() as u64
    }

    /// Produce the next re-timed sample
    pub fn next_sample(&mut self) -> Sample {
        let len = self.trace.len() as u64;
        let index = (self.cursor % len) as usize;

        if index == 0 && self.cursor > 0 {
            self.anchor = self.last_emitted + self.tick;
        }

        let recorded = &self.trace.samples()[index];
        let ts = self.anchor + (recorded.timestamp - self.base_ts);

        self.cursor += 1;
        self.last_emitted = ts;
        recorded.retimed(ts)
    }
}

/// Sample source backed by a recorded trace
pub struct ReplaySource {
    trace: Trace,
    tick: Duration,
    clock: Option<ReplayClock>,
}

impl ReplaySource {
    /// Create a replay source for a loaded trace
    pub fn new(trace: Trace, tick: Duration) -> Self {
        Self {
            trace,
            tick,
            clock: None,
        }
    }

    /// Load the trace at `path` and create a replay source for it
    pub async fn open(path: impl AsRef<std::path::Path>, tick: Duration) -> Result<Self> {
        let trace = Trace::load(path.as_ref()).await?;
        tracing::info!(
            path = %path.as_ref().display(),
            samples = trace.len(),
            span_secs = trace.span(),
            "Trace loaded"
        );
        Ok(Self::new(trace, tick))
    }

    /// The trace being replayed
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Samples emitted so far
    pub fn emitted(&self) -> u64 {
        self.clock.as_ref().map_or(0, ReplayClock::emitted)
    }

    /// Emit samples until cancelled
    ///
    /// Playback time is anchored on the first call; calling `run` again
    /// after cancellation resumes where it left off.
    pub async fn run(&mut self, hub: &BroadcastHub) -> Result<()> {
        let tick = self.tick;
        let trace = &self.trace;
        let clock = self
            .clock
            .get_or_insert_with(|| ReplayClock::new(trace.clone(), unix_now(), tick));

        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let sample = clock.next_sample();
            hub.publish(&sample)?;

            if clock.emitted() % self.trace.len() as u64 == 0 {
                tracing::debug!(passes = clock.passes(), "Replay wrapped");
            }
        }
    }
}
