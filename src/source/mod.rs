//! Sample sources
//!
//! A session has exactly one producer, either a live sensor feed or a
//! replayed trace. Both push samples into the broadcast hub as they are
//! produced and run until the session cancels them.

pub mod live;
pub mod replay;
pub mod sensor;
pub mod simulated;

pub use live::{LiveSettings, LiveSource};
pub use replay::{ReplayClock, ReplaySource};
pub use sensor::{NoSensor, SensorLink, HEART_RATE_MEASUREMENT_UUID, HEART_RATE_SERVICE_UUID};
pub use simulated::{SimulatedSensor, Waveform};

use crate::error::Result;
use crate::hub::BroadcastHub;
use crate::trace::Recording;

/// The session's producer
pub enum SampleSource<L: SensorLink> {
    /// Sensor notification feed
    Live(LiveSource<L>),
    /// Recorded trace played back in a loop
    Replay(ReplaySource),
}

impl<L: SensorLink> SampleSource<L> {
    /// Produce samples into `hub` until cancelled or a fatal error occurs
    pub async fn run(&mut self, hub: &BroadcastHub) -> Result<()> {
        match self {
            SampleSource::Live(source) => source.run(hub).await,
            SampleSource::Replay(source) => source.run(hub).await,
        }
    }

    /// Release the producer; live sources write their recording here
    pub fn finish(&mut self) -> Result<Option<Recording>> {
        match self {
            SampleSource::Live(source) => source.finish(),
            SampleSource::Replay(_) => Ok(None),
        }
    }

    /// Short name of the variant, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            SampleSource::Live(_) => "live",
            SampleSource::Replay(_) => "replay",
        }
    }
}
