//! Heart-rate sample type

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One timestamped data point from the producer
///
/// Cheap to clone: the payload is reference counted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    /// Raw notification payload
    pub payload: Bytes,
}

impl Sample {
    /// Create a new sample
    pub fn new(timestamp: f64, payload: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            payload: payload.into(),
        }
    }

    /// Create a sample stamped with the current wall-clock time
    pub fn now(payload: impl Into<Bytes>) -> Self {
        Self::new(unix_now(), payload)
    }

    /// Heart rate in BPM, carried in the second payload byte
    pub fn heart_rate(&self) -> Option<u8> {
        self.payload.get(1).copied()
    }

    /// Copy of this sample with a different timestamp
    pub fn retimed(&self, timestamp: f64) -> Self {
        Self {
            timestamp,
            payload: self.payload.clone(),
        }
    }

    /// Timestamp in whole milliseconds since the epoch
    pub fn millis(&self) -> i64 {
        (self.timestamp * 1000.0) as i64
    }
}

/// Current wall-clock time as float seconds since the epoch
pub fn unix_now() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heart_rate_second_byte() {
        let sample = Sample::new(0.0, vec![0x00, 0x50]);
        assert_eq!(sample.heart_rate(), Some(80));
    }

    #[test]
    fn test_heart_rate_short_payload() {
        assert_eq!(Sample::new(0.0, vec![0x00]).heart_rate(), None);
        assert_eq!(Sample::new(0.0, Bytes::new()).heart_rate(), None);
    }

    #[test]
    fn test_retimed_keeps_payload() {
        let sample = Sample::new(10.0, vec![0x00, 0x48]);
        let moved = sample.retimed(1234.5);
        assert_eq!(moved.timestamp, 1234.5);
        assert_eq!(moved.payload, sample.payload);
    }

    #[test]
    fn test_millis() {
        assert_eq!(Sample::new(1.5, Bytes::new()).millis(), 1500);
    }

    #[test]
    fn test_unix_now_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(unix_now() > 1_577_836_800.0);
    }
}
