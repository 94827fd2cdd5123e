//! Recorded sample traces
//!
//! A trace file holds one serialized, ordered sequence of samples using the
//! same record encoding as the wire protocol (without length prefixes).
//! Live sessions write it once at the end; replay sessions read it once at
//! the start.

pub mod recorder;

use std::path::Path;

use crate::error::{Error, Result};
use crate::protocol::{decode_record, encode_record};
use crate::sample::Sample;

pub use recorder::{Recording, TraceRecorder};

/// Ordered, non-empty sequence of samples
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    samples: Vec<Sample>,
}

impl Trace {
    /// Build a trace, checking it is non-empty and ordered by timestamp
    pub fn from_samples(samples: Vec<Sample>) -> std::result::Result<Self, String> {
        if samples.is_empty() {
            return Err("trace contains no samples".into());
        }

        if let Some(i) = samples
            .windows(2)
            .position(|w| w[1].timestamp < w[0].timestamp)
        {
            return Err(format!("timestamps decrease at index {}", i + 1));
        }

        Ok(Self { samples })
    }

    /// Load a complete trace from disk
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| Error::trace_unreadable(path, e))?;
        Self::decode(path, &data)
    }

    /// Decode trace file contents; `path` is only used for error reporting
    pub fn decode(path: impl AsRef<Path>, data: &[u8]) -> Result<Self> {
        let path = path.as_ref();
        let samples: Vec<Sample> =
            decode_record(data).map_err(|e| Error::trace_unreadable(path, e))?;
        Self::from_samples(samples).map_err(|reason| Error::trace_unreadable(path, reason))
    }

    /// Write this trace to disk, replacing any existing file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = encode_record(&self.samples)?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    /// Samples in recording order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: a trace holds at least one sample
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the first sample
    pub fn base_timestamp(&self) -> f64 {
        self.samples[0].timestamp
    }

    /// Time covered from first to last sample, in seconds
    pub fn span(&self) -> f64 {
        self.samples[self.samples.len() - 1].timestamp - self.base_timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace_of(timestamps: &[f64]) -> Trace {
        let samples = timestamps
            .iter()
            .map(|&ts| Sample::new(ts, vec![0x00, 60]))
            .collect();
        Trace::from_samples(samples).unwrap()
    }

    #[test]
    fn test_rejects_empty() {
        assert!(Trace::from_samples(Vec::new()).is_err());
    }

    #[test]
    fn test_rejects_decreasing_timestamps() {
        let samples = vec![
            Sample::new(10.0, vec![0, 60]),
            Sample::new(12.0, vec![0, 61]),
            Sample::new(11.0, vec![0, 62]),
        ];
        let err = Trace::from_samples(samples).unwrap_err();
        assert!(err.contains("index 2"));
    }

    #[test]
    fn test_accepts_equal_timestamps() {
        let trace = trace_of(&[5.0, 5.0, 6.0]);
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.base_timestamp(), 5.0);
        assert_eq!(trace.span(), 1.0);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hr.trace");

        let trace = trace_of(&[10.0, 11.0, 15.0]);
        trace.save(&path).await.unwrap();

        let loaded = Trace::load(&path).await.unwrap();
        assert_eq!(loaded, trace);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Trace::load(dir.path().join("missing.trace")).await;
        assert!(matches!(result, Err(Error::TraceUnreadable { .. })));
    }

    #[tokio::test]
    async fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.trace");
        tokio::fs::write(&path, b"not a trace").await.unwrap();

        let result = Trace::load(&path).await;
        assert!(matches!(result, Err(Error::TraceUnreadable { .. })));
    }

    #[test]
    fn test_decode_empty_sequence() {
        let data = encode_record(&Vec::<Sample>::new()).unwrap();
        let result = Trace::decode("empty.trace", &data);
        assert!(matches!(result, Err(Error::TraceUnreadable { .. })));
    }
}
