//! Live session recorder
//!
//! Keeps every received sample for the binary trace written at the end of
//! the session, and appends a `millis_since_epoch,heart_rate` line per
//! sample to a companion CSV for external inspection.
//!
//! ```text
//! output_dir/
//!   hr-1718000000.trace   <- written once by finish()
//!   hr-1718000000.csv     <- appended per sample
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::protocol::encode_record;
use crate::sample::Sample;

/// Files produced by a finished recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    /// Binary trace, absent when no sample was recorded
    pub trace_path: Option<PathBuf>,
    /// CSV companion log
    pub csv_path: PathBuf,
    /// Number of samples recorded
    pub samples: usize,
}

/// Recorder for a single live session
pub struct TraceRecorder {
    trace_path: PathBuf,
    csv_path: PathBuf,
    csv: BufWriter<File>,
    samples: Vec<Sample>,
}

impl TraceRecorder {
    /// Open the recording files for a session started at `started_at`
    /// (seconds since the epoch)
    ///
    /// `output_dir` is created if it does not exist.
    pub fn create(output_dir: &Path, started_at: f64) -> Result<Self> {
        std::fs::create_dir_all(output_dir)?;

        let stem = format!("hr-{}", started_at as u64);
        let trace_path = output_dir.join(format!("{stem}.trace"));
        let csv_path = output_dir.join(format!("{stem}.csv"));

        let csv = BufWriter::new(File::create(&csv_path)?);

        tracing::debug!(
            trace = %trace_path.display(),
            csv = %csv_path.display(),
            "Recording opened"
        );

        Ok(Self {
            trace_path,
            csv_path,
            csv,
            samples: Vec::new(),
        })
    }

    /// Append a sample
    pub fn record(&mut self, sample: &Sample) -> Result<()> {
        if let Some(bpm) = sample.heart_rate() {
            writeln!(self.csv, "{},{}", sample.millis(), bpm)?;
        }
        self.samples.push(sample.clone());
        Ok(())
    }

    /// Number of samples recorded so far
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Path the binary trace will be written to
    pub fn trace_path(&self) -> &Path {
        &self.trace_path
    }

    /// Path of the CSV companion log
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    /// Flush the CSV and write the binary trace
    pub fn finish(mut self) -> Result<Recording> {
        self.csv.flush()?;

        let trace_path = if self.samples.is_empty() {
            None
        } else {
            std::fs::write(&self.trace_path, encode_record(&self.samples)?)?;
            Some(self.trace_path)
        };

        Ok(Recording {
            trace_path,
            csv_path: self.csv_path,
            samples: self.samples.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::Trace;

    #[test]
    fn test_file_names_from_start_time() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = TraceRecorder::create(dir.path(), 1_718_000_000.75).unwrap();

        assert_eq!(
            recorder.trace_path(),
            dir.path().join("hr-1718000000.trace")
        );
        assert_eq!(recorder.csv_path(), dir.path().join("hr-1718000000.csv"));
        assert!(recorder.csv_path().exists());
    }

    #[tokio::test]
    async fn test_finish_writes_trace_and_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = TraceRecorder::create(dir.path(), 1_718_000_000.0).unwrap();

        recorder.record(&Sample::new(1_718_000_000.5, vec![0x00, 80])).unwrap();
        recorder.record(&Sample::new(1_718_000_001.5, vec![0x00, 82])).unwrap();
        assert_eq!(recorder.len(), 2);

        let recording = recorder.finish().unwrap();
        assert_eq!(recording.samples, 2);

        let csv = std::fs::read_to_string(&recording.csv_path).unwrap();
        assert_eq!(csv, "1718000000500,80\n1718000001500,82\n");

        let trace = Trace::load(recording.trace_path.unwrap()).await.unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.samples()[1].heart_rate(), Some(82));
    }

    #[test]
    fn test_short_payload_skips_csv_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = TraceRecorder::create(dir.path(), 1.0).unwrap();

        recorder.record(&Sample::new(2.0, vec![0x00])).unwrap();
        let recording = recorder.finish().unwrap();

        assert_eq!(recording.samples, 1);
        assert_eq!(std::fs::read_to_string(&recording.csv_path).unwrap(), "");
    }

    #[test]
    fn test_empty_recording_writes_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = TraceRecorder::create(dir.path(), 1.0).unwrap();

        let recording = recorder.finish().unwrap();
        assert!(recording.trace_path.is_none());
        assert!(!dir.path().join("hr-1.trace").exists());
    }

    #[test]
    fn test_missing_output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("today");

        let recorder = TraceRecorder::create(&nested, 1_718_000_000.0).unwrap();
        assert!(nested.is_dir());
        assert!(recorder.csv_path().exists());
    }
}
