//! Simulated heart-rate sensor
//!
//! A [`SensorLink`] that needs no radio. It advertises a single device and
//! produces heart-rate measurement notifications following a slow sine
//! wave, using the same payload layout as a real strap:
//!
//! ```text
//! +-----------+-----------+
//! | Flags (1) | BPM (1)   |   flags = 0x00: 8-bit heart rate value
//! +-----------+-----------+
//! ```

use std::f64::consts::TAU;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

use super::sensor::{SensorLink, HEART_RATE_MEASUREMENT_UUID};

/// Heart-rate waveform produced by the simulator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waveform {
    /// Resting value in BPM
    pub baseline: f64,
    /// Peak deviation from the baseline in BPM
    pub amplitude: f64,
    /// Duration of one full oscillation
    pub period: Duration,
}

impl Default for Waveform {
    fn default() -> Self {
        Self {
            baseline: 75.0,
            amplitude: 20.0,
            period: Duration::from_secs(60),
        }
    }
}

impl Waveform {
    /// Heart rate at `elapsed` since the start of notifications
    pub fn bpm_at(&self, elapsed: Duration) -> u8 {
        let period = self.period.as_secs_f64().max(f64::EPSILON);
        let phase = TAU * elapsed.as_secs_f64() / period;
        (self.baseline + self.amplitude * phase.sin())
            .round()
            .clamp(0.0, 255.0) as u8
    }
}

/// Device advertised by the simulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedDevice {
    /// Advertised name
    pub name: String,
    /// Fake hardware address
    pub address: String,
}

/// Active simulator connection; dropping it stops notifications
pub struct SimulatedConnection {
    device: SimulatedDevice,
    notifier: Option<JoinHandle<()>>,
}

impl SimulatedConnection {
    /// The connected device
    pub fn device(&self) -> &SimulatedDevice {
        &self.device
    }
}

impl Drop for SimulatedConnection {
    fn drop(&mut self) {
        if let Some(task) = self.notifier.take() {
            task.abort();
        }
    }
}

/// Simulated heart-rate strap
#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    device: SimulatedDevice,
    interval: Duration,
    waveform: Waveform,
    drop_after: Option<usize>,
}

impl SimulatedSensor {
    /// Create a simulator advertising `name`, notifying once per second
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            device: SimulatedDevice {
                name: name.into(),
                address: "SIM:00:00:00:00:01".into(),
            },
            interval: Duration::from_secs(1),
            waveform: Waveform::default(),
            drop_after: None,
        }
    }

    /// Set the notification interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the heart-rate waveform
    pub fn waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }

    /// Simulate losing the link after `count` notifications
    pub fn drop_after(mut self, count: usize) -> Self {
        self.drop_after = Some(count);
        self
    }
}

impl SensorLink for SimulatedSensor {
    type Device = SimulatedDevice;
    type Connection = SimulatedConnection;

    async fn discover(&mut self, name: &str, _timeout: Duration) -> Result<Option<SimulatedDevice>> {
        tracing::debug!(name, "Scanning simulated devices");
        Ok((self.device.name == name).then(|| self.device.clone()))
    }

    async fn connect(&mut self, device: SimulatedDevice) -> Result<SimulatedConnection> {
        if device != self.device {
            return Err(Error::ConnectionFailed {
                name: device.name,
                reason: "unknown device".into(),
            });
        }

        Ok(SimulatedConnection {
            device,
            notifier: None,
        })
    }

    async fn subscribe(
        &mut self,
        connection: &mut SimulatedConnection,
        characteristic: &str,
    ) -> Result<mpsc::Receiver<Bytes>> {
        if !characteristic.eq_ignore_ascii_case(HEART_RATE_MEASUREMENT_UUID) {
            return Err(Error::ConnectionFailed {
                name: connection.device.name.clone(),
                reason: format!("characteristic {} not supported", characteristic),
            });
        }

        let (tx, rx) = mpsc::channel(64);
        let interval = self.interval;
        let waveform = self.waveform;
        let limit = self.drop_after;

        let task = tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let mut ticker = tokio::time::interval(interval);
            let mut sent = 0usize;

            while limit.map_or(true, |limit| sent < limit) {
                ticker.tick().await;
                let bpm = waveform.bpm_at(started.elapsed());
                if tx.send(Bytes::from(vec![0x00, bpm])).await.is_err() {
                    break;
                }
                sent += 1;
            }
            // tx dropped here: the subscriber sees the link go away
        });

        if let Some(previous) = connection.notifier.replace(task) {
            previous.abort();
        }

        Ok(rx)
    }
}
