//! Live sensor source
//!
//! Finds the configured device, subscribes to its measurement
//! characteristic and turns every notification into a sample stamped with
//! the capture time. Each sample is recorded before it is published.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::hub::BroadcastHub;
use crate::sample::Sample;
use crate::trace::{Recording, TraceRecorder};

use super::sensor::{SensorLink, HEART_RATE_MEASUREMENT_UUID};

/// Which device and characteristic to listen to
#[derive(Debug, Clone)]
pub struct LiveSettings {
    /// Advertised device name
    pub device_name: String,
    /// Characteristic delivering measurements
    pub characteristic: String,
    /// Bound on device discovery
    pub discovery_timeout: Duration,
    /// Bound on connection setup
    pub connect_timeout: Duration,
}

impl LiveSettings {
    /// Settings for the heart-rate measurement characteristic of `device_name`
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            characteristic: HEART_RATE_MEASUREMENT_UUID.to_string(),
            discovery_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(120),
        }
    }
}

/// Sample source backed by a sensor notification feed
pub struct LiveSource<L: SensorLink> {
    link: L,
    settings: LiveSettings,
    recorder: Option<TraceRecorder>,
    /// Kept alive for the duration of the session
    connection: Option<L::Connection>,
    notifications: Option<mpsc::Receiver<Bytes>>,
    received: u64,
}

impl<L: SensorLink> LiveSource<L> {
    /// Create a live source that records into `recorder`
    pub fn new(link: L, settings: LiveSettings, recorder: TraceRecorder) -> Self {
        Self {
            link,
            settings,
            recorder: Some(recorder),
            connection: None,
            notifications: None,
            received: 0,
        }
    }

    /// Settings in use
    pub fn settings(&self) -> &LiveSettings {
        &self.settings
    }

    /// Notifications received so far
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Discover, connect and subscribe
    async fn open(&mut self) -> Result<mpsc::Receiver<Bytes>> {
        let name = self.settings.device_name.clone();

        tracing::info!(device = %name, "Discovering");
        let timeout = self.settings.discovery_timeout;
        let found = tokio::time::timeout(timeout, self.link.discover(&name, timeout)).await;
        let device = match found {
            Ok(Ok(Some(device))) => device,
            Ok(Ok(None)) | Err(_) => return Err(Error::DeviceNotFound { name, timeout }),
            Ok(Err(e)) => return Err(e),
        };
        tracing::info!(device = ?device, "Found device");

        tracing::info!("Connecting");
        let connect_timeout = self.settings.connect_timeout;
        let connected = tokio::time::timeout(connect_timeout, self.link.connect(device)).await;
        let mut connection = match connected {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::ConnectionFailed {
                    name,
                    reason: format!("timed out after {:?}", connect_timeout),
                })
            }
        };

        let notifications = self
            .link
            .subscribe(&mut connection, &self.settings.characteristic)
            .await?;
        self.connection = Some(connection);

        tracing::info!(device = %name, "Connected, listening for heart rate data");
        Ok(notifications)
    }

    /// Receive notifications until cancelled or the link drops
    ///
    /// Never returns `Ok`: a closed notification feed is `ConnectionLost`.
    pub async fn run(&mut self, hub: &BroadcastHub) -> Result<()> {
        if self.notifications.is_none() {
            self.notifications = Some(self.open().await?);
        }

        loop {
            let payload = match self.notifications.as_mut() {
                Some(rx) => rx.recv().await,
                None => None,
            };

            match payload {
                Some(payload) => self.on_notification(hub, payload)?,
                None => {
                    self.notifications = None;
                    self.connection = None;
                    return Err(Error::ConnectionLost(format!(
                        "notifications from '{}' stopped",
                        self.settings.device_name
                    )));
                }
            }
        }
    }

    fn on_notification(&mut self, hub: &BroadcastHub, payload: Bytes) -> Result<()> {
        let sample = Sample::now(payload);
        self.received += 1;

        match sample.heart_rate() {
            Some(bpm) => tracing::info!(bpm, "Heart rate"),
            None => tracing::debug!(len = sample.payload.len(), "Short notification"),
        }

        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(&sample)?;
        }

        hub.publish(&sample)?;
        Ok(())
    }

    /// Disconnect and write the recording
    pub fn finish(&mut self) -> Result<Option<Recording>> {
        self.notifications = None;
        self.connection = None;
        self.recorder.take().map(TraceRecorder::finish).transpose()
    }
}
