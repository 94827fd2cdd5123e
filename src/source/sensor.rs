//! Sensor capability
//!
//! The radio stack that finds and talks to a physical heart-rate strap
//! lives outside this crate. It is plugged in through [`SensorLink`].

use std::fmt;
use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;

/// GATT Heart Rate service
pub const HEART_RATE_SERVICE_UUID: &str = "0000180d-0000-1000-8000-00805f9b34fb";

/// GATT Heart Rate Measurement characteristic
pub const HEART_RATE_MEASUREMENT_UUID: &str = "00002a37-0000-1000-8000-00805f9b34fb";

/// Source of asynchronous sensor notifications
///
/// Implementations wrap a concrete transport (BLE, serial, a simulator).
/// Notifications are delivered over a channel; the channel closing while
/// the session is running means the transport was lost.
pub trait SensorLink: Send {
    /// Handle to a discovered device
    type Device: fmt::Debug + Send;

    /// Open connection to a device; dropping it disconnects
    type Connection: Send;

    /// Look for a device advertising `name`
    ///
    /// Resolves to `None` if the scan finished without a match. The caller
    /// bounds the whole call with `timeout`.
    fn discover(
        &mut self,
        name: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<Self::Device>>> + Send;

    /// Connect to a discovered device
    fn connect(
        &mut self,
        device: Self::Device,
    ) -> impl Future<Output = Result<Self::Connection>> + Send;

    /// Start notifications for `characteristic`
    fn subscribe(
        &mut self,
        connection: &mut Self::Connection,
        characteristic: &str,
    ) -> impl Future<Output = Result<mpsc::Receiver<Bytes>>> + Send;
}

/// Link type for sessions that never go live
///
/// Uninhabited: a `SessionController<NoSensor>` can only replay traces.
#[derive(Debug)]
pub enum NoSensor {}

impl SensorLink for NoSensor {
    type Device = NoSensor;
    type Connection = NoSensor;

    async fn discover(&mut self, _name: &str, _timeout: Duration) -> Result<Option<NoSensor>> {
        match *self {}
    }

    async fn connect(&mut self, device: NoSensor) -> Result<NoSensor> {
        match device {}
    }

    async fn subscribe(
        &mut self,
        _connection: &mut NoSensor,
        _characteristic: &str,
    ) -> Result<mpsc::Receiver<Bytes>> {
        match *self {}
    }
}
