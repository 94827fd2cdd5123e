//! Session configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::hub::HubConfig;
use crate::protocol::constants::{DEFAULT_PORT, DEFAULT_REPLAY_TICK};
use crate::source::{LiveSettings, HEART_RATE_MEASUREMENT_UUID};

/// Default device name the live source looks for
pub const DEFAULT_DEVICE_NAME: &str = "HRMPro+:361837";

/// Where samples come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMode {
    /// Live sensor notifications
    Live {
        /// Advertised device name
        device_name: String,
        /// Characteristic delivering measurements
        characteristic: String,
    },
    /// Replay of a recorded trace
    Replay {
        /// Trace file to load
        trace_path: PathBuf,
    },
}

impl SourceMode {
    /// Live mode for the heart-rate measurement characteristic of `device_name`
    pub fn live(device_name: impl Into<String>) -> Self {
        SourceMode::Live {
            device_name: device_name.into(),
            characteristic: HEART_RATE_MEASUREMENT_UUID.to_string(),
        }
    }

    /// Replay mode for the trace at `path`
    pub fn replay(path: impl Into<PathBuf>) -> Self {
        SourceMode::Replay {
            trace_path: path.into(),
        }
    }

    /// Whether this is replay mode
    pub fn is_replay(&self) -> bool {
        matches!(self, SourceMode::Replay { .. })
    }
}

impl Default for SourceMode {
    fn default() -> Self {
        SourceMode::live(DEFAULT_DEVICE_NAME)
    }
}

/// Session configuration options
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Address the subscriber listener binds to
    pub bind_addr: SocketAddr,

    /// Enable TCP_NODELAY on subscriber sockets
    pub tcp_nodelay: bool,

    /// Sample source
    pub mode: SourceMode,

    /// Directory for live recordings
    pub output_dir: PathBuf,

    /// Interval between replayed samples
    pub replay_tick: Duration,

    /// Bound on device discovery
    pub discovery_timeout: Duration,

    /// Bound on device connection
    pub connect_timeout: Duration,

    /// Frames buffered per subscriber before it is dropped
    pub subscriber_queue: usize,

    /// Maximum time for one frame write to a subscriber
    pub write_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let hub = HubConfig::default();
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            tcp_nodelay: true,
            mode: SourceMode::default(),
            output_dir: PathBuf::from("."),
            replay_tick: DEFAULT_REPLAY_TICK,
            discovery_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(120),
            subscriber_queue: hub.subscriber_queue,
            write_timeout: hub.write_timeout,
        }
    }
}

impl SessionConfig {
    /// Create a config for the given source mode
    pub fn with_mode(mode: SourceMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the source mode
    pub fn mode(mut self, mode: SourceMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the recording directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the replay tick
    pub fn replay_tick(mut self, tick: Duration) -> Self {
        self.replay_tick = tick;
        self
    }

    /// Set the discovery timeout
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the per-subscriber queue length
    pub fn subscriber_queue(mut self, frames: usize) -> Self {
        self.subscriber_queue = frames;
        self
    }

    /// Hub settings derived from this config
    pub fn hub_config(&self) -> HubConfig {
        HubConfig::default()
            .subscriber_queue(self.subscriber_queue)
            .write_timeout(self.write_timeout)
    }

    /// Live source settings, if in live mode
    pub fn live_settings(&self) -> Option<LiveSettings> {
        match &self.mode {
            SourceMode::Live {
                device_name,
                characteristic,
            } => Some(LiveSettings {
                device_name: device_name.clone(),
                characteristic: characteristic.clone(),
                discovery_timeout: self.discovery_timeout,
                connect_timeout: self.connect_timeout,
            }),
            SourceMode::Replay { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();

        assert_eq!(config.bind_addr, "127.0.0.1:8888".parse().unwrap());
        assert!(config.tcp_nodelay);
        assert!(!config.mode.is_replay());
        assert_eq!(config.replay_tick, Duration::from_millis(100));
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        let config = SessionConfig::default()
            .bind(addr)
            .mode(SourceMode::replay("hr.trace"))
            .replay_tick(Duration::from_millis(20))
            .subscriber_queue(8);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.mode, SourceMode::replay("hr.trace"));
        assert_eq!(config.replay_tick, Duration::from_millis(20));
        assert_eq!(config.hub_config().subscriber_queue, 8);
    }

    #[test]
    fn test_live_settings() {
        let config = SessionConfig::with_mode(SourceMode::live("HRM-SIM"))
            .discovery_timeout(Duration::from_secs(3));

        let settings = config.live_settings().unwrap();
        assert_eq!(settings.device_name, "HRM-SIM");
        assert_eq!(settings.characteristic, HEART_RATE_MEASUREMENT_UUID);
        assert_eq!(settings.discovery_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_replay_has_no_live_settings() {
        let config = SessionConfig::with_mode(SourceMode::replay("hr.trace"));
        assert!(config.live_settings().is_none());
    }
}
