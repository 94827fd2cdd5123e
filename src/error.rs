//! Error types
//!
//! Producer-side failures end the session. `ConnectionClosed` is the only
//! error that is recovered locally: it removes a single subscriber.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Error type for pulsecast operations
#[derive(Error, Debug)]
pub enum Error {
    /// The named sensor was not discovered before the timeout elapsed
    #[error("device '{name}' not found within {}s", timeout.as_secs())]
    DeviceNotFound { name: String, timeout: Duration },

    /// The sensor was found but the connection attempt failed
    #[error("failed to connect to device '{name}': {reason}")]
    ConnectionFailed { name: String, reason: String },

    /// The sensor transport dropped during an active session
    #[error("connection to device lost: {0}")]
    ConnectionLost(String),

    /// The peer closed the stream before a full frame was transferred
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// A trace file is missing, corrupt or empty
    #[error("trace {} unreadable: {reason}", path.display())]
    TraceUnreadable { path: PathBuf, reason: String },

    /// The subscriber listener could not bind its address
    #[error("failed to bind listener on {addr}: {source}")]
    ListenerBindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be serialized or deserialized
    #[error("codec error: {0}")]
    Codec(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a `TraceUnreadable` error for `path`
    pub fn trace_unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::TraceUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error terminates the whole session
    ///
    /// Everything except a subscriber-side `ConnectionClosed` is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::ConnectionClosed)
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Codec(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Codec(e.to_string())
    }
}

/// Result type alias for pulsecast operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_not_found_display() {
        let err = Error::DeviceNotFound {
            name: "HRMPro+:361837".into(),
            timeout: Duration::from_secs(10),
        };
        assert_eq!(
            err.to_string(),
            "device 'HRMPro+:361837' not found within 10s"
        );
    }

    #[test]
    fn test_trace_unreadable_display() {
        let err = Error::trace_unreadable("hr.data", "empty trace");
        assert!(err.to_string().contains("hr.data"));
        assert!(err.to_string().contains("empty trace"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(!Error::ConnectionClosed.is_fatal());
        assert!(Error::ConnectionLost("link dropped".into()).is_fatal());
        assert!(Error::trace_unreadable("x", "y").is_fatal());
    }
}
