//! Frame stream reader

use std::net::SocketAddr;

use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::protocol::read_frame;
use crate::sample::Sample;

/// Subscriber connection to a pulsecast server
///
/// # Example
/// ```no_run
/// use pulsecast::client::Watcher;
///
/// # async fn example() -> pulsecast::error::Result<()> {
/// let mut watcher = Watcher::connect("127.0.0.1:8888".parse().unwrap()).await?;
///
/// while let Ok(sample) = watcher.next_sample().await {
///     if let Some(bpm) = sample.heart_rate() {
///         println!("HR: {}", bpm);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Watcher {
    stream: TcpStream,
    peer: SocketAddr,
    received: u64,
}

impl Watcher {
    /// Connect to the server at `addr`
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| Error::ConnectionFailed {
                name: addr.to_string(),
                reason: e.to_string(),
            })?;
        stream.set_nodelay(true)?;

        tracing::debug!(addr = %addr, "Connected to server");

        Ok(Self {
            stream,
            peer: addr,
            received: 0,
        })
    }

    /// Server address
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Samples read so far
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Wait for the next sample
    ///
    /// Returns `ConnectionClosed` once the server hangs up.
    pub async fn next_sample(&mut self) -> Result<Sample> {
        let sample = read_frame(&mut self.stream).await?;
        self.received += 1;
        tracing::trace!(timestamp = sample.timestamp, "Sample received");
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode, write_frame};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_reads_samples_until_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            for bpm in [70u8, 71] {
                let frame = encode(&Sample::new(bpm as f64, vec![0x00, bpm])).unwrap();
                write_frame(&mut socket, &frame).await.unwrap();
            }
        });

        let mut watcher = Watcher::connect(addr).await.unwrap();
        assert_eq!(watcher.next_sample().await.unwrap().heart_rate(), Some(70));
        assert_eq!(watcher.next_sample().await.unwrap().heart_rate(), Some(71));
        assert_eq!(watcher.received(), 2);

        server.await.unwrap();
        assert!(matches!(
            watcher.next_sample().await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = Watcher::connect(addr).await;
        assert!(matches!(result, Err(Error::ConnectionFailed { .. })));
    }
}
