//! Subscriber listener
//!
//! Accepts TCP connections and registers each one with the broadcast hub.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use crate::error::{Error, Result};
use crate::hub::BroadcastHub;

/// Pause after a failed accept so a persistent error does not spin
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Accept loop feeding the broadcast hub
pub struct SubscriberListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    tcp_nodelay: bool,
    hub: Arc<BroadcastHub>,
}

impl SubscriberListener {
    /// Bind the listening socket
    pub async fn bind(addr: SocketAddr, tcp_nodelay: bool, hub: Arc<BroadcastHub>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::ListenerBindFailed { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| Error::ListenerBindFailed { addr, source })?;

        tracing::info!(addr = %local_addr, "Subscriber listener bound");

        Ok(Self {
            listener,
            local_addr,
            tcp_nodelay,
            hub,
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections forever
    ///
    /// Accept failures are logged and do not stop the loop.
    pub async fn run(&self) {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }

    /// Accept connections until `shutdown` resolves
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::select! {
            _ = shutdown => {
                tracing::debug!(addr = %self.local_addr, "Listener stopping");
            }
            _ = self.run() => {}
        }
    }

    async fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(peer = %peer_addr, error = %e, "Failed to configure socket");
            return;
        }

        if self.hub.register(peer_addr.to_string(), socket).await.is_none() {
            tracing::debug!(peer = %peer_addr, "Connection refused during shutdown");
        }
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::read_frame;
    use crate::sample::Sample;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    async fn wait_for_count(hub: &BroadcastHub, expected: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while hub.subscriber_count().await != expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("subscriber count not reached");
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        let hub = Arc::new(BroadcastHub::new());
        let first = SubscriberListener::bind(loopback(), true, Arc::clone(&hub))
            .await
            .unwrap();

        let result = SubscriberListener::bind(first.local_addr(), true, hub).await;
        assert!(matches!(result, Err(Error::ListenerBindFailed { .. })));
    }

    #[tokio::test]
    async fn test_accepted_connections_are_subscribers() {
        let hub = Arc::new(BroadcastHub::new());
        let listener = Arc::new(
            SubscriberListener::bind(loopback(), true, Arc::clone(&hub))
                .await
                .unwrap(),
        );
        let addr = listener.local_addr();

        let accept = {
            let listener = Arc::clone(&listener);
            tokio::spawn(async move { listener.run().await })
        };

        let mut first = TcpStream::connect(addr).await.unwrap();
        let mut second = TcpStream::connect(addr).await.unwrap();
        wait_for_count(&hub, 2).await;

        let sample = Sample::new(1.0, vec![0x00, 88]);
        assert_eq!(hub.publish(&sample).unwrap(), 2);

        assert_eq!(read_frame(&mut first).await.unwrap(), sample);
        assert_eq!(read_frame(&mut second).await.unwrap(), sample);

        let peers: Vec<String> = hub.subscribers().await.into_iter().map(|s| s.peer).collect();
        assert!(peers.contains(&first.local_addr().unwrap().to_string()));

        accept.abort();
    }

    #[tokio::test]
    async fn test_run_until_stops() {
        let hub = Arc::new(BroadcastHub::new());
        let listener = SubscriberListener::bind(loopback(), true, hub).await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), listener.run_until(async {}))
            .await
            .expect("listener did not stop");
    }
}
