//! Loopback transport for in-process client/server communication.
//!
//! A [`LoopbackConnector`] hands out connections whose far end is delivered
//! to the paired [`LoopbackAcceptor`]. Both ends are [`LoopbackConnection`]s,
//! so a test (or a local machine simulator) can play the server with the
//! same `send`/`recv`/`close` API the client uses.
//!
//! Frames travel over unbounded Tokio channels; nothing touches the network.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};

use crate::{Connection, ConnectionId, Connector, TransportError};

/// One unit travelling through the pipe.
#[derive(Debug)]
enum Frame {
    Data(Vec<u8>),
    Close,
}

/// Client half of a loopback pair. Cheap to clone; clones share the same
/// acceptor and counters.
#[derive(Debug, Clone)]
pub struct LoopbackConnector {
    shared: Arc<ConnectorShared>,
}

#[derive(Debug)]
struct ConnectorShared {
    incoming: mpsc::UnboundedSender<LoopbackConnection>,
    refusing: AtomicBool,
    attempts: AtomicU64,
}

/// Server half of a loopback pair: yields the far end of every connection
/// the connector opens.
#[derive(Debug)]
pub struct LoopbackAcceptor {
    incoming: mpsc::UnboundedReceiver<LoopbackConnection>,
}

impl LoopbackConnector {
    /// Creates a connected connector/acceptor pair.
    pub fn pair() -> (Self, LoopbackAcceptor) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            shared: Arc::new(ConnectorShared {
                incoming: tx,
                refusing: AtomicBool::new(false),
                attempts: AtomicU64::new(0),
            }),
        };
        (connector, LoopbackAcceptor { incoming: rx })
    }

    /// When `true`, every subsequent `connect` fails as if the endpoint
    /// were unreachable.
    pub fn set_refusing(&self, refusing: bool) {
        self.shared.refusing.store(refusing, Ordering::SeqCst);
    }

    /// Number of `connect` calls made so far, successful or not.
    pub fn attempts(&self) -> u64 {
        self.shared.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for LoopbackConnector {
    type Connection = LoopbackConnection;

    async fn connect(&self, endpoint: &str) -> Result<Self::Connection, TransportError> {
        self.shared.attempts.fetch_add(1, Ordering::SeqCst);

        let refused = || TransportError::ConnectFailed {
            endpoint: endpoint.to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "loopback endpoint refused the connection",
            ),
        };

        if self.shared.refusing.load(Ordering::SeqCst) {
            return Err(refused());
        }

        let (client, server) = LoopbackConnection::pipe();
        // A dropped acceptor means nobody is listening.
        self.shared.incoming.send(server).map_err(|_| refused())?;

        tracing::debug!(id = %client.id(), endpoint, "loopback connected");
        Ok(client)
    }
}

impl LoopbackAcceptor {
    /// Waits for the next connection. Returns `None` once every connector
    /// clone has been dropped.
    pub async fn accept(&mut self) -> Option<LoopbackConnection> {
        self.incoming.recv().await
    }
}

/// One end of an in-process pipe.
#[derive(Debug)]
pub struct LoopbackConnection {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Frame>,
    rx: Mutex<mpsc::UnboundedReceiver<Frame>>,
    closed: AtomicBool,
}

impl LoopbackConnection {
    fn pipe() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        let a = Self {
            id: ConnectionId::next(),
            tx: b_tx,
            rx: Mutex::new(a_rx),
            closed: AtomicBool::new(false),
        };
        let b = Self {
            id: ConnectionId::next(),
            tx: a_tx,
            rx: Mutex::new(b_rx),
            closed: AtomicBool::new(false),
        };
        (a, b)
    }

    /// Whether this end has been closed locally.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Connection for LoopbackConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed("closed locally".into()));
        }
        self.tx
            .send(Frame::Data(data.to_vec()))
            .map_err(|_| TransportError::ConnectionClosed("peer dropped".into()))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        if self.is_closed() {
            return Ok(None);
        }
        match self.rx.lock().await.recv().await {
            Some(Frame::Data(data)) => Ok(Some(data)),
            Some(Frame::Close) | None => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            // Peer may already be gone; that is still a closed pipe.
            let _ = self.tx.send(Frame::Close);
        }
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for LoopbackConnection {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(Frame::Close);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_loopback_frames_flow_both_ways() {
        let (connector, mut acceptor) = LoopbackConnector::pair();
        let client = connector.connect("loop://test").await.unwrap();
        let server = acceptor.accept().await.unwrap();

        client.send(b"ping").await.unwrap();
        assert_eq!(server.recv().await.unwrap(), Some(b"ping".to_vec()));

        server.send(b"pong").await.unwrap();
        assert_eq!(client.recv().await.unwrap(), Some(b"pong".to_vec()));
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_close_is_seen_by_peer() {
        let (connector, mut acceptor) = LoopbackConnector::pair();
        let client = connector.connect("loop://test").await.unwrap();
        let server = acceptor.accept().await.unwrap();

        server.close().await.unwrap();
        assert_eq!(client.recv().await.unwrap(), None);
        assert!(server.send(b"late").await.is_err());
    }

    #[tokio::test]
    async fn test_close_twice_is_ok() {
        let (connector, _acceptor) = LoopbackConnector::pair();
        let client = connector.connect("loop://test").await.unwrap();
        client.close().await.unwrap();
        client.close().await.unwrap();
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn test_dropping_peer_closes_connection() {
        let (connector, mut acceptor) = LoopbackConnector::pair();
        let client = connector.connect("loop://test").await.unwrap();
        let server = acceptor.accept().await.unwrap();
        drop(server);
        assert_eq!(client.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_refusing_connector_fails_and_counts() {
        let (connector, _acceptor) = LoopbackConnector::pair();
        connector.set_refusing(true);
        let err = connector.connect("loop://down").await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectFailed { .. }));
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_dropped_acceptor_refuses() {
        let (connector, acceptor) = LoopbackConnector::pair();
        drop(acceptor);
        assert!(connector.connect("loop://gone").await.is_err());
    }
}
