//! Connection status.

use std::fmt;

/// The lifecycle state of the client's connection.
///
/// ```text
/// Disconnected → Connecting → AwaitingLogin → Ready
///       ↑             │              │           │
///       └─────────────┴──────────────┴───────────┘  (drop, rejection, disconnect)
/// ```
///
/// Only the background driver task changes it; callers observe it through
/// [`ClawClient::status`](crate::ClawClient::status) or a watch
/// subscription. `Closing` is the short window inside `disconnect()` while
/// the socket is being shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    AwaitingLogin,
    Ready,
    Closing,
}

impl ConnectionStatus {
    /// Returns `true` if commands may be sent.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns `true` while a socket is being opened or authenticated.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Connecting | Self::AwaitingLogin)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::AwaitingLogin => write!(f, "AwaitingLogin"),
            Self::Ready => write!(f, "Ready"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}
