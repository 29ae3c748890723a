//! Unified error type for the clawlink client.

use clawlink_protocol::{DecodingError, EncodingError};
use clawlink_session::SessionError;
use clawlink_transport::TransportError;

use crate::ConnectionStatus;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` variants (plus the manual `From<SessionError>`) let `?`
/// lift sub-crate errors automatically.
///
/// | Variant | Recoverable? |
/// |---|---|
/// | `NotReady`, `NoActiveMachine` | yes, local; retry once `Ready` / after `enter_room` |
/// | `Transport`, `Decoding` | reported, the client handles recovery itself |
/// | `Encoding` | caller bug (e.g. empty user id) |
/// | `AuthenticationFailed`, `ConnectionLost` | terminal for this session |
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A transport-level error (connect, send, recv, close).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An outbound envelope failed validation.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// An inbound frame was malformed and dropped.
    #[error(transparent)]
    Decoding(#[from] DecodingError),

    /// A room-scoped command was issued with no active machine.
    #[error("no active machine, call enter_room first")]
    NoActiveMachine,

    /// The server rejected the login, or never answered it in time.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A command was issued while the connection was not `Ready`.
    #[error("client is not ready (status: {0})")]
    NotReady(ConnectionStatus),

    /// The reconnection budget ran out.
    #[error("connection lost after {attempts} reconnect attempts")]
    ConnectionLost { attempts: u32 },

    /// `connect()` was called while a session is already running.
    #[error("client is already connected")]
    AlreadyConnected,

    /// `disconnect()` interrupted a pending `connect()`.
    #[error("connect cancelled by disconnect")]
    Cancelled,
}

impl From<SessionError> for ClientError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NoActiveMachine => Self::NoActiveMachine,
        }
    }
}

impl ClientError {
    /// Returns `true` if the session is over and the caller must start a
    /// new one (typically after re-authenticating).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed(_) | Self::ConnectionLost { .. }
        )
    }
}
