//! Error types for the session layer.

/// Errors raised when a session cannot satisfy a command's preconditions.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    /// The command is addressed to "the current machine", but the player
    /// has not entered one (or has exited it).
    #[error("no active machine; call enter_room first")]
    NoActiveMachine,
}
