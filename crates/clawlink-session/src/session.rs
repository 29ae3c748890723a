//! Session types: the client-side record of who is playing where.
//!
//! A [`SessionContext`] tracks:
//! - WHO the player is (`UserId`)
//! - HOW they prove it (a [`SessionSecret`])
//! - WHICH machine they are currently in, if any

use std::fmt;

use clawlink_protocol::{HeartMessage, LoginMessage, MachineId, UserId};

use crate::SessionError;

// ---------------------------------------------------------------------------
// SessionSecret
// ---------------------------------------------------------------------------

/// The short-lived credential used for the login handshake.
///
/// Wrapped so that `{:?}` on anything holding it (including the whole
/// [`SessionContext`]) prints `<redacted>` instead of the secret. Read the
/// value with [`expose`](Self::expose) only where it goes on the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionSecret(String);

impl SessionSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw secret.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionSecret(<redacted>)")
    }
}

impl From<&str> for SessionSecret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SessionSecret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ---------------------------------------------------------------------------
// SessionContext
// ---------------------------------------------------------------------------

/// Identity plus active machine, carried across reconnects.
///
/// Created by `connect()`. Only `enter`/`exit` mutate it afterwards; a
/// reconnect reuses it untouched, which means the active machine is still
/// remembered but the server has NOT been told to re-enter it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    user_id: UserId,
    secret: SessionSecret,
    active_machine: Option<MachineId>,
}

impl SessionContext {
    /// Creates a context. `machine` pre-selects the active machine without
    /// sending anything.
    pub fn new(
        user_id: impl Into<UserId>,
        secret: impl Into<SessionSecret>,
        machine: Option<MachineId>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            secret: secret.into(),
            active_machine: machine,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn secret(&self) -> &SessionSecret {
        &self.secret
    }

    pub fn active_machine(&self) -> Option<&MachineId> {
        self.active_machine.as_ref()
    }

    /// The active machine, or [`SessionError::NoActiveMachine`].
    pub fn require_machine(&self) -> Result<&MachineId, SessionError> {
        self.active_machine.as_ref().ok_or(SessionError::NoActiveMachine)
    }

    /// Makes `machine` the active one and returns the machine it replaced.
    ///
    /// Switching machines does not imply leaving the old one; telling the
    /// server about that is the caller's job.
    pub fn enter(&mut self, machine: MachineId) -> Option<MachineId> {
        let previous = self.active_machine.replace(machine);
        if let Some(prev) = &previous {
            tracing::debug!(
                user_id = %self.user_id,
                from = %prev,
                to = ?self.active_machine,
                "switching machine without exit"
            );
        }
        previous
    }

    /// Clears the active machine, returning it. `None` means there was
    /// nothing to leave.
    pub fn exit(&mut self) -> Option<MachineId> {
        self.active_machine.take()
    }

    /// The client's login frame payload.
    pub fn login_message(&self) -> LoginMessage {
        LoginMessage {
            user_id: self.user_id.0.clone(),
            temp_passwd: self.secret.expose().to_string(),
            is_server_side: false,
            login_result: false,
        }
    }

    /// The heartbeat payload.
    pub fn heart_message(&self) -> HeartMessage {
        HeartMessage {
            user_id: self.user_id.0.clone(),
        }
    }
}
