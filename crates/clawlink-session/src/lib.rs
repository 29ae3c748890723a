//! Room session context for clawlink.
//!
//! A session is the client's memory of WHO is playing and WHERE:
//!
//! 1. **Identity**: the user id and the short-lived session secret handed
//!    over by the account system.
//! 2. **Active machine**: the claw machine the player last entered, which
//!    every room-scoped command is addressed to.
//!
//! It is not on the wire. It outlives individual sockets: when the
//! connection drops and the client reconnects, the same context is used to
//! log in again.
//!
//! # How it fits in the stack
//!
//! ```text
//! Client (above)  ← owns one SessionContext per connect() call
//!     ↕
//! Session (this crate)  ← identity + active machine, builds login/heartbeat payloads
//!     ↕
//! Protocol (below)  ← provides UserId, MachineId, payload types
//! ```

mod error;
mod session;

pub use error::SessionError;
pub use session::{SessionContext, SessionSecret};
