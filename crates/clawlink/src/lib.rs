//! # Clawlink
//!
//! Real-time control client for remote claw machines.
//!
//! A player's app uses [`ClawClient`] to log in to a machine server, enter
//! a machine's room, start a round, steer the claw, and receive results.
//! The client keeps the connection alive with heartbeats and reconnects on
//! its own (a bounded number of times) when the socket drops.
//!
//! ## Layers
//!
//! ```text
//! clawlink-transport  bytes over a socket (WebSocket, in-memory loopback)
//! clawlink-protocol   Envelope ⇄ bytes (protobuf, JSON)
//! clawlink-session    who is playing, and on which machine
//! clawlink            connection lifecycle, commands, event handlers
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clawlink::prelude::*;
//!
//! # async fn run() -> Result<(), ClientError> {
//! let client = ClawClient::new(ClientConfig::new("wss://arcade.example/ws"));
//! client.on_game_result(|result| match result {
//!     GameResult::Catch(outcome) if outcome.is_success() => println!("caught one!"),
//!     other => println!("{other:?}"),
//! });
//!
//! client.connect("u1", "s1", None).await?;
//! client.enter_room("M42").await?;
//! client.start_game().await?;
//! client.send_move(Direction::Left).await?;
//! client.send_move(Direction::Grab).await?;
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod dispatch;
mod driver;
mod error;
mod events;
mod handlers;
mod heartbeat;
mod reconnect;
mod status;

pub use client::ClawClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use events::{CatchOutcome, CloseEvent, CloseReason, EnterRoomResult, GameResult, Settlement};
pub use status::ConnectionStatus;

/// Convenient re-exports for client code.
///
/// ```rust
/// use clawlink::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CatchOutcome, ClawClient, ClientConfig, ClientError, CloseEvent, CloseReason,
        ConnectionStatus, EnterRoomResult, GameResult, Settlement,
    };
    pub use clawlink_protocol::{ArmSide, Codec, Direction, Envelope, MachineId, UserId};
    pub use clawlink_session::SessionSecret;
}

// Re-export sub-crates for advanced usage.
pub use clawlink_protocol as protocol;
pub use clawlink_session as session;
pub use clawlink_transport as transport;
