//! Wire protocol for the claw-machine control socket.
//!
//! This crate defines the "language" the client and the machine server
//! speak:
//!
//! - **Types** ([`PackageType`], [`Direction`], the payload messages):
//!   the protobuf schema, compiled in through `prost` derives.
//! - **Envelope** ([`Envelope`], [`Package`]): the tagged union and its
//!   raw wire form, with the rules that keep exactly one payload per frame.
//! - **Codec** ([`Codec`] trait, [`ProtobufCodec`], [`JsonCodec`]): how
//!   envelopes become bytes.
//! - **Errors** ([`EncodingError`], [`DecodingError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the client
//! (connection state, handlers). It knows nothing about sockets or
//! sessions.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Client (dispatch)
//! ```

mod codec;
mod envelope;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use codec::ProtobufCodec;
pub use envelope::{Envelope, Package};
pub use error::{DecodingError, EncodingError};
pub use types::{
    ArmMoveMessage, ArmSide, BallCountMessage, Direction, EnterRoomMessage, ExitRoomMessage,
    GameResultMessage, HeartMessage, LoginMessage, MachineId, NumberOfPeopleInTheRoomMessage,
    PackageType, RoommateMessage, ScoreMessage, StartGameMessage, UserId, WawaMoveMessage,
    WawaResultMessage,
};
