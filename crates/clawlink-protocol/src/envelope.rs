//! The tagged-union envelope and its wire representation.
//!
//! On the wire, a frame is a protobuf [`Package`]: a `packageType` tag plus
//! one optional field per payload variant. Protobuf itself cannot forbid a
//! sender from filling two payloads, or none, or the wrong one, so the wire
//! struct is never handed to application code. Instead it is converted into
//! an [`Envelope`], a Rust `enum` where exactly one payload exists by
//! construction and `match` over it is checked for exhaustiveness.
//!
//! ```text
//! bytes ──prost──→ Package ──TryFrom (validation)──→ Envelope
//! Envelope ──validate + From──→ Package ──prost──→ bytes
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{
    ArmMoveMessage, ArmSide, BallCountMessage, Direction, EnterRoomMessage, ExitRoomMessage,
    GameResultMessage, HeartMessage, LoginMessage, NumberOfPeopleInTheRoomMessage, PackageType,
    RoommateMessage, ScoreMessage, StartGameMessage, WawaMoveMessage, WawaResultMessage,
};
use crate::{DecodingError, EncodingError};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// One complete protocol message: a tag and exactly one matching payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    Login(LoginMessage),
    SendMessageToRoommate(RoommateMessage),
    StartGame(StartGameMessage),
    ArmMove(ArmMoveMessage),
    Heart(HeartMessage),
    GameResult(GameResultMessage),
    BallCount(BallCountMessage),
    Score(ScoreMessage),
    EnterRoom(EnterRoomMessage),
    ExitRoom(ExitRoomMessage),
    NumberOfPeopleInTheRoom(NumberOfPeopleInTheRoomMessage),
    WawaMove(WawaMoveMessage),
    WawaResult(WawaResultMessage),
}

impl Envelope {
    /// The wire tag for this variant.
    pub fn tag(&self) -> PackageType {
        match self {
            Self::Login(_) => PackageType::Login,
            Self::SendMessageToRoommate(_) => PackageType::SendMessageToRoommate,
            Self::StartGame(_) => PackageType::StartGameMessage,
            Self::ArmMove(_) => PackageType::ArmMoveMessage,
            Self::Heart(_) => PackageType::HeartMessage,
            Self::GameResult(_) => PackageType::GameResultMessage,
            Self::BallCount(_) => PackageType::BallCountMessage,
            Self::Score(_) => PackageType::ScoreMessage,
            Self::EnterRoom(_) => PackageType::EnterRoomMessage,
            Self::ExitRoom(_) => PackageType::ExitRoomMessage,
            Self::NumberOfPeopleInTheRoom(_) => PackageType::NumberOfPeopleInTheRoomMessage,
            Self::WawaMove(_) => PackageType::WawaMoveMessage,
            Self::WawaResult(_) => PackageType::WawaResultMessage,
        }
    }

    /// Checks the variant's required-field set before encoding.
    ///
    /// Client-originated variants must carry a user id; room-scoped ones
    /// also need a machine id; opcode fields must be in range. Server-only
    /// telemetry variants have no required fields.
    pub fn validate(&self) -> Result<(), EncodingError> {
        let tag = self.tag();
        let require = |field: &'static str, value: &str| {
            if value.is_empty() {
                Err(EncodingError::MissingField { tag, field })
            } else {
                Ok(())
            }
        };

        match self {
            Self::Login(m) => require("userID", &m.user_id),
            Self::Heart(m) => require("userID", &m.user_id),
            Self::SendMessageToRoommate(m) => {
                require("userID", &m.user_id)?;
                require("macNo", &m.mac_no)
            }
            Self::StartGame(m) => {
                require("userID", &m.user_id)?;
                require("macNo", &m.mac_no)
            }
            Self::EnterRoom(m) => {
                require("userID", &m.user_id)?;
                require("macNo", &m.mac_no)
            }
            Self::ExitRoom(m) => {
                require("userID", &m.user_id)?;
                require("macNo", &m.mac_no)
            }
            Self::WawaMove(m) => {
                require("userID", &m.user_id)?;
                require("macNo", &m.mac_no)?;
                if Direction::try_from(m.data).is_err() {
                    return Err(EncodingError::InvalidField { tag, field: "data", value: m.data });
                }
                Ok(())
            }
            Self::ArmMove(m) => {
                require("userID", &m.user_id)?;
                require("macNo", &m.mac_no)?;
                if ArmSide::try_from(m.data).is_err() {
                    return Err(EncodingError::InvalidField { tag, field: "data", value: m.data });
                }
                Ok(())
            }
            Self::GameResult(_)
            | Self::BallCount(_)
            | Self::Score(_)
            | Self::NumberOfPeopleInTheRoom(_)
            | Self::WawaResult(_) => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Package: the raw wire struct
// ---------------------------------------------------------------------------

/// The protobuf root message exactly as it travels on the wire.
///
/// Exposed so servers and tests can build frames the [`Envelope`] type
/// would never allow (two payloads, a wrong payload, an unknown tag).
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Package {
    #[prost(enumeration = "PackageType", tag = "1")]
    pub package_type: i32,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_message: Option<LoginMessage>,
    #[prost(message, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_message_to_roommate_message: Option<RoommateMessage>,
    #[prost(message, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_game_message: Option<StartGameMessage>,
    #[prost(message, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arm_move_message: Option<ArmMoveMessage>,
    #[prost(message, optional, tag = "6")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_message: Option<HeartMessage>,
    #[prost(message, optional, tag = "7")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_result_message: Option<GameResultMessage>,
    #[prost(message, optional, tag = "8")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ball_count_message: Option<BallCountMessage>,
    #[prost(message, optional, tag = "9")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_message: Option<ScoreMessage>,
    #[prost(message, optional, tag = "10")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enter_room_message: Option<EnterRoomMessage>,
    #[prost(message, optional, tag = "11")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_room_message: Option<ExitRoomMessage>,
    #[prost(message, optional, tag = "12")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_people_in_the_room_message: Option<NumberOfPeopleInTheRoomMessage>,
    #[prost(message, optional, tag = "13")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wawa_move_message: Option<WawaMoveMessage>,
    #[prost(message, optional, tag = "14")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wawa_result_message: Option<WawaResultMessage>,
}

impl Package {
    /// Tags of every payload field that is present, in wire order.
    pub fn populated(&self) -> Vec<PackageType> {
        let slots = [
            (self.login_message.is_some(), PackageType::Login),
            (self.send_message_to_roommate_message.is_some(), PackageType::SendMessageToRoommate),
            (self.start_game_message.is_some(), PackageType::StartGameMessage),
            (self.arm_move_message.is_some(), PackageType::ArmMoveMessage),
            (self.heart_message.is_some(), PackageType::HeartMessage),
            (self.game_result_message.is_some(), PackageType::GameResultMessage),
            (self.ball_count_message.is_some(), PackageType::BallCountMessage),
            (self.score_message.is_some(), PackageType::ScoreMessage),
            (self.enter_room_message.is_some(), PackageType::EnterRoomMessage),
            (self.exit_room_message.is_some(), PackageType::ExitRoomMessage),
            (
                self.number_of_people_in_the_room_message.is_some(),
                PackageType::NumberOfPeopleInTheRoomMessage,
            ),
            (self.wawa_move_message.is_some(), PackageType::WawaMoveMessage),
            (self.wawa_result_message.is_some(), PackageType::WawaResultMessage),
        ];
        slots
            .into_iter()
            .filter_map(|(present, tag)| present.then_some(tag))
            .collect()
    }
}

impl From<Envelope> for Package {
    fn from(envelope: Envelope) -> Self {
        let mut package = Package {
            package_type: envelope.tag() as i32,
            ..Default::default()
        };
        match envelope {
            Envelope::Login(m) => package.login_message = Some(m),
            Envelope::SendMessageToRoommate(m) => {
                package.send_message_to_roommate_message = Some(m)
            }
            Envelope::StartGame(m) => package.start_game_message = Some(m),
            Envelope::ArmMove(m) => package.arm_move_message = Some(m),
            Envelope::Heart(m) => package.heart_message = Some(m),
            Envelope::GameResult(m) => package.game_result_message = Some(m),
            Envelope::BallCount(m) => package.ball_count_message = Some(m),
            Envelope::Score(m) => package.score_message = Some(m),
            Envelope::EnterRoom(m) => package.enter_room_message = Some(m),
            Envelope::ExitRoom(m) => package.exit_room_message = Some(m),
            Envelope::NumberOfPeopleInTheRoom(m) => {
                package.number_of_people_in_the_room_message = Some(m)
            }
            Envelope::WawaMove(m) => package.wawa_move_message = Some(m),
            Envelope::WawaResult(m) => package.wawa_result_message = Some(m),
        }
        package
    }
}

impl TryFrom<Package> for Envelope {
    type Error = DecodingError;

    fn try_from(package: Package) -> Result<Self, Self::Error> {
        let tag = PackageType::try_from(package.package_type)
            .map_err(|_| DecodingError::UnknownTag(package.package_type))?;

        let populated = package.populated();
        match populated.as_slice() {
            [] => return Err(DecodingError::MissingPayload(tag)),
            [found] if *found != tag => {
                return Err(DecodingError::PayloadMismatch { tag, found: *found });
            }
            [_] => {}
            many => return Err(DecodingError::MultiplePayloads { tag, count: many.len() }),
        }

        // Exactly one payload is present and it matches `tag`, so the
        // `ok_or` fallbacks below are unreachable in practice.
        let missing = || DecodingError::MissingPayload(tag);
        let envelope = match tag {
            PackageType::Login => Self::Login(package.login_message.ok_or_else(missing)?),
            PackageType::SendMessageToRoommate => Self::SendMessageToRoommate(
                package.send_message_to_roommate_message.ok_or_else(missing)?,
            ),
            PackageType::StartGameMessage => {
                Self::StartGame(package.start_game_message.ok_or_else(missing)?)
            }
            PackageType::ArmMoveMessage => {
                Self::ArmMove(package.arm_move_message.ok_or_else(missing)?)
            }
            PackageType::HeartMessage => Self::Heart(package.heart_message.ok_or_else(missing)?),
            PackageType::GameResultMessage => {
                Self::GameResult(package.game_result_message.ok_or_else(missing)?)
            }
            PackageType::BallCountMessage => {
                Self::BallCount(package.ball_count_message.ok_or_else(missing)?)
            }
            PackageType::ScoreMessage => Self::Score(package.score_message.ok_or_else(missing)?),
            PackageType::EnterRoomMessage => {
                Self::EnterRoom(package.enter_room_message.ok_or_else(missing)?)
            }
            PackageType::ExitRoomMessage => {
                Self::ExitRoom(package.exit_room_message.ok_or_else(missing)?)
            }
            PackageType::NumberOfPeopleInTheRoomMessage => Self::NumberOfPeopleInTheRoom(
                package.number_of_people_in_the_room_message.ok_or_else(missing)?,
            ),
            PackageType::WawaMoveMessage => {
                Self::WawaMove(package.wawa_move_message.ok_or_else(missing)?)
            }
            PackageType::WawaResultMessage => {
                Self::WawaResult(package.wawa_result_message.ok_or_else(missing)?)
            }
        };
        Ok(envelope)
    }
}
