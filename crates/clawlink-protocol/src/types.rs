//! Core protocol types for the claw-machine wire format.
//!
//! Every struct in this module travels "on the wire": it is a protobuf
//! message whose schema is compiled into the binary through `prost`
//! derive macros, so there is no `.proto` file to fetch or parse at
//! runtime. The field numbers below ARE the schema; changing one breaks
//! compatibility with the machine server.
//!
//! The same structs also derive serde traits so the optional JSON codec
//! can print them with the protocol's original field names (`userID`,
//! `macNo`, ...), which is handy when eyeballing traffic in logs.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The account identifier of the player driving the machine.
///
/// A "newtype wrapper" around `String`: it keeps user ids and machine ids
/// from being swapped by accident in function signatures, while
/// `#[serde(transparent)]` keeps the wire/JSON form a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of a physical claw machine (the protocol calls it `macNo`).
/// One machine is one game room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(pub String);

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MachineId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MachineId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// The tag of the wire envelope: which payload variant follows.
///
/// The numeric values are part of the external contract and must never
/// be renumbered. `prost::Enumeration` generates `TryFrom<i32>` so an
/// unknown number on the wire is a recoverable error, not a panic.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    prost::Enumeration,
    Serialize,
    Deserialize,
)]
#[repr(i32)]
pub enum PackageType {
    #[serde(rename = "LOGIN")]
    Login = 0,
    #[serde(rename = "SENDMESSAGETOROOMMATE")]
    SendMessageToRoommate = 1,
    #[serde(rename = "STARTGAMEMESSAGE")]
    StartGameMessage = 2,
    #[serde(rename = "ARMMOVEMESSAGE")]
    ArmMoveMessage = 3,
    #[serde(rename = "HEARTMESSAGE")]
    HeartMessage = 4,
    #[serde(rename = "GAMERESULTMESSAGE")]
    GameResultMessage = 5,
    #[serde(rename = "BALLCOUNTMESSAGE")]
    BallCountMessage = 6,
    #[serde(rename = "SCOREMESSAGE")]
    ScoreMessage = 7,
    #[serde(rename = "ENTERROOMMESSAGE")]
    EnterRoomMessage = 8,
    #[serde(rename = "EXITROOMMESSAGE")]
    ExitRoomMessage = 9,
    #[serde(rename = "NUMBEROFPEOPLEINTHEROOMMESSAGE")]
    NumberOfPeopleInTheRoomMessage = 10,
    #[serde(rename = "WAWAMOVEMESSAGE")]
    WawaMoveMessage = 11,
    #[serde(rename = "WAWARESULTMESSAGE")]
    WawaResultMessage = 12,
}

impl PackageType {
    /// Every tag, in wire order.
    pub const ALL: [PackageType; 13] = [
        Self::Login,
        Self::SendMessageToRoommate,
        Self::StartGameMessage,
        Self::ArmMoveMessage,
        Self::HeartMessage,
        Self::GameResultMessage,
        Self::BallCountMessage,
        Self::ScoreMessage,
        Self::EnterRoomMessage,
        Self::ExitRoomMessage,
        Self::NumberOfPeopleInTheRoomMessage,
        Self::WawaMoveMessage,
        Self::WawaResultMessage,
    ];

    /// The tag's name as it appears in the protocol documentation.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::SendMessageToRoommate => "SENDMESSAGETOROOMMATE",
            Self::StartGameMessage => "STARTGAMEMESSAGE",
            Self::ArmMoveMessage => "ARMMOVEMESSAGE",
            Self::HeartMessage => "HEARTMESSAGE",
            Self::GameResultMessage => "GAMERESULTMESSAGE",
            Self::BallCountMessage => "BALLCOUNTMESSAGE",
            Self::ScoreMessage => "SCOREMESSAGE",
            Self::EnterRoomMessage => "ENTERROOMMESSAGE",
            Self::ExitRoomMessage => "EXITROOMMESSAGE",
            Self::NumberOfPeopleInTheRoomMessage => "NUMBEROFPEOPLEINTHEROOMMESSAGE",
            Self::WawaMoveMessage => "WAWAMOVEMESSAGE",
            Self::WawaResultMessage => "WAWARESULTMESSAGE",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Claw movement opcode carried in `WawaMoveMessage.data`.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    prost::Enumeration,
    Serialize,
    Deserialize,
)]
#[repr(i32)]
pub enum Direction {
    #[serde(rename = "UP")]
    Up = 0,
    #[serde(rename = "DOWN")]
    Down = 1,
    #[serde(rename = "LEFT")]
    Left = 2,
    #[serde(rename = "RIGHT")]
    Right = 3,
    /// Drop the claw. Ends the player's control for this round.
    #[serde(rename = "GRAB")]
    Grab = 4,
}

/// Which arm an `ArmMoveMessage` drives (auxiliary control channel).
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    prost::Enumeration,
    Serialize,
    Deserialize,
)]
#[repr(i32)]
pub enum ArmSide {
    Left = 0,
    Right = 1,
}

// ---------------------------------------------------------------------------
// Payload messages
// ---------------------------------------------------------------------------
//
// `prost::Message` generates the protobuf encode/decode logic AND the
// `Debug` + `Default` impls, which is why those two are not in the derive
// lists. `#[serde(default)]` mirrors protobuf semantics for JSON: a missing
// field is its zero value.

/// Login handshake. Sent by the client on socket open; the server answers
/// with the same message and `login_result` set.
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[prost(skip_debug)]
#[serde(default)]
pub struct LoginMessage {
    #[prost(string, tag = "1")]
    #[serde(rename = "userID")]
    pub user_id: String,
    /// Short-lived session secret issued by the account system.
    #[prost(string, tag = "2")]
    #[serde(rename = "tempPasswd")]
    pub temp_passwd: String,
    #[prost(bool, tag = "3")]
    #[serde(rename = "isServerSide")]
    pub is_server_side: bool,
    /// Server verdict; meaningless on the client's own frame.
    #[prost(bool, tag = "4")]
    #[serde(rename = "loginResult")]
    pub login_result: bool,
}

// Hand-written so the secret never lands in a log line.
impl fmt::Debug for LoginMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginMessage")
            .field("user_id", &self.user_id)
            .field("temp_passwd", &"<redacted>")
            .field("is_server_side", &self.is_server_side)
            .field("login_result", &self.login_result)
            .finish()
    }
}

/// Free-form text relayed to the other players watching the same machine.
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct RoommateMessage {
    #[prost(string, tag = "1")]
    #[serde(rename = "userID")]
    pub user_id: String,
    #[prost(string, tag = "2")]
    #[serde(rename = "macNo")]
    pub mac_no: String,
    #[prost(string, tag = "3")]
    pub content: String,
}

/// Request to start a paid round on the machine the player is watching.
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct StartGameMessage {
    #[prost(string, tag = "1")]
    #[serde(rename = "userID")]
    pub user_id: String,
    #[prost(string, tag = "2")]
    #[serde(rename = "macNo")]
    pub mac_no: String,
    #[prost(bool, tag = "3")]
    #[serde(rename = "isServerSide")]
    pub is_server_side: bool,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmMoveMessage {
    #[prost(string, tag = "1")]
    #[serde(rename = "userID")]
    pub user_id: String,
    #[prost(string, tag = "2")]
    #[serde(rename = "macNo")]
    pub mac_no: String,
    /// An [`ArmSide`] value.
    #[prost(enumeration = "ArmSide", tag = "3")]
    pub data: i32,
}

/// Liveness ping. The server does not answer it.
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartMessage {
    #[prost(string, tag = "1")]
    #[serde(rename = "userID")]
    pub user_id: String,
}

/// End-of-game settlement.
///
/// Gold and score are 64-bit on the wire and stay `i64` here; they are
/// never routed through a float.
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct GameResultMessage {
    #[prost(bool, tag = "1")]
    pub finish: bool,
    #[prost(int64, tag = "2")]
    #[serde(rename = "totalGold")]
    pub total_gold: i64,
    #[prost(int64, tag = "3")]
    #[serde(rename = "totalScore")]
    pub total_score: i64,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct BallCountMessage {
    #[prost(int32, tag = "1")]
    pub count: i32,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreMessage {
    #[prost(int64, tag = "1")]
    pub score: i64,
}

/// Join a machine's room. The server echoes it back with `enter_result`
/// and, on success, the video stream location for the WebRTC player.
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct EnterRoomMessage {
    #[prost(string, tag = "1")]
    #[serde(rename = "userID")]
    pub user_id: String,
    #[prost(string, tag = "2")]
    #[serde(rename = "macNo")]
    pub mac_no: String,
    #[prost(string, tag = "3")]
    #[serde(rename = "webrtcClientID")]
    pub webrtc_client_id: String,
    #[prost(bool, tag = "4")]
    #[serde(rename = "isServerSide")]
    pub is_server_side: bool,
    #[prost(bool, tag = "5")]
    #[serde(rename = "enterResult")]
    pub enter_result: bool,
    /// Opaque to this crate; handed to the video collaborator as-is.
    #[prost(string, tag = "6")]
    #[serde(rename = "streamUrl")]
    pub stream_url: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitRoomMessage {
    #[prost(string, tag = "1")]
    #[serde(rename = "userID")]
    pub user_id: String,
    #[prost(string, tag = "2")]
    #[serde(rename = "macNo")]
    pub mac_no: String,
    #[prost(string, tag = "3")]
    #[serde(rename = "webrtcClientID")]
    pub webrtc_client_id: String,
    #[prost(bool, tag = "4")]
    #[serde(rename = "isServerSide")]
    pub is_server_side: bool,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberOfPeopleInTheRoomMessage {
    #[prost(int32, tag = "1")]
    pub count: i32,
}

/// One claw movement (or the final grab).
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct WawaMoveMessage {
    #[prost(string, tag = "1")]
    #[serde(rename = "userID")]
    pub user_id: String,
    #[prost(string, tag = "2")]
    #[serde(rename = "macNo")]
    pub mac_no: String,
    /// A [`Direction`] opcode.
    #[prost(enumeration = "Direction", tag = "3")]
    pub data: i32,
}

/// Outcome of a grab.
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct WawaResultMessage {
    /// 0 = nothing caught; `n >= 1` = caught a ball from prize bucket `n - 1`.
    #[prost(int32, tag = "1")]
    pub data: i32,
}

impl WawaMoveMessage {
    pub fn new(user_id: &UserId, mac_no: &MachineId, direction: Direction) -> Self {
        Self {
            user_id: user_id.0.clone(),
            mac_no: mac_no.0.clone(),
            data: direction as i32,
        }
    }

    /// The opcode as a [`Direction`], or `None` if it is out of range.
    pub fn direction(&self) -> Option<Direction> {
        Direction::try_from(self.data).ok()
    }
}

impl ArmMoveMessage {
    pub fn new(user_id: &UserId, mac_no: &MachineId, side: ArmSide) -> Self {
        Self {
            user_id: user_id.0.clone(),
            mac_no: mac_no.0.clone(),
            data: side as i32,
        }
    }

    pub fn side(&self) -> Option<ArmSide> {
        ArmSide::try_from(self.data).ok()
    }
}

impl WawaResultMessage {
    /// `true` when the grab caught something.
    pub fn is_success(&self) -> bool {
        self.data >= 1
    }

    /// Zero-based prize colour bucket, present only on success.
    pub fn prize_bucket(&self) -> Option<u32> {
        if self.is_success() {
            u32::try_from(self.data - 1).ok()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_type_values_match_wire_contract() {
        for (expected, tag) in PackageType::ALL.iter().enumerate() {
            assert_eq!(*tag as i32, expected as i32, "{tag} out of order");
        }
        assert_eq!(PackageType::try_from(12).unwrap(), PackageType::WawaResultMessage);
        assert!(PackageType::try_from(13).is_err());
    }

    #[test]
    fn test_direction_opcodes() {
        assert_eq!(Direction::Up as i32, 0);
        assert_eq!(Direction::Down as i32, 1);
        assert_eq!(Direction::Left as i32, 2);
        assert_eq!(Direction::Right as i32, 3);
        assert_eq!(Direction::Grab as i32, 4);
    }

    #[test]
    fn test_package_type_display_uses_wire_name() {
        assert_eq!(PackageType::Login.to_string(), "LOGIN");
        assert_eq!(
            PackageType::NumberOfPeopleInTheRoomMessage.to_string(),
            "NUMBEROFPEOPLEINTHEROOMMESSAGE"
        );
    }

    #[test]
    fn test_wawa_result_prize_bucket() {
        let miss = WawaResultMessage { data: 0 };
        assert!(!miss.is_success());
        assert_eq!(miss.prize_bucket(), None);

        let hit = WawaResultMessage { data: 3 };
        assert!(hit.is_success());
        assert_eq!(hit.prize_bucket(), Some(2));

        let garbage = WawaResultMessage { data: -4 };
        assert!(!garbage.is_success());
        assert_eq!(garbage.prize_bucket(), None);
    }

    #[test]
    fn test_move_constructors_store_opcodes() {
        let user = UserId::from("u1");
        let mac = MachineId::from("M42");
        let grab = WawaMoveMessage::new(&user, &mac, Direction::Grab);
        assert_eq!(grab.data, 4);
        assert_eq!(grab.direction(), Some(Direction::Grab));

        let arm = ArmMoveMessage::new(&user, &mac, ArmSide::Right);
        assert_eq!(arm.data, 1);
        assert_eq!(arm.side(), Some(ArmSide::Right));
    }

    #[test]
    fn test_login_debug_redacts_secret() {
        let login = LoginMessage {
            user_id: "u1".into(),
            temp_passwd: "hunter2".into(),
            ..Default::default()
        };
        let printed = format!("{login:?}");
        assert!(printed.contains("u1"));
        assert!(!printed.contains("hunter2"));
    }
}
