//! Typed events delivered to registered handlers.

use clawlink_protocol::{EnterRoomMessage, GameResultMessage, MachineId, WawaResultMessage};

/// Why a connection closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// `disconnect()` was called.
    Requested,
    /// The server closed the socket or it failed.
    Dropped,
    /// The server refused the login (or never answered it).
    LoginRejected,
}

/// Passed to `on_close` whenever an opened socket goes away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    pub reason: CloseReason,
    /// Human-readable cause, if one is known.
    pub detail: Option<String>,
    /// `true` if the client is about to try reconnecting.
    pub will_reconnect: bool,
}

/// The end of a round, as reported by the machine.
///
/// Two different frames end up here: the settlement summary and the catch
/// outcome of a single grab. They arrive independently and in either order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameResult {
    Settlement(Settlement),
    Catch(CatchOutcome),
}

/// Totals after a round finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub finished: bool,
    pub total_gold: i64,
    pub total_score: i64,
}

impl From<&GameResultMessage> for Settlement {
    fn from(msg: &GameResultMessage) -> Self {
        Self {
            finished: msg.finish,
            total_gold: msg.total_gold,
            total_score: msg.total_score,
        }
    }
}

/// What a grab picked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatchOutcome {
    /// The raw result code. 0 means nothing was caught.
    pub code: i32,
    /// Zero-based prize colour bucket, present only on success.
    pub prize_bucket: Option<u32>,
}

impl CatchOutcome {
    pub fn is_success(&self) -> bool {
        self.prize_bucket.is_some()
    }
}

impl From<&WawaResultMessage> for CatchOutcome {
    fn from(msg: &WawaResultMessage) -> Self {
        Self {
            code: msg.data,
            prize_bucket: msg.prize_bucket(),
        }
    }
}

/// The server's answer to an `enter_room` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnterRoomResult {
    pub machine: MachineId,
    pub accepted: bool,
    /// Video peer id assigned by the server, empty if none.
    pub webrtc_client_id: String,
    /// Where the machine's camera stream can be watched, empty if none.
    pub stream_url: String,
}

impl From<&EnterRoomMessage> for EnterRoomResult {
    fn from(msg: &EnterRoomMessage) -> Self {
        Self {
            machine: MachineId::from(msg.mac_no.as_str()),
            accepted: msg.enter_result,
            webrtc_client_id: msg.webrtc_client_id.clone(),
            stream_url: msg.stream_url.clone(),
        }
    }
}
