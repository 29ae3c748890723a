//! Command → envelope mapping and inbound event routing.
//!
//! Both directions are plain functions over the session context and the
//! handler slots. The driver owns the socket and calls into here; nothing
//! in this module does I/O.

use clawlink_protocol::{
    ArmMoveMessage, ArmSide, Direction, EnterRoomMessage, Envelope, ExitRoomMessage, MachineId,
    RoommateMessage, StartGameMessage, WawaMoveMessage,
};
use clawlink_session::{SessionContext, SessionError};

use crate::events::{CatchOutcome, EnterRoomResult, GameResult, Settlement};
use crate::handlers::HandlerSlots;

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A user command, as queued to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Request {
    EnterRoom(MachineId),
    ExitRoom,
    StartGame,
    Move(Direction),
    ArmMove(ArmSide),
    Roommate(String),
}

impl Request {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::EnterRoom(_) => "enter_room",
            Self::ExitRoom => "exit_room",
            Self::StartGame => "start_game",
            Self::Move(_) => "send_move",
            Self::ArmMove(_) => "send_arm_move",
            Self::Roommate(_) => "send_to_roommate",
        }
    }
}

/// How the session changes once a request's frame is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionUpdate {
    Keep,
    /// Applied before sending.
    Enter(MachineId),
    /// Applied after a successful send.
    Exit,
}

/// What to send for a request, and what it does to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Plan {
    pub(crate) envelope: Envelope,
    pub(crate) update: SessionUpdate,
}

/// Builds the envelope for `request` from the current session.
///
/// `Ok(None)` means there is nothing to send (`exit_room` with no active
/// machine). Room-scoped requests fail with `NoActiveMachine` when no
/// machine has been entered.
pub(crate) fn plan(
    request: &Request,
    session: &SessionContext,
) -> Result<Option<Plan>, SessionError> {
    let user_id = session.user_id();
    let plan = match request {
        Request::EnterRoom(machine) => Plan {
            envelope: Envelope::EnterRoom(EnterRoomMessage {
                user_id: user_id.0.clone(),
                mac_no: machine.0.clone(),
                ..Default::default()
            }),
            update: SessionUpdate::Enter(machine.clone()),
        },
        Request::ExitRoom => {
            let Some(machine) = session.active_machine() else {
                return Ok(None);
            };
            Plan {
                envelope: Envelope::ExitRoom(ExitRoomMessage {
                    user_id: user_id.0.clone(),
                    mac_no: machine.0.clone(),
                    ..Default::default()
                }),
                update: SessionUpdate::Exit,
            }
        }
        Request::StartGame => {
            let machine = session.require_machine()?;
            Plan {
                envelope: Envelope::StartGame(StartGameMessage {
                    user_id: user_id.0.clone(),
                    mac_no: machine.0.clone(),
                    is_server_side: false,
                }),
                update: SessionUpdate::Keep,
            }
        }
        Request::Move(direction) => {
            let machine = session.require_machine()?;
            Plan {
                envelope: Envelope::WawaMove(WawaMoveMessage::new(user_id, machine, *direction)),
                update: SessionUpdate::Keep,
            }
        }
        Request::ArmMove(side) => {
            let machine = session.require_machine()?;
            Plan {
                envelope: Envelope::ArmMove(ArmMoveMessage::new(user_id, machine, *side)),
                update: SessionUpdate::Keep,
            }
        }
        Request::Roommate(content) => {
            let machine = session.require_machine()?;
            Plan {
                envelope: Envelope::SendMessageToRoommate(RoommateMessage {
                    user_id: user_id.0.clone(),
                    mac_no: machine.0.clone(),
                    content: content.clone(),
                }),
                update: SessionUpdate::Keep,
            }
        }
    };
    Ok(Some(plan))
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Routes a decoded inbound envelope to the handlers.
///
/// Every envelope goes to the generic `on_message` slot first. The
/// variants with a typed handler are then delivered there too; the rest
/// (echoes of client commands, heartbeats, telemetry the client has no
/// typed handler for) stop at the generic slot.
pub(crate) fn route(envelope: &Envelope, handlers: &HandlerSlots) {
    handlers.message.fire(envelope);

    match envelope {
        Envelope::NumberOfPeopleInTheRoom(msg) => {
            let count = u32::try_from(msg.count).unwrap_or_else(|_| {
                tracing::debug!(count = msg.count, "negative player count, reporting 0");
                0
            });
            handlers.player_count.fire(&count);
        }
        Envelope::GameResult(msg) => {
            handlers
                .game_result
                .fire(&GameResult::Settlement(Settlement::from(msg)));
        }
        Envelope::WawaResult(msg) => {
            handlers
                .game_result
                .fire(&GameResult::Catch(CatchOutcome::from(msg)));
        }
        Envelope::EnterRoom(msg) => {
            handlers.enter_room_result.fire(&EnterRoomResult::from(msg));
        }
        Envelope::Login(_)
        | Envelope::SendMessageToRoommate(_)
        | Envelope::StartGame(_)
        | Envelope::ArmMove(_)
        | Envelope::Heart(_)
        | Envelope::BallCount(_)
        | Envelope::Score(_)
        | Envelope::ExitRoom(_)
        | Envelope::WawaMove(_) => {
            tracing::trace!(tag = %envelope.tag(), "no typed handler for frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use clawlink_protocol::{
        GameResultMessage, HeartMessage, NumberOfPeopleInTheRoomMessage, PackageType,
        WawaResultMessage,
    };

    fn session_in(machine: Option<&str>) -> SessionContext {
        SessionContext::new("u1", "s1", machine.map(MachineId::from))
    }

    // =========================================================================
    // Outbound planning
    // =========================================================================

    #[test]
    fn test_enter_room_plans_enter_update() {
        let plan = plan(&Request::EnterRoom("M42".into()), &session_in(None))
            .unwrap()
            .unwrap();
        let Envelope::EnterRoom(msg) = &plan.envelope else {
            panic!("expected EnterRoom, got {:?}", plan.envelope);
        };
        assert_eq!(msg.user_id, "u1");
        assert_eq!(msg.mac_no, "M42");
        assert_eq!(plan.update, SessionUpdate::Enter("M42".into()));
    }

    #[test]
    fn test_exit_room_without_machine_sends_nothing() {
        assert_eq!(plan(&Request::ExitRoom, &session_in(None)), Ok(None));
    }

    #[test]
    fn test_exit_room_targets_active_machine() {
        let plan = plan(&Request::ExitRoom, &session_in(Some("M7")))
            .unwrap()
            .unwrap();
        assert_eq!(plan.envelope.tag(), PackageType::ExitRoomMessage);
        let Envelope::ExitRoom(msg) = &plan.envelope else {
            unreachable!()
        };
        assert_eq!(msg.mac_no, "M7");
        assert_eq!(plan.update, SessionUpdate::Exit);
    }

    #[test]
    fn test_room_scoped_requests_need_machine() {
        let session = session_in(None);
        for request in [
            Request::StartGame,
            Request::Move(Direction::Grab),
            Request::ArmMove(ArmSide::Left),
            Request::Roommate("hi".into()),
        ] {
            assert_eq!(
                plan(&request, &session),
                Err(SessionError::NoActiveMachine),
                "{} should need a machine",
                request.name()
            );
        }
    }

    #[test]
    fn test_move_carries_opcode() {
        let plan = plan(&Request::Move(Direction::Grab), &session_in(Some("M42")))
            .unwrap()
            .unwrap();
        let Envelope::WawaMove(msg) = &plan.envelope else {
            panic!("expected WawaMove");
        };
        assert_eq!(msg.data, 4);
        assert_eq!(msg.mac_no, "M42");
        assert_eq!(plan.update, SessionUpdate::Keep);
    }

    #[test]
    fn test_arm_move_carries_side() {
        let plan = plan(&Request::ArmMove(ArmSide::Right), &session_in(Some("M1")))
            .unwrap()
            .unwrap();
        let Envelope::ArmMove(msg) = &plan.envelope else {
            panic!("expected ArmMove");
        };
        assert_eq!(msg.side(), Some(ArmSide::Right));
    }

    #[test]
    fn test_roommate_message_carries_content() {
        let plan = plan(&Request::Roommate("nice grab".into()), &session_in(Some("M1")))
            .unwrap()
            .unwrap();
        let Envelope::SendMessageToRoommate(msg) = &plan.envelope else {
            panic!("expected SendMessageToRoommate");
        };
        assert_eq!(msg.content, "nice grab");
        assert_eq!(msg.mac_no, "M1");
    }

    // =========================================================================
    // Inbound routing
    // =========================================================================

    #[derive(Default)]
    struct Seen {
        messages: Vec<PackageType>,
        counts: Vec<u32>,
        results: Vec<GameResult>,
        entered: Vec<EnterRoomResult>,
    }

    fn recording_handlers() -> (HandlerSlots, Arc<Mutex<Seen>>) {
        let slots = HandlerSlots::default();
        let seen = Arc::new(Mutex::new(Seen::default()));

        let s = Arc::clone(&seen);
        slots
            .message
            .set(Arc::new(move |e: &Envelope| s.lock().unwrap().messages.push(e.tag())));
        let s = Arc::clone(&seen);
        slots
            .player_count
            .set(Arc::new(move |c: &u32| s.lock().unwrap().counts.push(*c)));
        let s = Arc::clone(&seen);
        slots
            .game_result
            .set(Arc::new(move |r: &GameResult| s.lock().unwrap().results.push(r.clone())));
        let s = Arc::clone(&seen);
        slots.enter_room_result.set(Arc::new(move |r: &EnterRoomResult| {
            s.lock().unwrap().entered.push(r.clone())
        }));

        (slots, seen)
    }

    #[test]
    fn test_player_count_routed() {
        let (slots, seen) = recording_handlers();
        route(
            &Envelope::NumberOfPeopleInTheRoom(NumberOfPeopleInTheRoomMessage { count: 7 }),
            &slots,
        );
        let seen = seen.lock().unwrap();
        assert_eq!(seen.counts, vec![7]);
        assert_eq!(seen.messages, vec![PackageType::NumberOfPeopleInTheRoomMessage]);
    }

    #[test]
    fn test_negative_player_count_reports_zero() {
        let (slots, seen) = recording_handlers();
        route(
            &Envelope::NumberOfPeopleInTheRoom(NumberOfPeopleInTheRoomMessage { count: -1 }),
            &slots,
        );
        assert_eq!(seen.lock().unwrap().counts, vec![0]);
    }

    #[test]
    fn test_both_result_frames_reach_game_result() {
        let (slots, seen) = recording_handlers();
        route(&Envelope::WawaResult(WawaResultMessage { data: 3 }), &slots);
        route(
            &Envelope::GameResult(GameResultMessage {
                finish: true,
                total_gold: 50,
                total_score: 900,
            }),
            &slots,
        );
        let seen = seen.lock().unwrap();
        assert_eq!(
            seen.results,
            vec![
                GameResult::Catch(CatchOutcome {
                    code: 3,
                    prize_bucket: Some(2)
                }),
                GameResult::Settlement(Settlement {
                    finished: true,
                    total_gold: 50,
                    total_score: 900
                }),
            ]
        );
    }

    #[test]
    fn test_enter_room_reply_routed() {
        let (slots, seen) = recording_handlers();
        route(
            &Envelope::EnterRoom(EnterRoomMessage {
                mac_no: "M42".into(),
                enter_result: true,
                ..Default::default()
            }),
            &slots,
        );
        let seen = seen.lock().unwrap();
        assert_eq!(seen.entered.len(), 1);
        assert!(seen.entered[0].accepted);
    }

    #[test]
    fn test_untyped_frames_only_reach_generic_handler() {
        let (slots, seen) = recording_handlers();
        route(
            &Envelope::Heart(HeartMessage {
                user_id: "u1".into(),
            }),
            &slots,
        );
        let seen = seen.lock().unwrap();
        assert_eq!(seen.messages, vec![PackageType::HeartMessage]);
        assert!(seen.counts.is_empty());
        assert!(seen.results.is_empty());
        assert!(seen.entered.is_empty());
    }

    #[test]
    fn test_route_without_handlers_does_nothing() {
        route(
            &Envelope::WawaResult(WawaResultMessage { data: 1 }),
            &HandlerSlots::default(),
        );
    }
}
