//! A pretend machine server for `--simulate`.
//!
//! Accepts any non-empty secret, admits the player to any machine, and
//! decides each grab with a dice roll.

use clawlink::prelude::{Codec, Direction, Envelope};
use clawlink::protocol::{
    EnterRoomMessage, GameResultMessage, LoginMessage, NumberOfPeopleInTheRoomMessage,
    ProtobufCodec, WawaResultMessage,
};
use clawlink::transport::{Connection, LoopbackAcceptor, LoopbackConnection};
use rand::Rng;

/// Prize buckets the simulated machine holds.
const BUCKETS: i32 = 3;

#[derive(Debug, Default)]
struct Round {
    grabs: u32,
    gold: i64,
    score: i64,
}

pub(crate) async fn run(mut acceptor: LoopbackAcceptor) {
    while let Some(conn) = acceptor.accept().await {
        tokio::spawn(serve(conn));
    }
}

async fn serve(conn: LoopbackConnection) {
    let codec = ProtobufCodec;
    let mut round = Round::default();
    tracing::debug!(conn_id = %conn.id(), "simulator: client connected");

    while let Ok(Some(bytes)) = conn.recv().await {
        let envelope = match codec.decode(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "simulator: bad frame");
                continue;
            }
        };
        let replies = respond(&envelope, &mut round, &mut rand::rng());
        for reply in replies {
            let Ok(frame) = codec.encode(&reply) else {
                continue;
            };
            if conn.send(&frame).await.is_err() {
                return;
            }
        }
    }
    tracing::debug!(conn_id = %conn.id(), "simulator: client left");
}

/// The machine's replies to one client frame.
fn respond(envelope: &Envelope, round: &mut Round, rng: &mut impl Rng) -> Vec<Envelope> {
    match envelope {
        Envelope::Login(login) => vec![Envelope::Login(LoginMessage {
            login_result: !login.temp_passwd.is_empty(),
            is_server_side: true,
            ..login.clone()
        })],
        Envelope::EnterRoom(enter) => vec![
            Envelope::EnterRoom(EnterRoomMessage {
                is_server_side: true,
                enter_result: true,
                webrtc_client_id: format!("sim-{}", enter.user_id),
                stream_url: format!("rtmp://simulator/{}", enter.mac_no),
                ..enter.clone()
            }),
            Envelope::NumberOfPeopleInTheRoom(NumberOfPeopleInTheRoomMessage { count: 1 }),
        ],
        Envelope::ExitRoom(_) => vec![Envelope::NumberOfPeopleInTheRoom(
            NumberOfPeopleInTheRoomMessage { count: 0 },
        )],
        Envelope::StartGame(_) => {
            *round = Round::default();
            Vec::new()
        }
        Envelope::WawaMove(mv) if mv.direction() == Some(Direction::Grab) => {
            round.grabs += 1;
            let data = rng.random_range(0..=BUCKETS);
            tracing::debug!(grab = round.grabs, data, "simulator: grab");
            if data > 0 {
                round.gold += 10 * i64::from(data);
                round.score += 100;
            }
            vec![
                Envelope::WawaResult(WawaResultMessage { data }),
                Envelope::GameResult(GameResultMessage {
                    finish: true,
                    total_gold: round.gold,
                    total_score: round.score,
                }),
            ]
        }
        // Chat is relayed back as if from the room.
        Envelope::SendMessageToRoommate(_) => vec![envelope.clone()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawlink::protocol::{StartGameMessage, WawaMoveMessage};
    use clawlink::prelude::{MachineId, UserId};

    fn login(secret: &str) -> Envelope {
        Envelope::Login(LoginMessage {
            user_id: "u1".into(),
            temp_passwd: secret.into(),
            ..Default::default()
        })
    }

    #[test]
    fn test_login_needs_secret() {
        let mut round = Round::default();
        let accepted = respond(&login("s1"), &mut round, &mut rand::rng());
        assert!(matches!(&accepted[..], [Envelope::Login(m)] if m.login_result));

        let rejected = respond(&login(""), &mut round, &mut rand::rng());
        assert!(matches!(&rejected[..], [Envelope::Login(m)] if !m.login_result));
    }

    #[test]
    fn test_enter_room_is_admitted_with_stream() {
        let enter = Envelope::EnterRoom(EnterRoomMessage {
            user_id: "u1".into(),
            mac_no: "M42".into(),
            ..Default::default()
        });
        let replies = respond(&enter, &mut Round::default(), &mut rand::rng());
        let Envelope::EnterRoom(reply) = &replies[0] else {
            panic!("expected ENTERROOM reply");
        };
        assert!(reply.enter_result);
        assert_eq!(reply.stream_url, "rtmp://simulator/M42");
        assert_eq!(replies.len(), 2);
    }

    #[test]
    fn test_grab_settles_round() {
        let mut round = Round::default();
        respond(
            &Envelope::StartGame(StartGameMessage::default()),
            &mut round,
            &mut rand::rng(),
        );
        let grab = Envelope::WawaMove(WawaMoveMessage::new(
            &UserId::from("u1"),
            &MachineId::from("M42"),
            Direction::Grab,
        ));
        let replies = respond(&grab, &mut round, &mut rand::rng());

        let [Envelope::WawaResult(result), Envelope::GameResult(settlement)] = &replies[..] else {
            panic!("expected result + settlement, got {replies:?}");
        };
        assert!((0..=BUCKETS).contains(&result.data));
        assert!(settlement.finish);
        assert_eq!(round.grabs, 1);
    }

    #[test]
    fn test_plain_moves_get_no_reply() {
        let left = Envelope::WawaMove(WawaMoveMessage::new(
            &UserId::from("u1"),
            &MachineId::from("M42"),
            Direction::Left,
        ));
        assert!(respond(&left, &mut Round::default(), &mut rand::rng()).is_empty());
    }
}
