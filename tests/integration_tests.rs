//! Integration tests for the match server
//!
//! These tests drive whole matches through the controller and over real UDP.

use server::config::{MatchConfig, ServerConfig};
use server::game::{Command, MatchController, MatchState};
use server::network::{Server, ServerMessage};
use shared::{Packet, Paddles, Scores, Slot, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;

fn packets(controller: &mut MatchController) -> Vec<Packet> {
    controller
        .drain_outbox()
        .into_iter()
        .map(|envelope| envelope.packet)
        .collect()
}

/// MATCH LIFECYCLE TESTS
mod lifecycle_tests {
    use super::*;

    /// Two players join, ready up, count down, play to 5 and stop
    #[test]
    fn full_match_scenario() {
        let start = Instant::now();
        let mut controller = MatchController::with_seed(MatchConfig::default(), 3, 2024);

        assert_eq!(controller.join(1), Ok(Slot::One));
        assert_eq!(controller.join(2), Ok(Slot::Two));
        controller.handle(Command::Ready { connection: 1 }, start);
        controller.handle(Command::Ready { connection: 2 }, start);
        controller.drain_outbox();

        let mut now = start;
        let mut countdown = Vec::new();
        while controller.state() == MatchState::Countdown {
            now += Duration::from_secs(1);
            controller.on_timer(now);
            for packet in packets(&mut controller) {
                match packet {
                    Packet::Countdown { remaining } => countdown.push(remaining),
                    Packet::GameStarted => countdown.push(0),
                    other => panic!("Unexpected packet during countdown: {:?}", other),
                }
            }
        }
        assert_eq!(countdown, vec![2, 1, 0]);
        assert_eq!(controller.state(), MatchState::Running);

        let ball = controller.session().ball;
        assert_eq!((ball.x, ball.y), (300.0, 200.0));
        assert!(ball.vx != 0.0 && ball.vy != 0.0);

        let tick = controller.config().tick_duration();
        let mut last_y = ball.y;
        let mut y_changed = false;
        let mut final_scores = None;
        let mut states_after_end = 0;

        for _ in 0..50_000 {
            // Both paddles dodge to the far side so every serve scores
            let dodge = if controller.session().ball.x > 300.0 { 0.0 } else { 520.0 };
            controller.handle(Command::PaddleMove { connection: 1, x: dodge }, now);
            controller.handle(Command::PaddleMove { connection: 2, x: dodge }, now);

            now += tick;
            controller.on_timer(now);
            for packet in packets(&mut controller) {
                match packet {
                    Packet::GameState { snapshot, .. } => {
                        if final_scores.is_some() {
                            states_after_end += 1;
                        }
                        y_changed |= snapshot.ball.y != last_y;
                        last_y = snapshot.ball.y;
                    }
                    Packet::GameOver { scores } => final_scores = Some(scores),
                    other => panic!("Unexpected packet while running: {:?}", other),
                }
            }
            if final_scores.is_some() {
                break;
            }
        }

        let scores = final_scores.expect("match never ended");
        assert!(y_changed);
        assert!(
            (scores.p1 == 5 && scores.p2 < 5) || (scores.p2 == 5 && scores.p1 < 5),
            "unexpected final scores {:?}",
            scores
        );
        assert_eq!(states_after_end, 0);
        assert_eq!(controller.state(), MatchState::GameOver);

        for _ in 0..120 {
            now += tick;
            controller.on_timer(now);
        }
        assert!(packets(&mut controller).is_empty());
    }

    /// A disconnect mid-match always lands in WaitingForPlayers with fresh state
    #[test]
    fn disconnect_while_running_resets() {
        for (seed, leaver) in [(1u64, 1u32), (2, 2), (3, 1), (4, 2)] {
            let start = Instant::now();
            let mut controller = MatchController::with_seed(MatchConfig::default(), 3, seed);
            controller.handle(Command::Join { connection: 1 }, start);
            controller.handle(Command::Join { connection: 2 }, start);
            controller.handle(Command::Ready { connection: 1 }, start);
            controller.handle(Command::Ready { connection: 2 }, start);

            let mut now = start;
            for _ in 0..3 {
                now += Duration::from_secs(1);
                controller.on_timer(now);
            }
            controller.handle(Command::PaddleMove { connection: 1, x: 5.0 }, now);
            controller.handle(Command::PaddleMove { connection: 2, x: 5.0 }, now);

            let tick = controller.config().tick_duration();
            for _ in 0..150 {
                now += tick;
                controller.on_timer(now);
            }
            assert_eq!(controller.state(), MatchState::Running);

            controller.handle(Command::Leave { connection: leaver }, now);

            assert_eq!(controller.state(), MatchState::WaitingForPlayers);
            assert_eq!(controller.session().scores, Scores::default());
            assert_eq!(controller.session().paddles, Paddles::default());
            assert_eq!(controller.next_deadline(), None);
        }
    }

    /// A third join gets `Full` and leaves the player count alone
    #[test]
    fn third_join_is_rejected() {
        let now = Instant::now();
        let mut controller = MatchController::with_seed(MatchConfig::default(), 3, 5);
        controller.handle(Command::Join { connection: 1 }, now);
        controller.handle(Command::Join { connection: 2 }, now);
        controller.drain_outbox();

        controller.handle(Command::Join { connection: 3 }, now);

        let sent = packets(&mut controller);
        assert_eq!(sent, vec![Packet::Full]);
        assert_eq!(controller.registry().player_count(), 2);
    }

    /// The slot freed by a leaver is handed to the next joiner
    #[test]
    fn vacated_slot_is_reused() {
        let now = Instant::now();
        let mut controller = MatchController::with_seed(MatchConfig::default(), 3, 5);
        controller.handle(Command::Join { connection: 1 }, now);
        controller.handle(Command::Join { connection: 2 }, now);
        controller.handle(Command::Leave { connection: 1 }, now);

        assert_eq!(controller.join(3), Ok(Slot::One));
        assert_eq!(controller.state(), MatchState::ReadyPending);
    }
}

/// NETWORK INTEGRATION TESTS
mod network_tests {
    use super::*;
    use tokio_test::assert_ok;

    async fn play(server_addr: SocketAddr) -> Vec<Packet> {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let join = Packet::Join {
            client_version: PROTOCOL_VERSION,
        };
        socket
            .send_to(&join.encode().unwrap(), server_addr)
            .await
            .unwrap();

        let mut received = Vec::new();
        let mut buf = [0u8; 2048];
        loop {
            let (len, _) = socket.recv_from(&mut buf).await.unwrap();
            let packet = Packet::decode(&buf[..len]).unwrap();

            if let Packet::PlayerNumber { .. } = packet {
                socket
                    .send_to(&Packet::PlayerReady.encode().unwrap(), server_addr)
                    .await
                    .unwrap();
            }

            let done = matches!(packet, Packet::GameOver { .. });
            received.push(packet);
            if done {
                return received;
            }
        }
    }

    /// Two UDP clients play a short match end to end
    #[tokio::test]
    async fn udp_match_end_to_end() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            r#match: MatchConfig {
                tick_rate: 240,
                countdown_step: Duration::from_millis(20),
                win_score: 1,
                ..MatchConfig::default()
            },
            ..ServerConfig::default()
        };
        let mut server = assert_ok!(Server::new(config).await);
        let addr = assert_ok!(server.local_addr());
        let shutdown = server.message_sender();
        let server_task = tokio::spawn(async move { server.run().await });

        let first = tokio::spawn(play(addr));
        // Keep seat order deterministic
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = tokio::spawn(play(addr));

        let outcome = tokio::time::timeout(Duration::from_secs(15), async {
            (first.await.unwrap(), second.await.unwrap())
        })
        .await;
        let (first, second) = assert_ok!(outcome);

        assert_eq!(first[0], Packet::PlayerNumber { slot: Slot::One });
        assert_eq!(second[0], Packet::PlayerNumber { slot: Slot::Two });

        for received in [&first, &second] {
            assert!(received.contains(&Packet::Countdown { remaining: 3 }));
            assert!(received.contains(&Packet::Countdown { remaining: 1 }));
            assert!(received.contains(&Packet::GameStarted));
            assert!(received
                .iter()
                .any(|p| matches!(p, Packet::GameState { .. })));

            match received.last() {
                Some(Packet::GameOver { scores }) => {
                    assert_eq!(scores.p1 + scores.p2, 1);
                }
                other => panic!("Expected GameOver, got {:?}", other),
            }
        }

        assert_ok!(shutdown.send(ServerMessage::Shutdown));
        let result = assert_ok!(server_task.await);
        assert_ok!(result);
    }

    /// Garbage datagrams are dropped without disturbing the server
    #[tokio::test]
    async fn malformed_datagrams_are_ignored() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        };
        let mut server = assert_ok!(Server::new(config).await);
        let addr = assert_ok!(server.local_addr());
        let shutdown = server.message_sender();
        let server_task = tokio::spawn(async move { server.run().await });

        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.send_to(&[0xFF, 0xFF, 0xFF, 0xFF], addr).await.unwrap();
        socket.send_to(&[], addr).await.unwrap();

        let join = Packet::Join {
            client_version: PROTOCOL_VERSION,
        };
        socket.send_to(&join.encode().unwrap(), addr).await.unwrap();

        let mut buf = [0u8; 2048];
        let (len, _) = assert_ok!(
            tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf)).await
        )
        .unwrap();
        assert_eq!(
            Packet::decode(&buf[..len]).unwrap(),
            Packet::PlayerNumber { slot: Slot::One }
        );

        assert_ok!(shutdown.send(ServerMessage::Shutdown));
        let result = assert_ok!(server_task.await);
        assert_ok!(result);
    }
}
