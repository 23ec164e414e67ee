//! Outgoing notifications produced by the match controller
//!
//! The controller never touches the transport. It queues `Envelope`s here
//! and the network loop drains them after each event. Delivery is
//! fire-and-forget: a lost `GameState` is replaced by the next tick's.

use crate::session::{ConnectionId, SessionRegistry};
use shared::{Ball, GameSnapshot, Packet, Paddles, Scores};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Connection(ConnectionId),
    /// Every seated participant
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub recipient: Recipient,
    pub packet: Packet,
}

#[derive(Debug, Default)]
pub struct Broadcaster {
    outbox: Vec<Envelope>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send_to(&mut self, connection: ConnectionId, packet: Packet) {
        self.outbox.push(Envelope {
            recipient: Recipient::Connection(connection),
            packet,
        });
    }

    pub fn broadcast(&mut self, packet: Packet) {
        self.outbox.push(Envelope {
            recipient: Recipient::All,
            packet,
        });
    }

    pub fn player_count(&mut self, registry: &SessionRegistry) {
        self.broadcast(Packet::PlayerCount {
            count: registry.player_count(),
        });
    }

    pub fn ready_status(&mut self, registry: &SessionRegistry) {
        self.broadcast(Packet::PlayerReadyStatus {
            ready: registry.ready_count(),
        });
    }

    /// Queues the per-tick authoritative snapshot.
    pub fn game_state(&mut self, tick: u32, ball: &Ball, paddles: &Paddles, scores: &Scores) {
        self.broadcast(Packet::GameState {
            tick,
            snapshot: GameSnapshot {
                ball: *ball,
                paddles: *paddles,
                scores: *scores,
            },
        });
    }

    pub fn drain(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.outbox)
    }

    pub fn pending(&self) -> &[Envelope] {
        &self.outbox
    }
}
