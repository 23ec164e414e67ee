//! Authoritative match state and its transition function
//!
//! `MatchController` is the only owner of ball, paddles, scores and the
//! match phase. All external events arrive as [`Command`]s through
//! [`MatchController::handle`], and timers are polled through
//! [`MatchController::on_timer`], so the caller decides the serialization
//! order and nothing mutates the state concurrently.
//!
//! Timers live inside the `Phase` that armed them. Every phase change goes
//! through `transition`, which runs the exit action of the old phase, so a
//! countdown or simulation timer cannot outlive its phase.

use crate::broadcast::{Broadcaster, Envelope};
use crate::config::MatchConfig;
use crate::countdown::{Countdown, CountdownEvent};
use crate::error::SessionError;
use crate::physics;
use crate::scheduler::Timer;
use crate::session::{ConnectionId, SessionRegistry};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{Ball, Packet, Paddles, Scores, Slot};
use tokio::time::Instant;

/// Externally visible match state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    WaitingForPlayers,
    ReadyPending,
    Countdown,
    Running,
    GameOver,
}

/// Events fed into the controller, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Join { connection: ConnectionId },
    Leave { connection: ConnectionId },
    PaddleMove { connection: ConnectionId, x: f32 },
    Ready { connection: ConnectionId },
    Reset,
}

/// Mutable per-match state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    pub ball: Ball,
    pub paddles: Paddles,
    pub scores: Scores,
    pub tick: u32,
}

impl Session {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug)]
enum Phase {
    WaitingForPlayers,
    ReadyPending,
    Countdown(Countdown),
    Running { ticker: Timer },
    GameOver,
}

impl Phase {
    fn state(&self) -> MatchState {
        match self {
            Phase::WaitingForPlayers => MatchState::WaitingForPlayers,
            Phase::ReadyPending => MatchState::ReadyPending,
            Phase::Countdown(_) => MatchState::Countdown,
            Phase::Running { .. } => MatchState::Running,
            Phase::GameOver => MatchState::GameOver,
        }
    }
}

pub struct MatchController {
    config: MatchConfig,
    max_catch_up_ticks: u32,
    registry: SessionRegistry,
    session: Session,
    phase: Phase,
    broadcaster: Broadcaster,
    rng: StdRng,
}

impl MatchController {
    pub fn new(config: MatchConfig, max_catch_up_ticks: u32) -> Self {
        Self::with_rng(config, max_catch_up_ticks, StdRng::from_entropy())
    }

    /// Controller with a reproducible ball serve sequence
    pub fn with_seed(config: MatchConfig, max_catch_up_ticks: u32, seed: u64) -> Self {
        Self::with_rng(config, max_catch_up_ticks, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: MatchConfig, max_catch_up_ticks: u32, rng: StdRng) -> Self {
        Self {
            config,
            max_catch_up_ticks,
            registry: SessionRegistry::new(),
            session: Session::default(),
            phase: Phase::WaitingForPlayers,
            broadcaster: Broadcaster::new(),
            rng,
        }
    }

    pub fn state(&self) -> MatchState {
        self.phase.state()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Takes every notification queued since the last drain.
    pub fn drain_outbox(&mut self) -> Vec<Envelope> {
        self.broadcaster.drain()
    }

    /// Earliest instant at which `on_timer` has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        match &self.phase {
            Phase::Countdown(countdown) => countdown.deadline(),
            Phase::Running { ticker } => ticker.deadline(),
            _ => None,
        }
    }

    pub fn handle(&mut self, command: Command, now: Instant) {
        match command {
            Command::Join { connection } => {
                // Rejections are already reported to the connection
                let _ = self.join(connection);
            }
            Command::Leave { connection } => self.leave(connection),
            Command::PaddleMove { connection, x } => self.move_paddle(connection, x),
            Command::Ready { connection } => self.ready(connection, now),
            Command::Reset => self.reset(),
        }
    }

    pub fn join(&mut self, connection: ConnectionId) -> Result<Slot, SessionError> {
        match self.registry.join(connection) {
            Ok(slot) => {
                self.broadcaster
                    .send_to(connection, Packet::PlayerNumber { slot });
                self.broadcaster.player_count(&self.registry);

                if self.registry.is_full() && matches!(self.phase, Phase::WaitingForPlayers) {
                    self.transition(Phase::ReadyPending);
                }
                Ok(slot)
            }
            Err(e) => {
                warn!("Rejected connection {}: {}", connection, e);
                self.broadcaster.send_to(connection, Packet::Full);
                Err(e)
            }
        }
    }

    /// Removes a participant. Outside of `WaitingForPlayers` this aborts
    /// whatever was in progress and resets the match.
    pub fn leave(&mut self, connection: ConnectionId) {
        let Some(slot) = self.registry.leave(connection) else {
            debug!("Leave from unseated connection {}", connection);
            return;
        };

        match self.state() {
            MatchState::WaitingForPlayers => {}
            state => info!(
                "Player {} left during {:?}, resetting match",
                slot.number(),
                state
            ),
        }
        self.clear_match();

        self.broadcaster.player_count(&self.registry);
        self.broadcaster.ready_status(&self.registry);
    }

    /// Applies a paddle position as soon as it arrives. The next tick reads it.
    pub fn move_paddle(&mut self, connection: ConnectionId, x: f32) {
        let Some(slot) = self.registry.slot_of(connection) else {
            debug!("Paddle input from unseated connection {}", connection);
            return;
        };

        if !x.is_finite() {
            warn!("Discarding non-finite paddle position from player {}", slot.number());
            return;
        }

        let x = if self.config.clamp_paddles {
            x.clamp(0.0, self.config.field.paddle_max_x())
        } else {
            x
        };
        self.session.paddles.set(slot, x);
    }

    /// Marks a participant ready. In `GameOver` this first resets the match,
    /// so both players readying again starts a rematch.
    pub fn ready(&mut self, connection: ConnectionId, now: Instant) {
        if self.registry.slot_of(connection).is_none() {
            debug!("Ready from unseated connection {}", connection);
            return;
        }

        if matches!(self.phase, Phase::GameOver) {
            info!("Rematch requested by connection {}", connection);
            self.reset();
        }

        match self.registry.set_ready(connection) {
            Ok(true) => self.broadcaster.ready_status(&self.registry),
            Ok(false) => return,
            Err(e) => {
                debug!("Ignoring ready: {}", e);
                return;
            }
        }

        self.try_start_countdown(now);
    }

    /// Clears scores, positions and readiness and waits for the readiness
    /// gate again. Seated participants keep their slots.
    pub fn reset(&mut self) {
        info!("Resetting match");
        self.clear_match();
        self.broadcaster.ready_status(&self.registry);
    }

    /// Runs every timer that is due at `now`.
    pub fn on_timer(&mut self, now: Instant) {
        let countdown_event = match &mut self.phase {
            Phase::Countdown(countdown) => countdown.poll(now),
            _ => None,
        };
        match countdown_event {
            Some(CountdownEvent::Count(remaining)) => {
                self.broadcaster.broadcast(Packet::Countdown { remaining });
            }
            Some(CountdownEvent::Fired) => self.start_match(now),
            None => {}
        }

        let due_ticks = match &mut self.phase {
            Phase::Running { ticker } => ticker.poll(now),
            _ => 0,
        };
        if due_ticks > 1 {
            debug!("Catching up {} simulation ticks", due_ticks);
        }
        for _ in 0..due_ticks {
            if !self.tick() {
                break;
            }
        }
    }

    fn try_start_countdown(&mut self, now: Instant) {
        if !matches!(self.phase, Phase::ReadyPending) || !self.registry.both_ready() {
            return;
        }

        info!("Both players ready, starting countdown");
        let mut countdown = Countdown::new(self.config.countdown_step);
        match countdown.start(self.config.countdown_from, now) {
            CountdownEvent::Count(remaining) => {
                self.transition(Phase::Countdown(countdown));
                self.broadcaster.broadcast(Packet::Countdown { remaining });
            }
            CountdownEvent::Fired => self.start_match(now),
        }
    }

    fn start_match(&mut self, now: Instant) {
        self.session.reset();
        physics::reset_ball(&mut self.session.ball, &self.config.field, &mut self.rng);

        let ticker = Timer::every(self.config.tick_duration(), now, self.max_catch_up_ticks);
        self.transition(Phase::Running { ticker });
        info!(
            "Match started, serving at ({}, {})",
            self.session.ball.vx, self.session.ball.vy
        );
        self.broadcaster.broadcast(Packet::GameStarted);
    }

    /// One simulation step. Returns false once the match has ended.
    fn tick(&mut self) -> bool {
        self.session.tick += 1;

        let outcome = physics::step(
            &mut self.session.ball,
            &self.session.paddles,
            &self.config.field,
            &mut self.rng,
        );

        if let Some(scorer) = outcome.scored {
            self.session.scores.increment(scorer);
            info!(
                "Player {} scores ({} - {})",
                scorer.number(),
                self.session.scores.p1,
                self.session.scores.p2
            );
        }

        if let Some(winner) = self.session.scores.winner(self.config.win_score) {
            info!(
                "Player {} wins {} - {} after {} ticks",
                winner.number(),
                self.session.scores.p1,
                self.session.scores.p2,
                self.session.tick
            );
            self.transition(Phase::GameOver);
            self.broadcaster.broadcast(Packet::GameOver {
                scores: self.session.scores,
            });
            return false;
        }

        if self.session.tick % self.config.tick_rate.max(1) == 0 {
            debug!(
                "Tick {}: ball ({:.1}, {:.1})",
                self.session.tick, self.session.ball.x, self.session.ball.y
            );
        }

        self.broadcaster.game_state(
            self.session.tick,
            &self.session.ball,
            &self.session.paddles,
            &self.session.scores,
        );
        true
    }

    /// Back to `WaitingForPlayers` with fresh state, then settle into
    /// `ReadyPending` if both slots are still taken.
    fn clear_match(&mut self) {
        self.transition(Phase::WaitingForPlayers);
        self.session.reset();
        self.registry.clear_readiness();

        if self.registry.is_full() {
            self.transition(Phase::ReadyPending);
        }
    }

    fn transition(&mut self, next: Phase) {
        let from = self.phase.state();
        let previous = std::mem::replace(&mut self.phase, next);

        // Exit actions: drop whatever timer the old phase owned
        match previous {
            Phase::Countdown(mut countdown) => {
                countdown.cancel();
                debug!("Countdown timer released");
            }
            Phase::Running { .. } => debug!("Simulation timer released"),
            _ => {}
        }

        debug!("Match state {:?} -> {:?}", from, self.state());
    }
}
