//! The 3-2-1 countdown that precedes every match
//!
//! Each announcement arms a one-shot timer for the next one. The countdown
//! owns that timer, so dropping it (disconnect, reset) cancels it silently.

use crate::scheduler::Timer;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    /// Announce the remaining count
    Count(u32),
    /// The countdown reached zero
    Fired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownState {
    Idle,
    Counting { remaining: u32, timer: Timer },
    Fired,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    state: CountdownState,
    step: Duration,
}

impl Countdown {
    pub fn new(step: Duration) -> Self {
        Self {
            state: CountdownState::Idle,
            step,
        }
    }

    /// Starts counting down from `from` and returns the first announcement.
    pub fn start(&mut self, from: u32, now: Instant) -> CountdownEvent {
        if from == 0 {
            self.state = CountdownState::Fired;
            return CountdownEvent::Fired;
        }

        self.state = CountdownState::Counting {
            remaining: from,
            timer: Timer::once(self.step, now),
        };
        CountdownEvent::Count(from)
    }

    /// Returns to idle without firing.
    pub fn cancel(&mut self) {
        self.state = CountdownState::Idle;
    }

    pub fn state(&self) -> &CountdownState {
        &self.state
    }

    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            CountdownState::Counting { timer, .. } => timer.deadline(),
            _ => None,
        }
    }

    /// Advances the countdown if its step elapsed. A late poll still moves
    /// only one step, so every count is announced.
    pub fn poll(&mut self, now: Instant) -> Option<CountdownEvent> {
        let CountdownState::Counting { remaining, timer } = &mut self.state else {
            return None;
        };

        if timer.poll(now) == 0 {
            return None;
        }

        let next = *remaining - 1;
        if next == 0 {
            self.state = CountdownState::Fired;
            return Some(CountdownEvent::Fired);
        }

        *remaining = next;
        *timer = Timer::once(self.step, now);
        Some(CountdownEvent::Count(next))
    }
}
