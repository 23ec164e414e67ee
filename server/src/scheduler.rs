//! Deadline-based timers for the serialized event loop
//!
//! A `Timer` never runs anything by itself. The loop sleeps until the
//! earliest deadline of the timers owned by the current match phase, then
//! polls them. Because a timer is a plain value owned by that phase,
//! replacing the phase drops the timer and nothing can fire afterwards.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    next: Instant,
    period: Option<Duration>,
    max_catch_up: u32,
    spent: bool,
}

impl Timer {
    /// Fires every `period`, first at `now + period`.
    ///
    /// When polled late, at most `max_catch_up` elapsed periods are reported
    /// and the rest are skipped, similar to `MissedTickBehavior::Skip`.
    pub fn every(period: Duration, now: Instant, max_catch_up: u32) -> Self {
        Self {
            next: now + period,
            period: Some(period),
            max_catch_up: max_catch_up.max(1),
            spent: false,
        }
    }

    /// Fires exactly once, at `now + delay`.
    pub fn once(delay: Duration, now: Instant) -> Self {
        Self {
            next: now + delay,
            period: None,
            max_catch_up: 1,
            spent: false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        (!self.spent).then_some(self.next)
    }

    /// Number of firings due at `now`. Advances the timer past `now`.
    pub fn poll(&mut self, now: Instant) -> u32 {
        if self.spent || now < self.next {
            return 0;
        }

        let Some(period) = self.period.filter(|p| !p.is_zero()) else {
            self.spent = true;
            return 1;
        };

        let behind = now.duration_since(self.next);
        let elapsed = (behind.as_nanos() / period.as_nanos()) as u64 + 1;
        let fired = elapsed.min(self.max_catch_up as u64) as u32;

        // Skip whatever could not be caught up and realign on the period grid
        self.next += period * (elapsed as u32);
        fired
    }
}
