//! Fixed-step ball simulation
//!
//! Velocities are in field units per tick, so one call to [`step`] is one
//! tick. Paddle contact uses the ball centre against the paddle span rather
//! than a full circle/rectangle overlap.

use crate::config::FieldConfig;
use rand::Rng;
use shared::{Ball, Paddles, Slot};

/// Result of one simulation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepOutcome {
    /// Slot credited with a point this step, if the ball left the field
    pub scored: Option<Slot>,
    pub wall_bounce: bool,
    pub paddle_hit: Option<Slot>,
}

/// Recentres the ball and serves it diagonally in a random direction.
pub fn reset_ball(ball: &mut Ball, field: &FieldConfig, rng: &mut impl Rng) {
    ball.x = field.width / 2.0;
    ball.y = field.height / 2.0;
    ball.radius = field.ball_radius;
    ball.vx = random_sign(rng) * field.ball_speed;
    ball.vy = random_sign(rng) * field.ball_speed;
}

fn random_sign(rng: &mut impl Rng) -> f32 {
    if rng.gen_bool(0.5) {
        1.0
    } else {
        -1.0
    }
}

fn within_span(ball_x: f32, paddle_x: f32, field: &FieldConfig) -> bool {
    ball_x > paddle_x && ball_x < paddle_x + field.paddle_width
}

/// Advances the ball by one tick.
///
/// Horizontal and vertical reflections are independent. A ball that leaves
/// the field vertically without a paddle hit credits the opposite side and
/// is served again before this function returns.
pub fn step(
    ball: &mut Ball,
    paddles: &Paddles,
    field: &FieldConfig,
    rng: &mut impl Rng,
) -> StepOutcome {
    let mut outcome = StepOutcome::default();

    ball.x += ball.vx;
    ball.y += ball.vy;

    // Side walls: clamp back inside and send the ball away from the wall
    if ball.x - ball.radius < 0.0 {
        ball.x = ball.radius;
        ball.vx = ball.vx.abs();
        outcome.wall_bounce = true;
    } else if ball.x + ball.radius > field.width {
        ball.x = field.width - ball.radius;
        ball.vx = -ball.vx.abs();
        outcome.wall_bounce = true;
    }

    if ball.vy < 0.0
        && ball.y - ball.radius < field.top_paddle_y
        && within_span(ball.x, paddles.p1, field)
    {
        ball.vy = -ball.vy;
        outcome.paddle_hit = Some(Slot::One);
    } else if ball.vy > 0.0
        && ball.y + ball.radius > field.bottom_paddle_y
        && within_span(ball.x, paddles.p2, field)
    {
        ball.vy = -ball.vy;
        outcome.paddle_hit = Some(Slot::Two);
    }

    // A reflected ball never scores, even if it already crossed the line
    if outcome.paddle_hit.is_some() {
        ball.y = ball.y.clamp(0.0, field.height);
    } else if ball.y < 0.0 {
        // Past the top line: the bottom player scores, and vice versa
        outcome.scored = Some(Slot::Two);
    } else if ball.y > field.height {
        outcome.scored = Some(Slot::One);
    }

    if outcome.scored.is_some() {
        reset_ball(ball, field, rng);
    }

    outcome
}
