//! Runtime configuration for the session server
//!
//! `MatchConfig` holds the gameplay tunables and `ServerConfig` the transport
//! settings. Both default to the standard field: 60 Hz ticks, a 3-2-1
//! countdown, first to 5 points.

use shared::{
    BALL_RADIUS, BALL_SPEED, BOTTOM_PADDLE_Y, COUNTDOWN_FROM, FIELD_HEIGHT, FIELD_WIDTH,
    PADDLE_WIDTH, TICK_RATE, TOP_PADDLE_Y, WIN_SCORE,
};
use std::time::Duration;

/// Field geometry used by the physics step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldConfig {
    pub width: f32,
    pub height: f32,
    pub top_paddle_y: f32,
    pub bottom_paddle_y: f32,
    pub paddle_width: f32,
    pub ball_radius: f32,
    pub ball_speed: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: FIELD_WIDTH,
            height: FIELD_HEIGHT,
            top_paddle_y: TOP_PADDLE_Y,
            bottom_paddle_y: BOTTOM_PADDLE_Y,
            paddle_width: PADDLE_WIDTH,
            ball_radius: BALL_RADIUS,
            ball_speed: BALL_SPEED,
        }
    }
}

impl FieldConfig {
    /// Largest legal left edge for a paddle
    pub fn paddle_max_x(&self) -> f32 {
        self.width - self.paddle_width
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    pub field: FieldConfig,
    /// Simulation steps per second while running
    pub tick_rate: u32,
    /// First value announced by the countdown
    pub countdown_from: u32,
    /// Delay between countdown announcements
    pub countdown_step: Duration,
    pub win_score: u32,
    /// Clamp incoming paddle positions into the field
    pub clamp_paddles: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            field: FieldConfig::default(),
            tick_rate: TICK_RATE,
            countdown_from: COUNTDOWN_FROM,
            countdown_step: Duration::from_secs(1),
            win_score: WIN_SCORE,
            clamp_paddles: true,
        }
    }
}

impl MatchConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Silence after which a seated participant counts as disconnected
    pub client_timeout: Duration,
    /// Upper bound on simulation steps run back-to-back after a late wakeup
    pub max_catch_up_ticks: u32,
    pub r#match: MatchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            client_timeout: Duration::from_secs(5),
            max_catch_up_ticks: 3,
            r#match: MatchConfig::default(),
        }
    }
}
