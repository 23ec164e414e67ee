use serde::{Deserialize, Serialize};

pub const FIELD_WIDTH: f32 = 600.0;
pub const FIELD_HEIGHT: f32 = 400.0;
pub const TOP_PADDLE_Y: f32 = 20.0;
pub const BOTTOM_PADDLE_Y: f32 = 380.0;
pub const PADDLE_WIDTH: f32 = 80.0;
pub const PADDLE_HEIGHT: f32 = 10.0;
pub const PADDLE_START_X: f32 = (FIELD_WIDTH - PADDLE_WIDTH) / 2.0;
pub const BALL_RADIUS: f32 = 10.0;
pub const BALL_SPEED: f32 = 2.0;
pub const WIN_SCORE: u32 = 5;
pub const TICK_RATE: u32 = 60;
pub const COUNTDOWN_FROM: u32 = 3;
pub const PROTOCOL_VERSION: u32 = 1;

/// One of the two fixed participant positions. Slot one defends the top
/// paddle line, slot two the bottom one.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    One,
    Two,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::One, Slot::Two];

    pub fn number(self) -> u8 {
        match self {
            Slot::One => 1,
            Slot::Two => 2,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Slot::One => 0,
            Slot::Two => 1,
        }
    }

    pub fn opponent(self) -> Slot {
        match self {
            Slot::One => Slot::Two,
            Slot::Two => Slot::One,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
}

impl Ball {
    /// A motionless ball at the centre of the field.
    pub fn centered() -> Self {
        Self {
            x: FIELD_WIDTH / 2.0,
            y: FIELD_HEIGHT / 2.0,
            vx: 0.0,
            vy: 0.0,
            radius: BALL_RADIUS,
        }
    }
}

impl Default for Ball {
    fn default() -> Self {
        Self {
            vx: BALL_SPEED,
            vy: BALL_SPEED,
            ..Self::centered()
        }
    }
}

/// Left edge of each paddle. `p1` runs along the top line, `p2` along the bottom.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Paddles {
    pub p1: f32,
    pub p2: f32,
}

impl Paddles {
    pub fn get(&self, slot: Slot) -> f32 {
        match slot {
            Slot::One => self.p1,
            Slot::Two => self.p2,
        }
    }

    pub fn set(&mut self, slot: Slot, x: f32) {
        match slot {
            Slot::One => self.p1 = x,
            Slot::Two => self.p2 = x,
        }
    }
}

impl Default for Paddles {
    fn default() -> Self {
        Self {
            p1: PADDLE_START_X,
            p2: PADDLE_START_X,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scores {
    pub p1: u32,
    pub p2: u32,
}

impl Scores {
    pub fn get(&self, slot: Slot) -> u32 {
        match slot {
            Slot::One => self.p1,
            Slot::Two => self.p2,
        }
    }

    pub fn increment(&mut self, slot: Slot) {
        match slot {
            Slot::One => self.p1 += 1,
            Slot::Two => self.p2 += 1,
        }
    }

    /// First slot whose score has reached `threshold`.
    pub fn winner(&self, threshold: u32) -> Option<Slot> {
        Slot::ALL.into_iter().find(|slot| self.get(*slot) >= threshold)
    }
}

/// Authoritative state sent to both participants every tick.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct GameSnapshot {
    pub ball: Ball,
    pub paddles: Paddles,
    pub scores: Scores,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    // Client to server
    Join { client_version: u32 },
    PaddleMove { x: f32 },
    PlayerReady,
    Heartbeat,
    Leave,

    // Server to client
    PlayerNumber { slot: Slot },
    Full,
    PlayerCount { count: u32 },
    PlayerReadyStatus { ready: u32 },
    Countdown { remaining: u32 },
    GameStarted,
    GameState { tick: u32, snapshot: GameSnapshot },
    GameOver { scores: Scores },
}

impl Packet {
    pub fn encode(&self) -> bincode::Result<Vec<u8>> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> bincode::Result<Packet> {
        bincode::deserialize(bytes)
    }
}
