//! # Paddle Match Server Library
//!
//! This library provides the authoritative server for a two-player
//! ball-and-paddle match. It seats two participants, runs a synchronized
//! countdown, simulates the ball at a fixed rate and broadcasts the result,
//! so no client-side prediction can desync the match or move a paddle
//! somewhere the server does not agree with.
//!
//! ## Core Responsibilities
//!
//! ### Session Lifecycle
//! The server tracks the match through five states:
//! `WaitingForPlayers → ReadyPending → Countdown → Running → GameOver`.
//! A disconnect during any active phase resets scores, paddles and
//! readiness and returns the match to `WaitingForPlayers`.
//!
//! ### Authoritative Simulation
//! While running, the ball advances one fixed step per tick (60 Hz by
//! default). Side walls and paddles reflect it; leaving the field through
//! the top or bottom scores a point for the opposite side and re-serves the
//! ball from the centre. The first side to reach the win score ends the match.
//!
//! ### State Broadcasting
//! Every tick produces a snapshot of ball, paddles and scores for both
//! participants. Lifecycle events (seat assignment, player count, readiness,
//! countdown, start, end) are sent as they happen.
//!
//! ## Architecture Design
//!
//! ### Single Serialized Event Loop
//! All mutation goes through [`game::MatchController`], which is owned by
//! one task. Network events become [`game::Command`]s and timer deadlines
//! become calls to `on_timer`, one at a time, so no state is ever shared
//! between tasks and no locking is needed around the match itself.
//!
//! ### Timers Owned By States
//! The countdown and simulation timers are values stored inside the match
//! phase that armed them. Leaving a phase drops its timer on every path:
//! win, reset and disconnect alike.
//!
//! ### UDP-Based Communication
//! Packets are `bincode`-encoded datagrams. Per-tick snapshots may be lost
//! without harm, since the next tick carries the full state again.
//!
//! ## Module Organization
//!
//! - [`session`]: player slots and the readiness gate
//! - [`countdown`]: the 3-2-1 sequence before each match
//! - [`scheduler`]: deadline-based repeating and one-shot timers
//! - [`physics`]: the fixed-step ball simulation
//! - [`game`]: the match controller and its state machine
//! - [`broadcast`]: outgoing notifications and snapshots
//! - [`client_manager`]: address to connection mapping and timeouts
//! - [`network`]: the UDP transport and the event loop
//! - [`config`]: gameplay and transport settings
//! - [`error`]: error types
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         bind_addr: "0.0.0.0:3000".to_string(),
//!         ..ServerConfig::default()
//!     };
//!
//!     // Runs until a shutdown message arrives
//!     let mut server = Server::new(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod client_manager;
pub mod config;
pub mod countdown;
pub mod error;
pub mod game;
pub mod network;
pub mod physics;
pub mod scheduler;
pub mod session;
