//! Headless participant for smoke-testing a running match server.
//!
//! Joins, declares itself ready and follows the ball with its paddle until
//! the match ends. Run two of them against one server to watch a full match.

use clap::Parser;
use log::{debug, info, warn};
use shared::{Packet, Slot, PADDLE_START_X, PADDLE_WIDTH, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::interval;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    server: String,

    /// Fraction of the distance to the ball covered per update (0..=1)
    #[arg(short = 'k', long, default_value = "0.15")]
    skill: f32,
}

struct Bot {
    socket: UdpSocket,
    server_addr: SocketAddr,
    slot: Option<Slot>,
    paddle_x: f32,
    skill: f32,
}

impl Bot {
    async fn send(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        self.socket.send_to(&packet.encode()?, self.server_addr).await?;
        Ok(())
    }

    /// Returns false once the bot should stop.
    async fn handle_packet(&mut self, packet: Packet) -> Result<bool, Box<dyn std::error::Error>> {
        match packet {
            Packet::PlayerNumber { slot } => {
                info!("Seated as player {}", slot.number());
                self.slot = Some(slot);
                self.send(&Packet::PlayerReady).await?;
            }
            Packet::Full => {
                warn!("Server is full");
                return Ok(false);
            }
            Packet::PlayerCount { count } => info!("{} player(s) connected", count),
            Packet::PlayerReadyStatus { ready } => info!("{} player(s) ready", ready),
            Packet::Countdown { remaining } => info!("Starting in {}...", remaining),
            Packet::GameStarted => {
                info!("Match started");
                self.paddle_x = PADDLE_START_X;
            }
            Packet::GameState { tick, snapshot } => {
                let target = snapshot.ball.x - PADDLE_WIDTH / 2.0;
                let next = self.paddle_x + (target - self.paddle_x) * self.skill;
                if (next - self.paddle_x).abs() > 0.5 {
                    self.paddle_x = next;
                    self.send(&Packet::PaddleMove { x: next }).await?;
                }
                if tick % 60 == 0 {
                    debug!(
                        "Tick {}: ball ({:.0}, {:.0}) score {}-{}",
                        tick,
                        snapshot.ball.x,
                        snapshot.ball.y,
                        snapshot.scores.p1,
                        snapshot.scores.p2
                    );
                }
            }
            Packet::GameOver { scores } => {
                let won = self
                    .slot
                    .is_some_and(|slot| scores.get(slot) > scores.get(slot.opponent()));
                info!(
                    "Match over {} - {}, {}",
                    scores.p1,
                    scores.p2,
                    if won { "we won" } else { "we lost" }
                );
                return Ok(false);
            }
            other => warn!("Unexpected packet from server: {:?}", other),
        }
        Ok(true)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    info!("Client socket bound to {}", socket.local_addr()?);

    let mut bot = Bot {
        socket,
        server_addr: args.server.parse()?,
        slot: None,
        paddle_x: PADDLE_START_X,
        skill: args.skill.clamp(0.0, 1.0),
    };

    bot.send(&Packet::Join {
        client_version: PROTOCOL_VERSION,
    })
    .await?;

    let mut heartbeat = interval(Duration::from_secs(1));
    let mut buf = [0u8; 2048];

    loop {
        tokio::select! {
            result = bot.socket.recv_from(&mut buf) => {
                let (len, _) = result?;
                match Packet::decode(&buf[..len]) {
                    Ok(packet) => {
                        if !bot.handle_packet(packet).await? {
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to decode packet: {}", e),
                }
            }
            _ = heartbeat.tick() => {
                bot.send(&Packet::Heartbeat).await?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Leaving match");
                break;
            }
        }
    }

    bot.send(&Packet::Leave).await?;
    Ok(())
}
