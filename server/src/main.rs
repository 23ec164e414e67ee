use clap::Parser;
use log::{error, info};
use server::config::{MatchConfig, ServerConfig};
use server::network::{Server, ServerMessage};
use std::time::Duration;

/// Authoritative two-player paddle match server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Simulation steps per second
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,

    /// Points needed to win a match
    #[arg(short, long, default_value = "5")]
    win_score: u32,

    /// Countdown length in seconds
    #[arg(short, long, default_value = "3")]
    countdown: u32,

    /// Seconds of silence before a player is dropped
    #[arg(long, default_value = "5")]
    client_timeout: u64,

    /// Trust paddle positions as sent instead of clamping them
    #[arg(long)]
    no_clamp: bool,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_addr: format!("{}:{}", self.host, self.port),
            client_timeout: Duration::from_secs(self.client_timeout),
            r#match: MatchConfig {
                tick_rate: self.tick_rate,
                win_score: self.win_score,
                countdown_from: self.countdown,
                clamp_paddles: !self.no_clamp,
                ..MatchConfig::default()
            },
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();
    info!(
        "Starting match server: {} Hz, first to {}, {}s countdown",
        config.r#match.tick_rate, config.r#match.win_score, config.r#match.countdown_from
    );

    let mut server = Server::new(config).await?;
    let shutdown = server.message_sender();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            if let Err(e) = shutdown.send(ServerMessage::Shutdown) {
                error!("Failed to signal shutdown: {}", e);
            }
        }
    });

    server.run().await?;

    Ok(())
}
