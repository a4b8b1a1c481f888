//! SketchRelay server binary.
//!
//! # Usage
//!
//! ```bash
//! # Rooms in memory, host ends the game
//! sketchrelay --bind 0.0.0.0:8080
//!
//! # Rooms persisted to disk, games end after one lap
//! sketchrelay --store rooms.json --termination rounds
//! ```

use std::path::PathBuf;

use clap::Parser;
use sketchrelay::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Drawing-telephone party game server
#[derive(Parser, Debug)]
#[command(name = "sketchrelay")]
#[command(about = "Drawing-telephone party game server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// JSON file to persist rooms in (in-memory if omitted)
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// When games end: `host` (host ends it) or `rounds` (after one lap)
    #[arg(short, long, default_value = "host")]
    termination: TerminationPolicy,

    /// Maximum players per room
    #[arg(long, default_value = "16")]
    max_players: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!(termination = %args.termination, "sketchrelay starting");

    let room = RoomConfig {
        max_players: args.max_players,
        termination: args.termination,
        ..RoomConfig::default()
    };
    let mut builder = RelayServer::builder().bind(&args.bind).room_config(room);
    if let Some(path) = args.store {
        builder = builder.store_path(path);
    }

    let server = builder.build().await?;
    tracing::info!("listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
