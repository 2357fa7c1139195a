use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use hive_mind_engine::config::{load_config, load_default_config};
use hive_mind_engine::games::hive_mind::puzzles::PUZZLES;
use hive_mind_engine::server::{serve, RoomHub};

#[derive(Parser)]
#[command(name = "hive-mind-server", about = "Hive Mind multiplayer room server")]
struct Cli {
    /// Path to hive_mind.toml (default: auto-discover)
    #[arg(long, env = "HIVE_MIND_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configured bind address
    #[arg(short, long, env = "HIVE_MIND_PORT")]
    port: Option<u16>,

    /// Directory for persisted rooms (default: keep rooms in memory)
    #[arg(long, env = "HIVE_MIND_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => {
            load_config(path).map_err(|e| format!("Failed to load config: {}", e))?
        }
        None => load_default_config(),
    };
    if let Some(port) = cli.port {
        config.bind.set_port(port);
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }

    for puzzle in PUZZLES.iter() {
        if let Some(problem) = puzzle.validate() {
            return Err(format!("puzzle {} is invalid: {}", puzzle.id, problem).into());
        }
    }
    tracing::info!(puzzles = PUZZLES.len(), "puzzle catalog loaded");

    let bind = config.bind;
    let hub = RoomHub::from_config(config)?;
    let listener = TcpListener::bind(bind).await?;
    tracing::info!(addr = %bind, "starting Hive Mind server");

    serve(listener, hub).await?;
    Ok(())
}
