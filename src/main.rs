use clap::Parser;
use log::LevelFilter;

use seabattle::{init_logging, Server, ServerConfig, DEFAULT_BIND, MAX_FRAME_SIZE};

/// Multiplayer sea battle server.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(long, default_value = DEFAULT_BIND)]
    bind: String,
    #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
    seed: Option<u64>,
    #[arg(long, default_value_t = MAX_FRAME_SIZE)]
    max_frame_size: u32,
    /// Overrides SEABATTLE_LOG (error, warn, info, debug, trace).
    #[arg(long)]
    log_level: Option<LevelFilter>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    if let Some(s) = cli.seed {
        log::info!("using fixed seed {} (games will be reproducible)", s);
    }
    let config = ServerConfig {
        bind: cli.bind,
        max_frame_size: cli.max_frame_size,
        seed: cli.seed,
        ..ServerConfig::default()
    };
    let server = Server::bind(config).await?;
    server.run().await
}
