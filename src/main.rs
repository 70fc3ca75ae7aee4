//! Crawlerverse command-line tool.
//!
//! A thin wrapper around the [`crawlerverse`] library to inspect the agent
//! API from a terminal: check the service health, list games, look at a
//! game or abandon it. Playing is done from code, see [`crawlerverse::run_game`].
//!
//! # Configuration
//!
//! The API key is read from `CRAWLERVERSE_API_KEY`. An optional YAML file
//! can be passed with `--config`; environment variables prefixed with
//! `CRAWLERVERSE_` override it (see [`crawlerverse::config`]).
//!
//! # Usage
//!
//! ```bash
//! crawlerverse health
//! crawlerverse list --status completed --limit 10
//! crawlerverse get <game_id>
//! crawlerverse abandon <game_id>
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (default: `info`)
//!   - Set to `debug` to see every request and response

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Env;
use futures::{StreamExt, TryStreamExt};
use log::{error, info};

use crawlerverse::{GameClient, config::ClientConfig, models::GameStatus};

/// Command-line arguments of the Crawlerverse tool.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to an optional YAML configuration file.
    ///
    /// # Example
    ///
    /// ```yaml
    /// base_url: "http://localhost:3000/api/agent"
    /// timeout_secs: 10
    /// retry:
    ///   max_attempts: 5
    /// ```
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the agent API is reachable and healthy
    Health,
    /// List your games, newest first
    List {
        /// Only show games with this status (in_progress, completed, abandoned)
        #[arg(short, long)]
        status: Option<GameStatus>,

        /// Maximum number of games to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Show the current observation and outcome of a game
    Get { game_id: String },
    /// Abandon a game in progress
    Abandon { game_id: String },
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => ClientConfig::load(path),
        None => ClientConfig::from_env(),
    }
    .context("Failed to load configuration")?;
    let client = GameClient::from_config(&config).context("Failed to create client")?;

    match args.command {
        Command::Health => {
            let health = client.health_status().await?;
            println!(
                "{} is {} (at {})",
                health.service, health.status, health.timestamp
            );
            if !health.is_ok() {
                anyhow::bail!("service reports status '{}'", health.status);
            }
        }
        Command::List { status, limit } => {
            let games: Vec<_> = client.list(status).take(limit).try_collect().await?;
            if games.is_empty() {
                println!("No games");
            }
            for game in games {
                println!("{}", game);
            }
        }
        Command::Get { game_id } => {
            let state = client.get(&game_id).await?;
            println!("{}", state.observation);
            println!("Outcome: {}", state.outcome);
        }
        Command::Abandon { game_id } => {
            let abandoned = client.abandon(&game_id).await?;
            println!(
                "Game {} {} on floor {} after {} turns",
                abandoned.game_id, abandoned.status, abandoned.floor, abandoned.turns
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    // Parse command line arguments
    let args = Args::parse();
    info!("Starting crawlerverse {}...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
