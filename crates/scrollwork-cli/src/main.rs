use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scrollwork_core::SchedulerConfig;

mod commands;
mod scenario;

#[derive(Parser)]
#[command(name = "scrollwork")]
#[command(author, version, about = "Headless driver for scroll-driven animation scenarios")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use this configuration file instead of ~/.config/scrollwork/config.toml
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario frame by frame on a simulated clock
    Simulate {
        /// Scenario TOML file
        scenario: PathBuf,
        /// Number of frames to run (defaults to the scenario's)
        #[arg(short = 'n', long)]
        frames: Option<u64>,
        /// Simulated frame rate (defaults to the scenario's)
        #[arg(long)]
        fps: Option<f64>,
        /// Print the run as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a scenario in real time, printing trigger events as they fire
    Watch {
        /// Scenario TOML file
        scenario: PathBuf,
        #[arg(long)]
        fps: Option<f64>,
        /// Stop after this many seconds (runs until Ctrl+C otherwise)
        #[arg(short = 's', long)]
        seconds: Option<f64>,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short = 'f', long)]
        force: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => SchedulerConfig::load_from(path)?,
        None => SchedulerConfig::load()?,
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Simulate {
            scenario,
            frames,
            fps,
            json,
        } => commands::simulate::run(&scenario, config, frames, fps, json),
        Commands::Watch {
            scenario,
            fps,
            seconds,
        } => commands::watch::run(&scenario, config, fps, seconds).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&config),
            ConfigAction::Path => commands::config::path(cli.config.as_deref()),
            ConfigAction::Init { force } => commands::config::init(force),
        },
    }
}
