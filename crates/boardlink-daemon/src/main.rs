//! Boardlink Daemon - Main entry point
//!
//! Replays a discovery/selection event feed into the device tracker and
//! reports the available devices as they change.

mod config;
mod feed;
mod state;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "boardlink")]
#[command(about = "Attached device tracking and selection reconciliation")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "boardlink.toml")]
    config: PathBuf,

    /// Event feed to replay (JSON lines); reads stdin when omitted
    #[arg(short, long)]
    events: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print the final list as JSON instead of following changes
    #[arg(long)]
    json: bool,

    /// Write a default configuration file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Boardlink v{}", env!("CARGO_PKG_VERSION"));

    if args.init_config {
        config::save_default_config(&args.config)?;
        info!(path = %args.config.display(), "Wrote default configuration");
        return Ok(());
    }

    let config = config::load_config(&args.config)?;
    let state = state::AppState::new(&config)?;

    let selection = state.tracker.selection();
    if !selection.is_empty() {
        info!(
            device = ?selection.selected_device.as_ref().map(|d| d.name.as_str()),
            "Restored previous selection"
        );
    }

    let reporter = if args.json {
        None
    } else {
        state::print_available(&state.tracker.available_devices());
        Some(state.spawn_reporter())
    };

    let stats = match &args.events {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            feed::run_feed(BufReader::new(file), &state).await?
        }
        None => feed::run_feed(BufReader::new(tokio::io::stdin()), &state).await?,
    };

    info!(
        applied = stats.applied,
        rejected = stats.rejected,
        malformed = stats.malformed,
        "Event feed finished"
    );

    if args.json {
        let available = state.tracker.available_devices();
        println!("{}", serde_json::to_string_pretty(available.as_slice())?);
    }

    state.shutdown();
    if let Some(reporter) = reporter {
        reporter.await?;
    }

    Ok(())
}
