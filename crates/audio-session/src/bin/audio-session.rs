//! audio-session host binary
//!
//! Runs the session host against the simulated gateway and speaks JSON
//! lines on stdin/stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use audio_session::{stdio, telemetry, SessionHost, SimulatedGateway};
use clap::Parser;
use sessionconf::HostConfig;
use tokio::io::BufReader;
use tracing::info;

/// Audio session host - activation, interruptions, route changes
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Config file (replaces ./audio-session.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter, overrides the configured level
    #[arg(long)]
    log_level: Option<String>,

    /// Leave re-activation after an interruption to the application
    #[arg(long)]
    no_auto_resume: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, sources) = HostConfig::load_with_sources_from(args.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(level) = args.log_level {
        config.telemetry.log_level = level;
    }
    if args.no_auto_resume {
        config.policy.auto_resume = false;
    }

    if args.show_config {
        print!("{}", config.to_toml());
        return Ok(());
    }

    telemetry::init(&config.telemetry.log_level)?;
    info!("audio-session {} starting", env!("CARGO_PKG_VERSION"));
    info!("  config files: {:?}", sources.files);
    info!("  auto resume: {}", config.policy.auto_resume);
    info!("  event buffer: {}", config.events.buffer);

    let gateway = Arc::new(SimulatedGateway::new());
    let (host, events) = SessionHost::from_config(gateway.clone(), &config)?;

    let input = BufReader::new(tokio::io::stdin());
    let output = tokio::io::stdout();

    tokio::select! {
        result = stdio::run(host, events, gateway, input, output) => result?,
        _ = tokio::signal::ctrl_c() => info!("received shutdown signal"),
    }

    info!("audio-session shutdown complete");
    Ok(())
}
