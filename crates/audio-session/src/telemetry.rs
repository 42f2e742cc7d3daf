//! Tracing initialization.
//!
//! Logs go to stderr; stdout carries the JSON-lines protocol.

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber with the given filter directive
/// (`info`, `audio_session=debug`, ...).
pub fn init(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_new(log_level)
        .with_context(|| format!("invalid log filter '{}'", log_level))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_names(true),
        )
        .try_init()
        .map_err(|e| anyhow!("tracing already initialized: {}", e))?;

    tracing::info!("logging initialized at '{}'", log_level);
    Ok(())
}
