//! Minimal configuration loading for the audio session host.
//!
//! Kept dependency-light so any host binary or test harness can pull it in
//! without dragging the session core along.
//!
//! # Configuration Philosophy
//!
//! - **Runtime plumbing** (`TelemetryConfig`, `EventsConfig`): fixed once the
//!   process starts.
//! - **Policy** (`PolicyConfig`): seeds behaviour the application may later
//!   change through the command protocol.
//! - **Bootstrap** (`BootstrapSession`): an optional session configuration
//!   applied at startup. After that the state machine owns it.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/audio-session/config.toml` (system)
//! 2. `~/.config/audio-session/config.toml` (user)
//! 3. `./audio-session.toml` (local override, or a path given on the CLI)
//! 4. Environment variables (`AUDIO_SESSION_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [telemetry]
//! log_level = "audio_session=debug"
//!
//! [policy]
//! auto_resume = false
//!
//! [events]
//! buffer = 128
//!
//! [session]
//! category = "playback"
//! mode = "spokenAudio"
//! options = ["duckOthers"]
//! ```

pub mod loader;
pub mod policy;
pub mod runtime;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use policy::{BootstrapSession, PolicyConfig};
pub use runtime::{EventsConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete host configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    /// Optional session configuration applied at startup.
    #[serde(default)]
    pub session: BootstrapSession,
}

impl HostConfig {
    /// Load configuration from all standard sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration, letting `config_path` replace the local override.
    ///
    /// System and user configs still load first.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and report where values came from.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources {
            files: loader::discover_config_files_with_override(config_path),
            env_overrides: Vec::new(),
        };

        let mut config = loader::load_merged(&sources.files)?;

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# Audio session host configuration\n\n");

        output.push_str("[telemetry]\n");
        output.push_str(&format!("log_level = \"{}\"\n", self.telemetry.log_level));

        output.push_str("\n[policy]\n");
        output.push_str(&format!("auto_resume = {}\n", self.policy.auto_resume));

        output.push_str("\n[events]\n");
        output.push_str(&format!("buffer = {}\n", self.events.buffer));

        if let Some(category) = &self.session.category {
            output.push_str("\n[session]\n");
            output.push_str(&format!("category = \"{}\"\n", category));
            if let Some(mode) = &self.session.mode {
                output.push_str(&format!("mode = \"{}\"\n", mode));
            }
            let options: Vec<String> = self
                .session
                .options
                .iter()
                .map(|o| format!("\"{}\"", o))
                .collect();
            output.push_str(&format!("options = [{}]\n", options.join(", ")));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.events.buffer, 64);
        assert!(config.policy.auto_resume);
        assert!(!config.session.is_configured());
    }

    #[test]
    fn test_to_toml_without_session() {
        let toml = HostConfig::default().to_toml();
        assert!(toml.contains("[telemetry]"));
        assert!(toml.contains("[policy]"));
        assert!(toml.contains("buffer = 64"));
        assert!(!toml.contains("[session]"));
    }

    #[test]
    fn test_to_toml_parses_back() {
        let mut config = HostConfig::default();
        config.policy.auto_resume = false;
        config.session = BootstrapSession {
            category: Some("playback".to_string()),
            mode: Some("spokenAudio".to_string()),
            options: vec!["duckOthers".to_string()],
        };

        let parsed: HostConfig = toml::from_str(&config.to_toml()).unwrap();
        assert_eq!(parsed, config);
    }
}
