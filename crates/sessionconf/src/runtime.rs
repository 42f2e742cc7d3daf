//! Runtime plumbing configuration - fixed for the life of the process.

use serde::{Deserialize, Serialize};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive string, e.g. "info" or "audio_session=debug".
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

/// Outbound event channel sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Capacity of the notification channel to the application.
    /// When it is full, notifications are dropped and counted.
    /// Default: 64
    #[serde(default = "EventsConfig::default_buffer")]
    pub buffer: usize,
}

impl EventsConfig {
    fn default_buffer() -> usize {
        64
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            buffer: Self::default_buffer(),
        }
    }
}
