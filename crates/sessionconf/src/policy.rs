//! Session policy and bootstrap values.
//!
//! `PolicyConfig` may be changed at runtime through the command protocol;
//! the file only seeds it. `BootstrapSession` is the configuration applied
//! once at startup, before the first application command arrives.

use serde::{Deserialize, Serialize};

/// Behavioural policy knobs for the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Re-activate automatically when an interruption ends with `shouldResume`.
    /// Default: true
    #[serde(default = "PolicyConfig::default_auto_resume")]
    pub auto_resume: bool,
}

impl PolicyConfig {
    fn default_auto_resume() -> bool {
        true
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            auto_resume: Self::default_auto_resume(),
        }
    }
}

/// Initial session configuration, kept as raw platform names.
///
/// Validation happens in the host; this crate does not know the vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BootstrapSession {
    pub category: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

impl BootstrapSession {
    /// True when the file asked for a configuration to be applied at startup.
    pub fn is_configured(&self) -> bool {
        self.category.is_some()
    }
}
