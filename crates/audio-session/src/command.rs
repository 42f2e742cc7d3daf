//! Typed commands accepted by the state machine and their replies.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;
use sessionproto::{ActivationState, DeactivationOption, RouteDescriptor, SessionConfig, SessionStats};
use tracing::warn;

/// One application command, already validated at the dispatch boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Configure(SessionConfig),
    Activate,
    Deactivate(BTreeSet<DeactivationOption>),
    GetRoute,
    IsActive,
    GetConfiguration,
    GetState,
    IsOtherAudioPlaying,
    SetAutoResume(bool),
    GetStats,
}

impl Command {
    /// Protocol method name this command was decoded from.
    pub fn method(&self) -> &'static str {
        match self {
            Command::Configure(_) => "configure",
            Command::Activate => "activate",
            Command::Deactivate(_) => "deactivate",
            Command::GetRoute => "getRoute",
            Command::IsActive => "isActive",
            Command::GetConfiguration => "getConfiguration",
            Command::GetState => "getState",
            Command::IsOtherAudioPlaying => "isOtherAudioPlaying",
            Command::SetAutoResume(_) => "setAutoResume",
            Command::GetStats => "getStats",
        }
    }
}

/// Successful result of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Echo of the configuration now in effect.
    Configured(SessionConfig),
    Activated,
    Deactivated,
    Route(RouteDescriptor),
    Active(bool),
    Configuration(Option<SessionConfig>),
    State(ActivationState),
    OtherAudioPlaying(bool),
    AutoResume(bool),
    Stats(SessionStats),
}

impl Reply {
    /// Encode as the `success` value of a response.
    pub fn to_value(&self) -> Value {
        match self {
            Reply::Configured(config) => encode("configuration", config),
            Reply::Activated | Reply::Deactivated => Value::Bool(true),
            Reply::Route(route) => encode("route", route),
            Reply::Active(active) => Value::Bool(*active),
            Reply::Configuration(config) => encode("configuration", config),
            Reply::State(state) => Value::String(state.as_str().to_string()),
            Reply::OtherAudioPlaying(playing) => Value::Bool(*playing),
            Reply::AutoResume(enabled) => serde_json::json!({ "autoResume": enabled }),
            Reply::Stats(stats) => encode("stats", stats),
        }
    }
}

/// Encode a reply payload. A payload that cannot be encoded becomes `null`
/// and is logged; the command itself has already taken effect.
fn encode<T: Serialize>(what: &str, value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!("failed to encode {} reply: {}", what, e);
        Value::Null
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionproto::{Category, Mode};

    #[test]
    fn activation_replies_are_true() {
        assert_eq!(Reply::Activated.to_value(), Value::Bool(true));
        assert_eq!(Reply::Deactivated.to_value(), Value::Bool(true));
    }

    #[test]
    fn configured_echoes_config() {
        let config = SessionConfig::new(Category::Playback, Mode::Default, []);
        assert_eq!(
            Reply::Configured(config).to_value(),
            serde_json::json!({"category": "playback", "mode": "default", "options": []})
        );
    }

    #[test]
    fn unencodable_payload_becomes_null() {
        // JSON object keys must be strings
        let payload: std::collections::BTreeMap<(u8, u8), u8> = [((1, 2), 3)].into();
        assert_eq!(encode("pairs", &payload), Value::Null);
    }

    #[test]
    fn missing_configuration_is_null() {
        assert_eq!(Reply::Configuration(None).to_value(), Value::Null);
        assert_eq!(Reply::State(ActivationState::Interrupted).to_value(), "interrupted");
    }
}
