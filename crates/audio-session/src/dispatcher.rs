//! JSON → typed Command conversion
//!
//! This is the JSON boundary. Callers send a method name plus named
//! arguments; we decode to `Command` here so the state machine only ever
//! sees validated, typed input. Decoding failures still travel through the
//! host queue, so every call gets exactly one response in submission order.

use serde::Deserialize;
use serde_json::{Map, Value};
use sessionproto::{Category, MethodCall, Mode, Response, SessionConfig};
use tokio::sync::oneshot;
use tracing::debug;

use crate::command::Command;
use crate::config;
use crate::error::{SessionError, SessionResult};
use crate::host::{host_stopped, CommandOutcome, SessionHandle};

/// Decode a method name and its arguments into a typed command.
pub fn decode(method: &str, arguments: Map<String, Value>) -> SessionResult<Command> {
    let args = Value::Object(arguments);
    match method {
        "configure" => {
            let p: ConfigureArgs = serde_json::from_value(args)
                .map_err(|e| SessionError::InvalidConfiguration(format!("configure arguments: {}", e)))?;
            Ok(Command::Configure(p.into_config()?))
        }
        "activate" => Ok(Command::Activate),
        "deactivate" => {
            let p: DeactivateArgs = serde_json::from_value(args)
                .map_err(|e| SessionError::InvalidOption(format!("deactivate arguments: {}", e)))?;
            let options = config::parse_deactivation_options(
                p.options.iter().flatten().map(String::as_str),
            )?;
            Ok(Command::Deactivate(options))
        }
        "getRoute" => Ok(Command::GetRoute),
        "isActive" => Ok(Command::IsActive),
        "getConfiguration" => Ok(Command::GetConfiguration),
        "getState" => Ok(Command::GetState),
        "isOtherAudioPlaying" => Ok(Command::IsOtherAudioPlaying),
        "setAutoResume" => {
            let p: SetAutoResumeArgs = serde_json::from_value(args).map_err(|e| {
                SessionError::InvalidOption(format!("setAutoResume needs boolean 'enabled': {}", e))
            })?;
            Ok(Command::SetAutoResume(p.enabled))
        }
        "getStats" => Ok(Command::GetStats),
        other => Err(SessionError::UnsupportedMethod(other.to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct ConfigureArgs {
    category: Option<String>,
    mode: Option<String>,
    options: Option<Vec<String>>,
}

impl ConfigureArgs {
    fn into_config(self) -> SessionResult<SessionConfig> {
        let category: Category = self
            .category
            .as_deref()
            .ok_or_else(|| SessionError::InvalidConfiguration("category is required".to_string()))?
            .parse()
            .map_err(|e: sessionproto::UnknownName| SessionError::InvalidConfiguration(e.to_string()))?;
        let mode: Mode = match self.mode.as_deref() {
            Some(mode) => mode
                .parse()
                .map_err(|e: sessionproto::UnknownName| SessionError::InvalidConfiguration(e.to_string()))?,
            None => Mode::Default,
        };
        let options = config::parse_category_options(self.options.iter().flatten().map(String::as_str))?;
        Ok(SessionConfig::new(category, mode, options))
    }
}

#[derive(Debug, Deserialize)]
struct DeactivateArgs {
    options: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SetAutoResumeArgs {
    enabled: bool,
}

/// A response that is either already known or waiting on the host.
pub struct PendingRequest {
    id: Option<u64>,
    state: Pending,
}

enum Pending {
    Ready(Response),
    Waiting(oneshot::Receiver<CommandOutcome>),
}

impl PendingRequest {
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    /// Wait for the response.
    pub async fn response(self) -> Response {
        match self.state {
            Pending::Ready(response) => response,
            Pending::Waiting(rx) => {
                let outcome = rx.await.unwrap_or_else(|_| CommandOutcome {
                    sequence: 0,
                    result: Err(host_stopped()),
                });
                to_response(self.id, outcome)
            }
        }
    }
}

fn to_response(id: Option<u64>, outcome: CommandOutcome) -> Response {
    match outcome.result {
        Ok(reply) => Response::success(id, outcome.sequence, reply.to_value()),
        Err(e) => Response::failure(id, outcome.sequence, e.kind(), e.to_string()),
    }
}

/// Turns method calls into queued commands.
#[derive(Clone)]
pub struct CommandDispatcher {
    handle: SessionHandle,
}

impl CommandDispatcher {
    pub fn new(handle: SessionHandle) -> Self {
        Self { handle }
    }

    /// Decode and enqueue a call. Returns immediately; the order of
    /// `submit` calls is the order responses are produced in.
    pub fn submit(&self, call: MethodCall) -> PendingRequest {
        let MethodCall { id, method, arguments } = call;
        let command = decode(&method, arguments);
        if let Err(e) = &command {
            debug!("rejecting {}: {}", method, e);
        }
        self.enqueue(id, command)
    }

    /// Queue a failure for input that never decoded into a call at all.
    pub fn reject(&self, id: Option<u64>, error: SessionError) -> PendingRequest {
        self.enqueue(id, Err(error))
    }

    /// Submit and wait in one step.
    pub async fn dispatch(&self, call: MethodCall) -> Response {
        self.submit(call).response().await
    }

    fn enqueue(&self, id: Option<u64>, command: SessionResult<Command>) -> PendingRequest {
        let state = match self.handle.enqueue(command) {
            Ok(rx) => Pending::Waiting(rx),
            Err(e) => Pending::Ready(Response::failure(id, 0, e.kind(), e.to_string())),
        };
        PendingRequest { id, state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sessionproto::{CategoryOption, DeactivationOption};

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("arguments must be an object"),
        }
    }

    #[test]
    fn decodes_configure() {
        let command = decode(
            "configure",
            args(json!({"category": "playback", "mode": "spokenAudio", "options": ["duckOthers"]})),
        )
        .unwrap();
        assert_eq!(
            command,
            Command::Configure(SessionConfig::new(
                Category::Playback,
                Mode::SpokenAudio,
                [CategoryOption::DuckOthers]
            ))
        );
    }

    #[test]
    fn configure_mode_defaults() {
        let command = decode("configure", args(json!({"category": "ambient"}))).unwrap();
        assert_eq!(
            command,
            Command::Configure(SessionConfig::new(Category::Ambient, Mode::Default, []))
        );
    }

    #[test]
    fn configure_rejects_unknown_names() {
        assert!(matches!(
            decode("configure", args(json!({}))),
            Err(SessionError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            decode("configure", args(json!({"category": "karaoke"}))),
            Err(SessionError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            decode("configure", args(json!({"category": "playback", "mode": "loud"}))),
            Err(SessionError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            decode("configure", args(json!({"category": "playback", "options": ["fooBar"]}))),
            Err(SessionError::InvalidOption(_))
        ));
    }

    #[test]
    fn decodes_deactivate_options() {
        assert_eq!(
            decode("deactivate", Map::new()).unwrap(),
            Command::Deactivate(Default::default())
        );
        assert_eq!(
            decode("deactivate", args(json!({"options": ["notifyOthersOnDeactivation"]}))).unwrap(),
            Command::Deactivate([DeactivationOption::NotifyOthersOnDeactivation].into())
        );
        assert!(matches!(
            decode("deactivate", args(json!({"options": ["politely"]}))),
            Err(SessionError::InvalidOption(_))
        ));
    }

    #[test]
    fn set_auto_resume_needs_flag() {
        assert_eq!(
            decode("setAutoResume", args(json!({"enabled": false}))).unwrap(),
            Command::SetAutoResume(false)
        );
        assert!(decode("setAutoResume", Map::new()).is_err());
    }

    #[test]
    fn unknown_method_is_unsupported() {
        assert_eq!(
            decode("setPreferredSampleRate", Map::new()),
            Err(SessionError::UnsupportedMethod("setPreferredSampleRate".to_string()))
        );
    }
}
