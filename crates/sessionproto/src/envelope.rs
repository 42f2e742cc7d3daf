//! Command channel framing: method calls in, responses out.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Structured failure kinds that may cross the command boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidConfiguration,
    ActivationDenied,
    DeactivationFailed,
    InvalidOption,
    UnsupportedMethod,
    GatewayUnavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidConfiguration => "InvalidConfiguration",
            ErrorKind::ActivationDenied => "ActivationDenied",
            ErrorKind::DeactivationFailed => "DeactivationFailed",
            ErrorKind::InvalidOption => "InvalidOption",
            ErrorKind::UnsupportedMethod => "UnsupportedMethod",
            ErrorKind::GatewayUnavailable => "GatewayUnavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound command: a method name plus named arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Caller-chosen correlation id, echoed on the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub method: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            id: None,
            method: method.into(),
            arguments: Map::new(),
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }
}

/// Error body of a failed command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

/// Either a success value or a structured error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success(Value),
    Error(ErrorBody),
}

/// Exactly one of these is produced per method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Position in the host's total order of responses and events.
    pub sequence: u64,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Response {
    pub fn success(id: Option<u64>, sequence: u64, value: Value) -> Self {
        Self {
            id,
            sequence,
            outcome: Outcome::Success(value),
        }
    }

    pub fn failure(
        id: Option<u64>,
        sequence: u64,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id,
            sequence,
            outcome: Outcome::Error(ErrorBody {
                kind,
                message: message.into(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    /// The error kind, if this response is a failure.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.outcome {
            Outcome::Error(body) => Some(body.kind),
            Outcome::Success(_) => None,
        }
    }

    pub fn into_result(self) -> Result<Value, ErrorBody> {
        match self.outcome {
            Outcome::Success(value) => Ok(value),
            Outcome::Error(body) => Err(body),
        }
    }
}
