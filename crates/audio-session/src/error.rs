//! Error taxonomy for the session core.
//!
//! `GatewayError` is what the platform reports. It never crosses the command
//! boundary: the state machine translates it into a `SessionError`, which
//! maps one-to-one onto the wire `ErrorKind`.

use sessionproto::ErrorKind;
use thiserror::Error;

/// Failure reported by the native session capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The capability cannot be reached at all.
    #[error("native audio session unavailable: {0}")]
    Unavailable(String),

    /// The platform refused the request (another session holds the hardware,
    /// unsupported combination, ...).
    #[error("refused by platform: {0}")]
    Refused(String),

    /// OS-level error with a platform status code.
    #[error("platform error {code}: {message}")]
    Os { code: i32, message: String },
}

/// Structured failure surfaced to the application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("activation denied: {0}")]
    ActivationDenied(String),

    /// The local state has already been forced to inactive.
    #[error("deactivation failed: {0}")]
    DeactivationFailed(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("unsupported method '{0}'")]
    UnsupportedMethod(String),

    #[error("gateway unavailable: {0}")]
    GatewayUnavailable(String),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            SessionError::ActivationDenied(_) => ErrorKind::ActivationDenied,
            SessionError::DeactivationFailed(_) => ErrorKind::DeactivationFailed,
            SessionError::InvalidOption(_) => ErrorKind::InvalidOption,
            SessionError::UnsupportedMethod(_) => ErrorKind::UnsupportedMethod,
            SessionError::GatewayUnavailable(_) => ErrorKind::GatewayUnavailable,
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_line_up_with_wire_names() {
        let cases = [
            (SessionError::InvalidConfiguration("x".into()), "InvalidConfiguration"),
            (SessionError::ActivationDenied("x".into()), "ActivationDenied"),
            (SessionError::DeactivationFailed("x".into()), "DeactivationFailed"),
            (SessionError::InvalidOption("x".into()), "InvalidOption"),
            (SessionError::UnsupportedMethod("x".into()), "UnsupportedMethod"),
            (SessionError::GatewayUnavailable("x".into()), "GatewayUnavailable"),
        ];
        for (error, name) in cases {
            assert_eq!(error.kind().as_str(), name);
        }
    }

    #[test]
    fn gateway_error_message_is_kept() {
        let err = GatewayError::Os {
            code: 561017449,
            message: "session busy".to_string(),
        };
        let session = SessionError::ActivationDenied(err.to_string());
        assert_eq!(
            session.to_string(),
            "activation denied: platform error 561017449: session busy"
        );
    }
}
