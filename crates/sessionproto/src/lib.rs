//! Protocol types for the audio session host.
//!
//! Two logically separate directions share one transport:
//!
//! - **command channel**: the application sends a [`MethodCall`]
//!   (`{"id", "method", "arguments"}`) and receives exactly one [`Response`]
//!   (`{"id", "sequence", "success": ...}` or `{"id", "sequence", "error": {...}}`).
//! - **event channel**: the host pushes [`EventEnvelope`]s carrying a
//!   [`SessionEvent`] (`{"type": "InterruptionBegan", "payload": {...}}`),
//!   never correlated with a pending command.
//!
//! Responses and events are stamped from one sequence counter, so a client
//! can reconstruct the order in which the host finalised them.

pub mod domain;
pub mod envelope;
pub mod events;

pub use domain::{
    ActivationState, Category, CategoryOption, DeactivationOption, InterruptionOption, Mode,
    PortDescription, PortType, RouteChangeReason, RouteDescriptor, SessionConfig, SessionStats,
    UnknownName,
};
pub use envelope::{ErrorBody, ErrorKind, MethodCall, Outcome, Response};
pub use events::{
    EventEnvelope, InterruptionEvent, InterruptionPhase, ResumeOutcome, RouteChangeEvent,
    SessionEvent,
};

/// Protocol version reported by hosts.
pub const PROTOCOL_VERSION: &str = "0.1.0";

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn method_call_without_arguments() {
        let call: MethodCall = serde_json::from_str(r#"{"method": "activate"}"#).unwrap();
        assert_eq!(call.method, "activate");
        assert_eq!(call.id, None);
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn success_response_shape() {
        let response = Response::success(Some(7), 3, serde_json::json!(true));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({"id": 7, "sequence": 3, "success": true}));

        let parsed: Response = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, response);
    }

    #[test]
    fn error_response_shape() {
        let response = Response::failure(None, 9, ErrorKind::UnsupportedMethod, "no such method 'x'");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "sequence": 9,
                "error": {"kind": "UnsupportedMethod", "message": "no such method 'x'"}
            })
        );

        let parsed: Response = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.error_kind(), Some(ErrorKind::UnsupportedMethod));
    }

    #[test]
    fn null_success_survives() {
        let response = Response::success(Some(1), 1, serde_json::Value::Null);
        let json = serde_json::to_string(&response).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_success());
    }
}
