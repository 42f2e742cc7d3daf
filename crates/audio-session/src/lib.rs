//! audio-session: shared audio session state machine host
//!
//! Mediates between an application and the platform's single, process-wide
//! audio session. The application declares how it intends to use audio
//! (category, mode, options), activates and deactivates the session, and is
//! told about interruptions, route changes and media services resets.
//!
//! - **SessionStateMachine**: owns activation state and configuration
//! - **SessionHost**: one thread, one queue; commands and platform
//!   notifications are applied in a single total order
//! - **CommandDispatcher**: JSON method calls in, typed commands out
//! - **EventEmitter**: bounded, non-blocking event delivery
//!
//! The platform itself sits behind [`NativeSessionGateway`]. A
//! [`SimulatedGateway`] stands in for it in tests and in the stdio host.

pub mod command;
pub mod config;
pub mod dispatcher;
pub mod emitter;
pub mod error;
pub mod gateway;
pub mod host;
pub mod simulated;
pub mod state_machine;
pub mod stdio;
pub mod telemetry;

pub use command::{Command, Reply};
pub use dispatcher::{CommandDispatcher, PendingRequest};
pub use emitter::{EmitterStats, EventEmitter};
pub use error::{GatewayError, SessionError, SessionResult};
pub use gateway::{GatewayNotification, NativeSessionGateway};
pub use host::{CommandOutcome, PlatformNotifier, SessionHandle, SessionHost};
pub use simulated::{GatewayCall, GatewayOp, SimulatedGateway};
pub use state_machine::SessionStateMachine;
