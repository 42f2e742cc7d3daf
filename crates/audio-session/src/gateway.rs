//! The seam to the platform's native audio session.
//!
//! The native session is a process-wide hardware resource. It is modelled as
//! one injected capability, owned by the host process and borrowed by the
//! state machine, which is its only mutating caller.

use std::collections::BTreeSet;

use sessionproto::{DeactivationOption, InterruptionEvent, RouteChangeEvent, RouteDescriptor, SessionConfig};

use crate::error::GatewayError;

/// Native audio session capability.
///
/// Calls may block briefly on the OS and are not cancellable; the host only
/// ever issues them from its serialization thread.
pub trait NativeSessionGateway: Send + Sync + 'static {
    /// Apply category, mode and options.
    fn apply(&self, config: &SessionConfig) -> Result<(), GatewayError>;

    /// Claim the shared audio hardware.
    fn activate(&self) -> Result<(), GatewayError>;

    /// Release the hardware.
    fn deactivate(&self, options: &BTreeSet<DeactivationOption>) -> Result<(), GatewayError>;

    /// Describe the current input/output route.
    fn current_route(&self) -> Result<RouteDescriptor, GatewayError>;

    /// Whether another process is currently playing audio.
    fn is_other_audio_playing(&self) -> Result<bool, GatewayError> {
        Ok(false)
    }
}

/// Asynchronous notifications pushed by the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayNotification {
    Interruption(InterruptionEvent),
    RouteChange(RouteChangeEvent),
    MediaServicesLost,
    MediaServicesReset,
    SilenceSecondaryAudioHint { begin: bool },
}
