//! In-process stand-in for the native session.
//!
//! Used by the stdio host when no platform backend is linked, and by tests
//! to script gateway failures and inspect the calls the state machine made.

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use sessionproto::{DeactivationOption, PortDescription, PortType, RouteDescriptor, SessionConfig};
use tracing::debug;

use crate::error::GatewayError;
use crate::gateway::NativeSessionGateway;

/// Most recent calls kept in the call log.
pub const CALL_LOG_CAPACITY: usize = 256;

/// Gateway operations, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOp {
    Apply,
    Activate,
    Deactivate,
    CurrentRoute,
}

/// One recorded call into the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Apply(SessionConfig),
    Activate,
    Deactivate(BTreeSet<DeactivationOption>),
    CurrentRoute,
    IsOtherAudioPlaying,
}

#[derive(Debug)]
struct SimState {
    applied: Option<SessionConfig>,
    active: bool,
    route: RouteDescriptor,
    other_audio_playing: bool,
    unavailable: bool,
    failures: VecDeque<(GatewayOp, GatewayError)>,
    calls: VecDeque<GatewayCall>,
}

/// Simulated native session with a built-in speaker and microphone route.
#[derive(Debug)]
pub struct SimulatedGateway {
    state: Mutex<SimState>,
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                applied: None,
                active: false,
                route: Self::builtin_route(),
                other_audio_playing: false,
                unavailable: false,
                failures: VecDeque::new(),
                calls: VecDeque::with_capacity(CALL_LOG_CAPACITY),
            }),
        }
    }

    /// Built-in microphone in, built-in speaker out.
    pub fn builtin_route() -> RouteDescriptor {
        RouteDescriptor {
            inputs: vec![PortDescription::new(PortType::BuiltInMic, "Built-In Microphone", "builtin-mic")],
            outputs: vec![PortDescription::new(PortType::BuiltInSpeaker, "Speaker", "builtin-speaker")],
        }
    }

    /// Wired headphones with their inline microphone.
    pub fn headset_route() -> RouteDescriptor {
        RouteDescriptor {
            inputs: vec![PortDescription::new(PortType::HeadsetMic, "Headset Microphone", "wired-headset-mic")],
            outputs: vec![PortDescription::new(PortType::Headphones, "Headphones", "wired-headphones")],
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the next call of `op` fail with `error`. Failures queue up.
    pub fn fail_next(&self, op: GatewayOp, error: GatewayError) {
        self.lock().failures.push_back((op, error));
    }

    /// Make every call fail with `GatewayError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    pub fn set_other_audio_playing(&self, playing: bool) {
        self.lock().other_audio_playing = playing;
    }

    /// Replace the route, returning the previous one (what the platform
    /// reports as `previousRoute`).
    pub fn set_route(&self, route: RouteDescriptor) -> RouteDescriptor {
        std::mem::replace(&mut self.lock().route, route)
    }

    /// Forget the applied configuration and activation, as a media services
    /// reset does on the real platform.
    pub fn reset_media_services(&self) {
        let mut state = self.lock();
        state.applied = None;
        state.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    pub fn applied(&self) -> Option<SessionConfig> {
        self.lock().applied.clone()
    }

    /// The most recent calls, oldest first. Holds at most
    /// `CALL_LOG_CAPACITY` entries.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.iter().cloned().collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn record(state: &mut SimState, call: GatewayCall) {
        if state.calls.len() == CALL_LOG_CAPACITY {
            state.calls.pop_front();
        }
        state.calls.push_back(call);
    }

    fn check(state: &mut SimState, op: GatewayOp) -> Result<(), GatewayError> {
        if state.unavailable {
            return Err(GatewayError::Unavailable("simulated session offline".to_string()));
        }
        if let Some(index) = state.failures.iter().position(|(o, _)| *o == op) {
            if let Some((_, error)) = state.failures.remove(index) {
                debug!("simulated gateway injecting failure for {:?}: {}", op, error);
                return Err(error);
            }
        }
        Ok(())
    }
}

impl NativeSessionGateway for SimulatedGateway {
    fn apply(&self, config: &SessionConfig) -> Result<(), GatewayError> {
        let mut state = self.lock();
        Self::record(&mut state, GatewayCall::Apply(config.clone()));
        Self::check(&mut state, GatewayOp::Apply)?;
        state.applied = Some(config.clone());
        Ok(())
    }

    fn activate(&self) -> Result<(), GatewayError> {
        let mut state = self.lock();
        Self::record(&mut state, GatewayCall::Activate);
        Self::check(&mut state, GatewayOp::Activate)?;
        state.active = true;
        Ok(())
    }

    fn deactivate(&self, options: &BTreeSet<DeactivationOption>) -> Result<(), GatewayError> {
        let mut state = self.lock();
        Self::record(&mut state, GatewayCall::Deactivate(options.clone()));
        Self::check(&mut state, GatewayOp::Deactivate)?;
        state.active = false;
        Ok(())
    }

    fn current_route(&self) -> Result<RouteDescriptor, GatewayError> {
        let mut state = self.lock();
        Self::record(&mut state, GatewayCall::CurrentRoute);
        Self::check(&mut state, GatewayOp::CurrentRoute)?;
        Ok(state.route.clone())
    }

    fn is_other_audio_playing(&self) -> Result<bool, GatewayError> {
        let mut state = self.lock();
        Self::record(&mut state, GatewayCall::IsOtherAudioPlaying);
        if state.unavailable {
            return Err(GatewayError::Unavailable("simulated session offline".to_string()));
        }
        Ok(state.other_audio_playing)
    }
}
