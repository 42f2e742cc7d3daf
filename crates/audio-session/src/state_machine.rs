//! SessionStateMachine - single owner of activation state and configuration.
//!
//! States:
//! - `Inactive`: no audio activity
//! - `Active`: session claimed, audio may flow
//! - `Interrupted`: was active, the platform suspended it
//!
//! Every method runs to completion before the next one starts; the host
//! guarantees that by calling it from one thread only. Gateway failures are
//! translated into `SessionError` here and never leak as platform errors.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sessionproto::{
    ActivationState, DeactivationOption, EventEnvelope, InterruptionEvent, InterruptionOption,
    InterruptionPhase, ResumeOutcome, RouteChangeEvent, RouteChangeReason, RouteDescriptor,
    SessionConfig, SessionEvent, SessionStats,
};
use tracing::{debug, info, warn};

use crate::command::{Command, Reply};
use crate::config::{self, MICROPHONE_ENABLED};
use crate::emitter::EventEmitter;
use crate::error::{SessionError, SessionResult};
use crate::gateway::{GatewayNotification, NativeSessionGateway};

pub struct SessionStateMachine {
    gateway: Arc<dyn NativeSessionGateway>,
    emitter: EventEmitter,
    state: ActivationState,
    config: Option<SessionConfig>,
    auto_resume: bool,
    microphone: bool,
    // Shared by responses and events so their relative order is observable
    sequence: u64,
    commands_processed: u64,
}

impl SessionStateMachine {
    pub fn new(gateway: Arc<dyn NativeSessionGateway>, emitter: EventEmitter) -> Self {
        Self {
            gateway,
            emitter,
            state: ActivationState::Inactive,
            config: None,
            auto_resume: true,
            microphone: MICROPHONE_ENABLED,
            sequence: 0,
            commands_processed: 0,
        }
    }

    pub fn with_auto_resume(mut self, auto_resume: bool) -> Self {
        self.auto_resume = auto_resume;
        self
    }

    /// Override the build-time microphone gate.
    pub fn with_microphone(mut self, microphone: bool) -> Self {
        self.microphone = microphone;
        self
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ActivationState::Active
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    pub fn auto_resume(&self) -> bool {
        self.auto_resume
    }

    pub fn set_auto_resume(&mut self, enabled: bool) {
        if self.auto_resume != enabled {
            info!("auto-resume {}", if enabled { "enabled" } else { "disabled" });
        }
        self.auto_resume = enabled;
    }

    /// Take the next position in the host's total order.
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    pub fn stats(&self) -> SessionStats {
        let emitter = self.emitter.stats();
        SessionStats {
            state: self.state,
            auto_resume: self.auto_resume,
            commands_processed: self.commands_processed,
            events_emitted: emitter.emitted(),
            events_dropped: emitter.dropped(),
        }
    }

    // === Commands ===

    /// Run one application command.
    pub fn execute(&mut self, command: Command) -> SessionResult<Reply> {
        self.commands_processed += 1;
        debug!("executing {} in state {}", command.method(), self.state);

        match command {
            Command::Configure(config) => self.configure(config).map(Reply::Configured),
            Command::Activate => self.activate().map(|()| Reply::Activated),
            Command::Deactivate(options) => self.deactivate(&options).map(|()| Reply::Deactivated),
            Command::GetRoute => self.current_route().map(Reply::Route),
            Command::IsActive => Ok(Reply::Active(self.is_active())),
            Command::GetConfiguration => Ok(Reply::Configuration(self.config.clone())),
            Command::GetState => Ok(Reply::State(self.state)),
            Command::IsOtherAudioPlaying => self
                .gateway
                .is_other_audio_playing()
                .map(Reply::OtherAudioPlaying)
                .map_err(|e| SessionError::GatewayUnavailable(e.to_string())),
            Command::SetAutoResume(enabled) => {
                self.set_auto_resume(enabled);
                Ok(Reply::AutoResume(enabled))
            }
            Command::GetStats => Ok(Reply::Stats(self.stats())),
        }
    }

    /// Apply a configuration. Valid in any state.
    ///
    /// On rejection the previous configuration and state are untouched.
    pub fn configure(&mut self, config: SessionConfig) -> SessionResult<SessionConfig> {
        config::validate(&config, self.microphone)?;

        self.gateway.apply(&config).map_err(|e| {
            warn!("platform rejected configuration {}: {}", config, e);
            SessionError::InvalidConfiguration(e.to_string())
        })?;

        info!("session configured: {}", config);
        self.config = Some(config.clone());
        Ok(config)
    }

    /// Claim the audio hardware. Valid from `Inactive` or `Interrupted`;
    /// already being active is a no-op.
    pub fn activate(&mut self) -> SessionResult<()> {
        if self.state == ActivationState::Active {
            debug!("activate while already active");
            return Ok(());
        }

        self.gateway.activate().map_err(|e| {
            warn!("activation denied in state {}: {}", self.state, e);
            SessionError::ActivationDenied(e.to_string())
        })?;

        self.transition(ActivationState::Active, "activated");
        Ok(())
    }

    /// Release the audio hardware. Always ends `Inactive`, even when the
    /// platform reports a failure, so the session can never wedge active.
    pub fn deactivate(&mut self, requested: &BTreeSet<DeactivationOption>) -> SessionResult<()> {
        if self.state == ActivationState::Inactive {
            debug!("deactivate while already inactive");
            return Ok(());
        }

        let options = config::merge_deactivation_options(requested, self.config.as_ref());
        let result = self.gateway.deactivate(&options);

        self.transition(ActivationState::Inactive, "deactivated");

        result.map_err(|e| {
            warn!("platform deactivation failed, forced inactive locally: {}", e);
            SessionError::DeactivationFailed(e.to_string())
        })
    }

    pub fn current_route(&self) -> SessionResult<RouteDescriptor> {
        self.gateway
            .current_route()
            .map_err(|e| SessionError::GatewayUnavailable(e.to_string()))
    }

    // === Platform notifications ===

    /// Route a platform notification to its handler.
    pub fn handle_notification(&mut self, notification: GatewayNotification) {
        match notification {
            GatewayNotification::Interruption(event) => self.on_interruption(event),
            GatewayNotification::RouteChange(event) => self.on_route_change(event),
            GatewayNotification::MediaServicesLost => self.on_media_services_lost(),
            GatewayNotification::MediaServicesReset => self.on_media_services_reset(),
            GatewayNotification::SilenceSecondaryAudioHint { begin } => {
                self.on_silence_secondary_audio_hint(begin)
            }
        }
    }

    pub fn on_interruption(&mut self, event: InterruptionEvent) {
        match event.phase {
            InterruptionPhase::Began => self.interruption_began(event.timestamp),
            InterruptionPhase::Ended => self.interruption_ended(event),
        }
    }

    pub fn on_interruption_began(&mut self) {
        self.interruption_began(Utc::now());
    }

    pub fn on_interruption_ended(&mut self, resume_options: impl IntoIterator<Item = InterruptionOption>) {
        self.interruption_ended(InterruptionEvent::ended(resume_options));
    }

    fn interruption_began(&mut self, timestamp: DateTime<Utc>) {
        if self.state != ActivationState::Active {
            debug!("interruption began while {}, ignored", self.state);
            return;
        }

        self.transition(ActivationState::Interrupted, "interruption began");
        self.emit(SessionEvent::InterruptionBegan { timestamp });
    }

    fn interruption_ended(&mut self, event: InterruptionEvent) {
        if self.state != ActivationState::Interrupted {
            debug!("interruption ended while {}, ignored", self.state);
            return;
        }

        let (outcome, message) = if !event.should_resume() {
            (ResumeOutcome::NotResumed, None)
        } else if !self.auto_resume {
            (ResumeOutcome::ResumeDeferred, None)
        } else {
            match self.gateway.activate() {
                Ok(()) => {
                    self.transition(ActivationState::Active, "resumed after interruption");
                    (ResumeOutcome::Resumed, None)
                }
                Err(e) => {
                    warn!("resume after interruption failed, staying interrupted: {}", e);
                    (ResumeOutcome::ResumeFailed, Some(e.to_string()))
                }
            }
        };

        self.emit(SessionEvent::InterruptionEnded {
            timestamp: event.timestamp,
            resume_options: event.resume_options,
            outcome,
            message,
        });
    }

    /// Forward a route change. Does not change state, except that losing
    /// every suitable route deactivates the session.
    pub fn on_route_change(&mut self, event: RouteChangeEvent) {
        let current_route = match self.gateway.current_route() {
            Ok(route) => Some(route),
            Err(e) => {
                warn!("could not query route after {:?}: {}", event.reason, e);
                None
            }
        };

        let mut session_deactivated = false;
        if event.reason == RouteChangeReason::NoSuitableRouteForCategory
            && self.state != ActivationState::Inactive
        {
            info!("no suitable route for category, deactivating");
            if let Err(e) = self.deactivate(&BTreeSet::new()) {
                warn!("{}", e);
            }
            session_deactivated = true;
        }

        self.emit(SessionEvent::RouteChanged {
            reason: event.reason,
            previous_route: event.previous_route,
            current_route,
            session_deactivated,
        });
    }

    /// The platform audio daemon died; whatever was active is gone.
    pub fn on_media_services_lost(&mut self) {
        if self.state != ActivationState::Inactive {
            self.transition(ActivationState::Inactive, "media services lost");
        }
        self.emit(SessionEvent::MediaServicesLost);
    }

    /// The platform audio daemon restarted underneath us. Forces `Inactive`
    /// and re-applies the last configuration; re-activation is left to the
    /// application.
    pub fn on_media_services_reset(&mut self) {
        if self.state != ActivationState::Inactive {
            self.transition(ActivationState::Inactive, "media services reset");
        }

        let (reapplied, error) = match self.config.clone() {
            Some(config) => match self.gateway.apply(&config) {
                Ok(()) => {
                    info!("re-applied {} after media services reset", config);
                    (Some(config), None)
                }
                Err(e) => {
                    warn!("could not re-apply {} after media services reset: {}", config, e);
                    (None, Some(e.to_string()))
                }
            },
            None => (None, None),
        };

        self.emit(SessionEvent::MediaServicesReset { reapplied, error });
    }

    pub fn on_silence_secondary_audio_hint(&mut self, begin: bool) {
        self.emit(SessionEvent::SilenceSecondaryAudioHint { begin });
    }

    fn transition(&mut self, to: ActivationState, why: &str) {
        info!("session {} -> {} ({})", self.state, to, why);
        self.state = to;
    }

    fn emit(&mut self, event: SessionEvent) {
        let sequence = self.next_sequence();
        self.emitter.emit(EventEnvelope::new(sequence, event));
    }
}
