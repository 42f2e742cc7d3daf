//! Platform notifications and the application-facing event stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::{InterruptionOption, RouteChangeReason, RouteDescriptor, SessionConfig};

/// Phase of a platform interruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterruptionPhase {
    Began,
    Ended,
}

/// An interruption as reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterruptionEvent {
    pub phase: InterruptionPhase,
    #[serde(default)]
    pub resume_options: BTreeSet<InterruptionOption>,
    pub timestamp: DateTime<Utc>,
}

impl InterruptionEvent {
    pub fn began() -> Self {
        Self {
            phase: InterruptionPhase::Began,
            resume_options: BTreeSet::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn ended(resume_options: impl IntoIterator<Item = InterruptionOption>) -> Self {
        Self {
            phase: InterruptionPhase::Ended,
            resume_options: resume_options.into_iter().collect(),
            timestamp: Utc::now(),
        }
    }

    pub fn should_resume(&self) -> bool {
        self.resume_options.contains(&InterruptionOption::ShouldResume)
    }
}

/// A route change as reported by the platform. Consumed once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteChangeEvent {
    pub reason: RouteChangeReason,
    #[serde(default)]
    pub previous_route: RouteDescriptor,
}

/// What happened to the session when an interruption ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResumeOutcome {
    /// Re-activated automatically.
    Resumed,
    /// Automatic re-activation was attempted and refused; still interrupted.
    ResumeFailed,
    /// The platform did not say the session should resume.
    NotResumed,
    /// The platform allowed resuming but auto-resume is off; the
    /// application decides whether to call `activate`.
    ResumeDeferred,
}

/// Notification delivered to the application, independent of any command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum SessionEvent {
    InterruptionBegan {
        timestamp: DateTime<Utc>,
    },
    InterruptionEnded {
        timestamp: DateTime<Utc>,
        resume_options: BTreeSet<InterruptionOption>,
        outcome: ResumeOutcome,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    RouteChanged {
        reason: RouteChangeReason,
        previous_route: RouteDescriptor,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_route: Option<RouteDescriptor>,
        session_deactivated: bool,
    },
    MediaServicesLost,
    MediaServicesReset {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reapplied: Option<SessionConfig>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    SilenceSecondaryAudioHint {
        begin: bool,
    },
}

impl SessionEvent {
    /// The `type` tag as it appears on the wire.
    pub fn type_name(&self) -> &'static str {
        match self {
            SessionEvent::InterruptionBegan { .. } => "InterruptionBegan",
            SessionEvent::InterruptionEnded { .. } => "InterruptionEnded",
            SessionEvent::RouteChanged { .. } => "RouteChanged",
            SessionEvent::MediaServicesLost => "MediaServicesLost",
            SessionEvent::MediaServicesReset { .. } => "MediaServicesReset",
            SessionEvent::SilenceSecondaryAudioHint { .. } => "SilenceSecondaryAudioHint",
        }
    }
}

/// Event as written to the event channel, stamped by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Shares one counter with command responses.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event: SessionEvent,
}

impl EventEnvelope {
    pub fn new(sequence: u64, event: SessionEvent) -> Self {
        Self {
            sequence,
            timestamp: Utc::now(),
            event,
        }
    }
}
