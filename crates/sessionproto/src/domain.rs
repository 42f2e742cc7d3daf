//! Session vocabulary: categories, modes, option flags, routes.
//!
//! Names on the wire are the platform's lowerCamelCase spellings, so an
//! application can pass through whatever the native API calls them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A name that is not part of the recognised vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized {what} '{name}'")]
pub struct UnknownName {
    pub what: &'static str,
    pub name: String,
}

/// Generates `ALL`, `as_str`, `Display` and `FromStr` for a wire enum.
macro_rules! platform_names {
    ($ty:ident, $what:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownName;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    _ => Err(UnknownName { what: $what, name: s.to_string() }),
                }
            }
        }
    };
}

/// Platform-level classification of audio intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Ambient,
    SoloAmbient,
    Playback,
    Record,
    PlayAndRecord,
    MultiRoute,
}

platform_names!(Category, "category", {
    Ambient => "ambient",
    SoloAmbient => "soloAmbient",
    Playback => "playback",
    Record => "record",
    PlayAndRecord => "playAndRecord",
    MultiRoute => "multiRoute",
});

/// Specialisation of a category (voice processing, measurement, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    #[default]
    Default,
    GameChat,
    Measurement,
    MoviePlayback,
    SpokenAudio,
    VideoChat,
    VideoRecording,
    VoiceChat,
    VoicePrompt,
}

platform_names!(Mode, "mode", {
    Default => "default",
    GameChat => "gameChat",
    Measurement => "measurement",
    MoviePlayback => "moviePlayback",
    SpokenAudio => "spokenAudio",
    VideoChat => "videoChat",
    VideoRecording => "videoRecording",
    VoiceChat => "voiceChat",
    VoicePrompt => "voicePrompt",
});

/// Category option flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CategoryOption {
    MixWithOthers,
    DuckOthers,
    InterruptSpokenAudioAndMixWithOthers,
    AllowBluetooth,
    AllowBluetoothA2dp,
    AllowAirPlay,
    DefaultToSpeaker,
    OverrideMutedMicrophoneInterruption,
}

platform_names!(CategoryOption, "category option", {
    MixWithOthers => "mixWithOthers",
    DuckOthers => "duckOthers",
    InterruptSpokenAudioAndMixWithOthers => "interruptSpokenAudioAndMixWithOthers",
    AllowBluetooth => "allowBluetooth",
    AllowBluetoothA2dp => "allowBluetoothA2dp",
    AllowAirPlay => "allowAirPlay",
    DefaultToSpeaker => "defaultToSpeaker",
    OverrideMutedMicrophoneInterruption => "overrideMutedMicrophoneInterruption",
});

/// Flags accepted by `deactivate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeactivationOption {
    NotifyOthersOnDeactivation,
}

platform_names!(DeactivationOption, "deactivation option", {
    NotifyOthersOnDeactivation => "notifyOthersOnDeactivation",
});

/// Flags the platform attaches to the end of an interruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterruptionOption {
    ShouldResume,
}

platform_names!(InterruptionOption, "interruption option", {
    ShouldResume => "shouldResume",
});

/// Activation state held by the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivationState {
    #[default]
    Inactive,
    Active,
    Interrupted,
}

platform_names!(ActivationState, "activation state", {
    Inactive => "inactive",
    Active => "active",
    Interrupted => "interrupted",
});

/// Immutable description of the desired session configuration.
///
/// Constructing one does not check that the platform accepts the
/// combination; the session host validates before applying.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    category: Category,
    #[serde(default)]
    mode: Mode,
    #[serde(default)]
    options: BTreeSet<CategoryOption>,
}

impl SessionConfig {
    pub fn new(
        category: Category,
        mode: Mode,
        options: impl IntoIterator<Item = CategoryOption>,
    ) -> Self {
        Self {
            category,
            mode,
            options: options.into_iter().collect(),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn options(&self) -> &BTreeSet<CategoryOption> {
        &self.options
    }

    pub fn has_option(&self, option: CategoryOption) -> bool {
        self.options.contains(&option)
    }
}

impl fmt::Display for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.mode)?;
        if !self.options.is_empty() {
            let names: Vec<&str> = self.options.iter().map(|o| o.as_str()).collect();
            write!(f, " [{}]", names.join(", "))?;
        }
        Ok(())
    }
}

/// Kind of hardware port in a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PortType {
    BuiltInMic,
    BuiltInReceiver,
    BuiltInSpeaker,
    Headphones,
    HeadsetMic,
    LineIn,
    LineOut,
    BluetoothA2dp,
    BluetoothHfp,
    BluetoothLe,
    AirPlay,
    CarAudio,
    HdmiOutput,
    UsbAudio,
    #[serde(other)]
    Unknown,
}

/// One input or output port of the current route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDescription {
    pub port_type: PortType,
    pub name: String,
    pub uid: String,
}

impl PortDescription {
    pub fn new(port_type: PortType, name: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            port_type,
            name: name.into(),
            uid: uid.into(),
        }
    }
}

/// The active input/output hardware path. Opaque to the state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDescriptor {
    #[serde(default)]
    pub inputs: Vec<PortDescription>,
    #[serde(default)]
    pub outputs: Vec<PortDescription>,
}

impl RouteDescriptor {
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}

/// Why the platform changed the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteChangeReason {
    NewDeviceAvailable,
    OldDeviceUnavailable,
    CategoryChange,
    Override,
    WakeFromSleep,
    NoSuitableRouteForCategory,
    RouteConfigurationChange,
    #[serde(other)]
    Unknown,
}

/// Counters and state reported by `getStats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub state: ActivationState,
    pub auto_resume: bool,
    pub commands_processed: u64,
    pub events_emitted: u64,
    pub events_dropped: u64,
}
