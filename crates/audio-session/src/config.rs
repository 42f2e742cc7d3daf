//! Which session configurations the platform accepts, and the option-merge
//! policy for deactivation.

use std::collections::BTreeSet;

use sessionconf::BootstrapSession;
use sessionproto::{Category, CategoryOption, DeactivationOption, Mode, SessionConfig};

use crate::error::{SessionError, SessionResult};

/// Set by the `microphone` cargo feature.
pub const MICROPHONE_ENABLED: bool = cfg!(feature = "microphone");

/// Categories that open an input path.
pub fn category_requires_microphone(category: Category) -> bool {
    matches!(
        category,
        Category::Record | Category::PlayAndRecord | Category::MultiRoute
    )
}

/// Modes that only exist for voice or video capture.
pub fn mode_requires_microphone(mode: Mode) -> bool {
    matches!(
        mode,
        Mode::VoiceChat | Mode::VideoChat | Mode::GameChat | Mode::VideoRecording
    )
}

fn categories_for_mode(mode: Mode) -> &'static [Category] {
    use Category::*;
    match mode {
        Mode::Default => Category::ALL,
        Mode::VoiceChat | Mode::VideoChat | Mode::GameChat => &[PlayAndRecord],
        Mode::VideoRecording => &[Record, PlayAndRecord],
        Mode::Measurement => &[Playback, Record, PlayAndRecord],
        Mode::MoviePlayback | Mode::SpokenAudio | Mode::VoicePrompt => &[Playback, PlayAndRecord],
    }
}

fn categories_for_option(option: CategoryOption) -> &'static [Category] {
    use Category::*;
    match option {
        CategoryOption::MixWithOthers
        | CategoryOption::DuckOthers
        | CategoryOption::InterruptSpokenAudioAndMixWithOthers => &[Playback, PlayAndRecord, MultiRoute],
        CategoryOption::AllowBluetooth | CategoryOption::OverrideMutedMicrophoneInterruption => {
            &[Record, PlayAndRecord]
        }
        CategoryOption::AllowBluetoothA2dp
        | CategoryOption::AllowAirPlay
        | CategoryOption::DefaultToSpeaker => &[PlayAndRecord],
    }
}

/// Check a configuration against the platform's acceptance rules.
///
/// `microphone` is normally [`MICROPHONE_ENABLED`]; it is a parameter so
/// both builds can be exercised from one test binary.
pub fn validate(config: &SessionConfig, microphone: bool) -> SessionResult<()> {
    let category = config.category();
    let mode = config.mode();

    if !microphone {
        if category_requires_microphone(category) {
            return Err(SessionError::InvalidConfiguration(format!(
                "category '{}' requires microphone support, which is disabled in this build",
                category
            )));
        }
        if mode_requires_microphone(mode) {
            return Err(SessionError::InvalidConfiguration(format!(
                "mode '{}' requires microphone support, which is disabled in this build",
                mode
            )));
        }
    }

    if !categories_for_mode(mode).contains(&category) {
        return Err(SessionError::InvalidConfiguration(format!(
            "mode '{}' is not valid with category '{}'",
            mode, category
        )));
    }

    for option in config.options() {
        if !categories_for_option(*option).contains(&category) {
            return Err(SessionError::InvalidConfiguration(format!(
                "option '{}' is not valid with category '{}'",
                option, category
            )));
        }
    }

    Ok(())
}

/// Deactivation options the current configuration obliges us to send.
///
/// A session that ducked or interrupted other audio must tell those apps
/// they may resume.
pub fn mandated_deactivation_options(config: Option<&SessionConfig>) -> BTreeSet<DeactivationOption> {
    let mut mandated = BTreeSet::new();
    if let Some(config) = config {
        if config.has_option(CategoryOption::DuckOthers)
            || config.has_option(CategoryOption::InterruptSpokenAudioAndMixWithOthers)
        {
            mandated.insert(DeactivationOption::NotifyOthersOnDeactivation);
        }
    }
    mandated
}

/// Union of what the caller asked for and what the category mandates.
pub fn merge_deactivation_options(
    requested: &BTreeSet<DeactivationOption>,
    current: Option<&SessionConfig>,
) -> BTreeSet<DeactivationOption> {
    requested
        .union(&mandated_deactivation_options(current))
        .copied()
        .collect()
}

/// Parse a list of option names, failing on the first unrecognised one.
pub fn parse_category_options<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> SessionResult<BTreeSet<CategoryOption>> {
    names
        .into_iter()
        .map(|name| {
            name.parse::<CategoryOption>()
                .map_err(|e| SessionError::InvalidOption(e.to_string()))
        })
        .collect()
}

/// Parse deactivation option names, failing on the first unrecognised one.
pub fn parse_deactivation_options<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> SessionResult<BTreeSet<DeactivationOption>> {
    names
        .into_iter()
        .map(|name| {
            name.parse::<DeactivationOption>()
                .map_err(|e| SessionError::InvalidOption(e.to_string()))
        })
        .collect()
}

/// Build the startup configuration named in the config file, if any.
pub fn from_bootstrap(bootstrap: &BootstrapSession) -> SessionResult<Option<SessionConfig>> {
    let Some(category) = bootstrap.category.as_deref() else {
        return Ok(None);
    };

    let category: Category = category
        .parse()
        .map_err(|e: sessionproto::UnknownName| SessionError::InvalidConfiguration(e.to_string()))?;
    let mode: Mode = match bootstrap.mode.as_deref() {
        Some(mode) => mode
            .parse()
            .map_err(|e: sessionproto::UnknownName| SessionError::InvalidConfiguration(e.to_string()))?,
        None => Mode::Default,
    };
    let options = parse_category_options(bootstrap.options.iter().map(String::as_str))?;

    Ok(Some(SessionConfig::new(category, mode, options)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(category: Category, mode: Mode, options: &[CategoryOption]) -> SessionConfig {
        SessionConfig::new(category, mode, options.iter().copied())
    }

    #[test]
    fn plain_playback_is_valid() {
        assert!(validate(&config(Category::Playback, Mode::Default, &[]), false).is_ok());
    }

    #[test]
    fn every_category_accepts_default_mode_with_microphone() {
        for category in Category::ALL {
            assert!(validate(&config(*category, Mode::Default, &[]), true).is_ok());
        }
    }

    #[test]
    fn voice_chat_needs_play_and_record() {
        let err = validate(&config(Category::Playback, Mode::VoiceChat, &[]), true).unwrap_err();
        assert!(matches!(err, SessionError::InvalidConfiguration(_)));
        assert!(validate(&config(Category::PlayAndRecord, Mode::VoiceChat, &[]), true).is_ok());
    }

    #[test]
    fn microphone_gate_rejects_capture() {
        let err = validate(&config(Category::PlayAndRecord, Mode::Default, &[]), false).unwrap_err();
        assert!(err.to_string().contains("microphone"));

        let err = validate(&config(Category::Record, Mode::Default, &[]), false).unwrap_err();
        assert!(matches!(err, SessionError::InvalidConfiguration(_)));
    }

    #[test]
    fn default_to_speaker_only_for_play_and_record() {
        let err = validate(
            &config(Category::Playback, Mode::Default, &[CategoryOption::DefaultToSpeaker]),
            true,
        )
        .unwrap_err();
        assert!(err.to_string().contains("defaultToSpeaker"));
    }

    #[test]
    fn ambient_takes_no_mixing_options() {
        let result = validate(
            &config(Category::Ambient, Mode::Default, &[CategoryOption::MixWithOthers]),
            true,
        );
        assert!(result.is_err());
    }

    #[test]
    fn ducking_mandates_notify_others() {
        let ducking = config(Category::Playback, Mode::SpokenAudio, &[CategoryOption::DuckOthers]);
        let merged = merge_deactivation_options(&BTreeSet::new(), Some(&ducking));
        assert!(merged.contains(&DeactivationOption::NotifyOthersOnDeactivation));

        let plain = config(Category::Playback, Mode::Default, &[]);
        assert!(merge_deactivation_options(&BTreeSet::new(), Some(&plain)).is_empty());
        assert!(merge_deactivation_options(&BTreeSet::new(), None).is_empty());
    }

    #[test]
    fn requested_options_are_never_dropped() {
        let requested: BTreeSet<_> = [DeactivationOption::NotifyOthersOnDeactivation].into();
        let plain = config(Category::Playback, Mode::Default, &[]);
        assert_eq!(merge_deactivation_options(&requested, Some(&plain)), requested);
    }

    #[test]
    fn unknown_option_name_is_invalid_option() {
        let err = parse_category_options(["mixWithOthers", "louder"]).unwrap_err();
        assert!(matches!(err, SessionError::InvalidOption(_)));

        let err = parse_deactivation_options(["mixWithOthers"]).unwrap_err();
        assert!(matches!(err, SessionError::InvalidOption(_)));
    }

    #[test]
    fn bootstrap_session() {
        let bootstrap = BootstrapSession {
            category: Some("playback".to_string()),
            mode: Some("spokenAudio".to_string()),
            options: vec!["duckOthers".to_string()],
        };
        let config = from_bootstrap(&bootstrap).unwrap().unwrap();
        assert_eq!(config.category(), Category::Playback);
        assert_eq!(config.mode(), Mode::SpokenAudio);
        assert!(config.has_option(CategoryOption::DuckOthers));

        assert_eq!(from_bootstrap(&BootstrapSession::default()).unwrap(), None);
    }

    #[test]
    fn bootstrap_with_bad_category() {
        let bootstrap = BootstrapSession {
            category: Some("karaoke".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            from_bootstrap(&bootstrap),
            Err(SessionError::InvalidConfiguration(_))
        ));
    }
}
