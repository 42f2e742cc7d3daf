//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, HostConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli). Only existing
/// files are returned.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/audio-session/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("audio-session/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("audio-session.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a single TOML file.
pub fn load_from_file(path: &Path) -> Result<HostConfig, ConfigError> {
    config_from_table(read_table(path)?, path)
}

/// Load and merge several files, later files winning key by key.
///
/// Merging happens on the raw TOML tables, so a key a later file sets is
/// taken even when it spells out the compiled default.
pub fn load_merged(paths: &[PathBuf]) -> Result<HostConfig, ConfigError> {
    let mut merged = toml::Table::new();
    for path in paths {
        let table = read_table(path)?;
        // Surface type errors against the file that caused them
        config_from_table(table.clone(), path)?;
        merge_tables(&mut merged, table);
    }

    let origin = paths.last().map(PathBuf::as_path).unwrap_or(Path::new("<defaults>"));
    config_from_table(merged, origin)
}

fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    contents.parse::<toml::Table>().map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn config_from_table(table: toml::Table, path: &Path) -> Result<HostConfig, ConfigError> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Overlay `overlay` onto `base`. Sections merge key by key, except
/// `[session]`, which a later file replaces as a whole.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(section) if key != "session" => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_tables(existing, section),
                _ => {
                    base.insert(key, toml::Value::Table(section));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut HostConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |name| env::var(name).ok());
}

fn apply_overrides_from(
    config: &mut HostConfig,
    sources: &mut ConfigSources,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("AUDIO_SESSION_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("AUDIO_SESSION_LOG_LEVEL".to_string());
    }
    // RUST_LOG wins over our own variable, same as every other tracing binary
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }

    if let Some(v) = lookup("AUDIO_SESSION_AUTO_RESUME") {
        if let Some(enabled) = parse_bool(&v) {
            config.policy.auto_resume = enabled;
            sources.env_overrides.push("AUDIO_SESSION_AUTO_RESUME".to_string());
        }
    }

    if let Some(v) = lookup("AUDIO_SESSION_EVENT_BUFFER") {
        if let Ok(buffer) = v.parse::<usize>() {
            if buffer > 0 {
                config.events.buffer = buffer;
                sources.env_overrides.push("AUDIO_SESSION_EVENT_BUFFER".to_string());
            }
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[policy]\nauto_resume = false\n").unwrap();

        let config = load_from_file(file.path()).unwrap();
        assert!(!config.policy.auto_resume);
        assert_eq!(config.events.buffer, 64);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_load_session_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[session]\ncategory = \"playAndRecord\"\nmode = \"voiceChat\"\noptions = [\"allowBluetooth\", \"defaultToSpeaker\"]\n"
        )
        .unwrap();

        let config = load_from_file(file.path()).unwrap();
        assert_eq!(config.session.category.as_deref(), Some("playAndRecord"));
        assert_eq!(config.session.mode.as_deref(), Some("voiceChat"));
        assert_eq!(config.session.options.len(), 2);
    }

    #[test]
    fn test_parse_error_names_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[events\nbuffer = ").unwrap();

        let err = load_from_file(file.path()).unwrap_err();
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, file.path()),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = load_from_file(Path::new("/nonexistent/audio-session.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_cli_path_is_discovered() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let files = discover_config_files_with_override(Some(file.path()));
        assert_eq!(files.last().map(PathBuf::as_path), Some(file.path()));
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_merge_keeps_untouched_keys() {
        let system = write_config("[events]\nbuffer = 16\n[telemetry]\nlog_level = \"debug\"\n");
        let user = write_config("[policy]\nauto_resume = false\n");

        let merged = load_merged(&[system.path().to_path_buf(), user.path().to_path_buf()]).unwrap();
        assert_eq!(merged.events.buffer, 16);
        assert_eq!(merged.telemetry.log_level, "debug");
        assert!(!merged.policy.auto_resume);
    }

    #[test]
    fn test_merge_later_file_can_restore_default() {
        let system = write_config("[policy]\nauto_resume = false\n[events]\nbuffer = 16\n");
        let user = write_config("[policy]\nauto_resume = true\n[events]\nbuffer = 64\n");

        let merged = load_merged(&[system.path().to_path_buf(), user.path().to_path_buf()]).unwrap();
        assert!(merged.policy.auto_resume);
        assert_eq!(merged.events.buffer, 64);
    }

    #[test]
    fn test_merge_replaces_whole_session() {
        let system = write_config("[session]\ncategory = \"playback\"\nmode = \"spokenAudio\"\n");
        let user = write_config("[session]\ncategory = \"ambient\"\n");

        let merged = load_merged(&[system.path().to_path_buf(), user.path().to_path_buf()]).unwrap();
        assert_eq!(merged.session.category.as_deref(), Some("ambient"));
        assert_eq!(merged.session.mode, None);
    }

    #[test]
    fn test_merge_reports_offending_file() {
        let good = write_config("[events]\nbuffer = 16\n");
        let bad = write_config("[policy]\nauto_resume = \"sometimes\"\n");

        let err = load_merged(&[good.path().to_path_buf(), bad.path().to_path_buf()]).unwrap_err();
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, bad.path()),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_merge_of_nothing_is_default() {
        assert_eq!(load_merged(&[]).unwrap(), HostConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("AUDIO_SESSION_LOG_LEVEL", "warn"),
            ("AUDIO_SESSION_AUTO_RESUME", "off"),
            ("AUDIO_SESSION_EVENT_BUFFER", "8"),
        ]
        .into_iter()
        .collect();

        let mut config = HostConfig::default();
        let mut sources = ConfigSources::default();
        apply_overrides_from(&mut config, &mut sources, |name| {
            vars.get(name).map(|v| v.to_string())
        });

        assert_eq!(config.telemetry.log_level, "warn");
        assert!(!config.policy.auto_resume);
        assert_eq!(config.events.buffer, 8);
        assert_eq!(sources.env_overrides.len(), 3);
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = HostConfig::default();
        let mut sources = ConfigSources::default();
        apply_overrides_from(&mut config, &mut sources, |name| match name {
            "AUDIO_SESSION_AUTO_RESUME" => Some("maybe".to_string()),
            "AUDIO_SESSION_EVENT_BUFFER" => Some("0".to_string()),
            _ => None,
        });

        assert!(config.policy.auto_resume);
        assert_eq!(config.events.buffer, 64);
        assert!(sources.env_overrides.is_empty());
    }
}
