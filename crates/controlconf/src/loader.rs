//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, ControlConfig};
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

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/controlplane/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("controlplane/config.toml");
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

    let local = PathBuf::from("controlplane.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<ControlConfig, ConfigError> {
    let mut config = ControlConfig::default();
    layer_file(&mut config, path)?;
    Ok(config)
}

/// Layer a TOML file over `config`. Only keys present in the file change.
pub fn layer_file(config: &mut ControlConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

fn period(table: &toml::Table, key: &str, path: &Path) -> Result<Option<u64>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_integer()
            .and_then(|i| u64::try_from(i).ok())
            .map(Some)
            .ok_or_else(|| ConfigError::Parse {
                path: path.to_path_buf(),
                message: format!("{} must be a non-negative integer", key),
            }),
    }
}

fn count(table: &toml::Table, key: &str, path: &Path) -> Result<Option<u16>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_integer()
            .and_then(|i| u16::try_from(i).ok())
            .filter(|n| *n > 0)
            .map(Some)
            .ok_or_else(|| ConfigError::Parse {
                path: path.to_path_buf(),
                message: format!("{} must be between 1 and {}", key, u16::MAX),
            }),
    }
}

/// Parse config from TOML string.
pub(crate) fn parse_toml(contents: &str, path: &Path) -> Result<ControlConfig, ConfigError> {
    let mut config = ControlConfig::default();
    apply_toml(&mut config, contents, path)?;
    Ok(config)
}

fn apply_toml(config: &mut ControlConfig, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(notifier) = table.get("notifier").and_then(|v| v.as_table()) {
        if let Some(v) = period(notifier, "min_scan_period_ms", path)? {
            config.notifier.min_scan_period_ms = v;
        }
    }

    if let Some(subscription) = table.get("subscription").and_then(|v| v.as_table()) {
        if let Some(v) = period(subscription, "max_update_period_ms", path)? {
            config.subscription.max_update_period_ms = v;
        }
        if let Some(v) = period(subscription, "min_update_period_ms", path)? {
            config.subscription.min_update_period_ms = v;
        }
    }

    if let Some(session) = table.get("session").and_then(|v| v.as_table()) {
        if let Some(v) = session.get("echo").and_then(|v| v.as_bool()) {
            config.session.echo = v;
        }
        if let Some(v) = period(session, "tick_interval_ms", path)? {
            config.session.tick_interval_ms = v;
        }
        if let Some(patterns) = session.get("write_protect").and_then(|v| v.as_array()) {
            config.session.write_protect = patterns
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect();
        }
    }

    if let Some(mixer) = table.get("mixer").and_then(|v| v.as_table()) {
        if let Some(v) = count(mixer, "inputs", path)? {
            config.mixer.inputs = v;
        }
        if let Some(v) = count(mixer, "outputs", path)? {
            config.mixer.outputs = v;
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.telemetry.log_level = v.to_string();
        }
    }

    Ok(())
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut ControlConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Apply overrides read through `lookup` instead of the process environment.
pub fn apply_overrides_from<F>(config: &mut ControlConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut number = |key: &str, target: &mut u64| {
        if let Some(v) = lookup(key).and_then(|v| v.trim().parse().ok()) {
            *target = v;
            sources.env_overrides.push(key.to_string());
        }
    };
    number("CONTROLPLANE_MIN_SCAN_PERIOD_MS", &mut config.notifier.min_scan_period_ms);
    number("CONTROLPLANE_MAX_UPDATE_PERIOD_MS", &mut config.subscription.max_update_period_ms);
    number("CONTROLPLANE_MIN_UPDATE_PERIOD_MS", &mut config.subscription.min_update_period_ms);
    number("CONTROLPLANE_TICK_INTERVAL_MS", &mut config.session.tick_interval_ms);

    if let Some(v) = lookup("CONTROLPLANE_ECHO") {
        config.session.echo = matches!(v.trim(), "1" | "true" | "yes" | "on");
        sources.env_overrides.push("CONTROLPLANE_ECHO".to_string());
    }

    for (key, target) in [
        ("CONTROLPLANE_INPUTS", &mut config.mixer.inputs),
        ("CONTROLPLANE_OUTPUTS", &mut config.mixer.outputs),
    ] {
        if let Some(n) = lookup(key).and_then(|v| v.trim().parse::<u16>().ok()).filter(|n| *n > 0) {
            *target = n;
            sources.env_overrides.push(key.to_string());
        }
    }

    if let Some(v) = lookup("CONTROLPLANE_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("CONTROLPLANE_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_discover_config_files() {
        // Just verify it doesn't panic
        let _files = discover_config_files();
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
[notifier]
min_scan_period_ms = 50
"#;
        let config = parse_toml(toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.notifier.min_scan_period_ms, 50);
        assert_eq!(config.mixer.inputs, 8);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
[notifier]
min_scan_period_ms = 20

[subscription]
max_update_period_ms = 100
min_update_period_ms = 0

[session]
echo = true
tick_interval_ms = 5
write_protect = ["/entity/.*", "/output/1/gain"]

[mixer]
inputs = 2
outputs = 4

[telemetry]
log_level = "controlplane=debug"
"#;
        let config = parse_toml(toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.notifier.min_scan_period_ms, 20);
        assert_eq!(config.subscription.max_update_period_ms, 100);
        assert_eq!(config.subscription.min_update_period_ms, 0);
        assert!(config.session.echo);
        assert_eq!(config.session.tick_interval_ms, 5);
        assert_eq!(config.session.write_protect, vec!["/entity/.*", "/output/1/gain"]);
        assert_eq!((config.mixer.inputs, config.mixer.outputs), (2, 4));
        assert_eq!(config.telemetry.log_level, "controlplane=debug");
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        let err = parse_toml("[mixer]\ninputs = 0\n", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref message, .. } if message.contains("inputs")));

        let err = parse_toml("[notifier]\nmin_scan_period_ms = -1\n", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        assert!(parse_toml("[[[", Path::new("bad.toml")).is_err());
    }

    #[test]
    fn test_later_layer_restores_defaults() {
        let mut config = parse_toml("[session]\necho = true\n[mixer]\ninputs = 4\n", Path::new("system.toml")).unwrap();
        apply_toml(&mut config, "[session]\necho = false\n", Path::new("user.toml")).unwrap();

        assert!(!config.session.echo);
        assert_eq!(config.mixer.inputs, 4);
        assert_eq!(config.mixer.outputs, 24);
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("CONTROLPLANE_MIN_SCAN_PERIOD_MS", "5"),
            ("CONTROLPLANE_ECHO", "true"),
            ("CONTROLPLANE_INPUTS", "3"),
            ("CONTROLPLANE_OUTPUTS", "zero"),
            ("RUST_LOG", "trace"),
        ]
        .into_iter()
        .collect();

        let mut config = ControlConfig::default();
        let mut sources = ConfigSources::default();
        apply_overrides_from(&mut config, &mut sources, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.notifier.min_scan_period_ms, 5);
        assert!(config.session.echo);
        assert_eq!(config.mixer.inputs, 3);
        assert_eq!(config.mixer.outputs, 24);
        assert_eq!(config.telemetry.log_level, "trace");
        assert_eq!(
            sources.env_overrides,
            vec!["CONTROLPLANE_MIN_SCAN_PERIOD_MS", "CONTROLPLANE_ECHO", "CONTROLPLANE_INPUTS", "RUST_LOG"]
        );
    }
}
