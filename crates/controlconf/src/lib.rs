//! Configuration loading for the control plane front-ends.
//!
//! Everything here is a startup value: notifier throttles, the default
//! subscription periods, the text session's behaviour and the size of the
//! generated example mixer.
//!
//! # Usage
//!
//! ```rust,no_run
//! use controlconf::ControlConfig;
//!
//! let config = ControlConfig::load().expect("Failed to load config");
//! println!("scan period: {} ms", config.notifier.min_scan_period_ms);
//! println!("mixer: {} in / {} out", config.mixer.inputs, config.mixer.outputs);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/controlplane/config.toml` (system)
//! 2. `~/.config/controlplane/config.toml` (user)
//! 3. `./controlplane.toml` (local override) or a path given on the command line
//! 4. Environment variables (`CONTROLPLANE_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [notifier]
//! min_scan_period_ms = 30
//!
//! [subscription]
//! max_update_period_ms = 30
//! min_update_period_ms = 10000
//!
//! [session]
//! echo = false
//! tick_interval_ms = 10
//! write_protect = ["/entity/.*"]
//!
//! [mixer]
//! inputs = 8
//! outputs = 24
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use sections::{MixerConfig, NotifierConfig, SessionConfig, SubscriptionConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ControlConfig {
    #[serde(default)]
    pub notifier: NotifierConfig,

    #[serde(default)]
    pub subscription: SubscriptionConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub mixer: MixerConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl ControlConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration, with `config_path` replacing `./controlplane.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    pub fn load_with_sources() -> Result<(Self, ConfigSources), ConfigError> {
        Self::load_with_sources_from(None)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(config_path: Option<&Path>) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = ControlConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::layer_file(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        // Build TOML manually for nicer formatting
        let mut output = String::new();

        output.push_str("# Control plane configuration\n\n");

        output.push_str("[notifier]\n");
        output.push_str(&format!("min_scan_period_ms = {}\n", self.notifier.min_scan_period_ms));

        output.push_str("\n[subscription]\n");
        output.push_str(&format!(
            "max_update_period_ms = {}\n",
            self.subscription.max_update_period_ms
        ));
        output.push_str(&format!(
            "min_update_period_ms = {}\n",
            self.subscription.min_update_period_ms
        ));

        output.push_str("\n[session]\n");
        output.push_str(&format!("echo = {}\n", self.session.echo));
        output.push_str(&format!("tick_interval_ms = {}\n", self.session.tick_interval_ms));
        output.push_str("write_protect = [\n");
        for pattern in &self.session.write_protect {
            output.push_str(&format!("    {},\n", toml::Value::String(pattern.clone())));
        }
        output.push_str("]\n");

        output.push_str("\n[mixer]\n");
        output.push_str(&format!("inputs = {}\n", self.mixer.inputs));
        output.push_str(&format!("outputs = {}\n", self.mixer.outputs));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = {}\n",
            toml::Value::String(self.telemetry.log_level.clone())
        ));

        output
    }
}
