//! Configuration sections.

use serde::{Deserialize, Serialize};

/// Change notifier tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Global throttle between two scans of one notifier.
    /// Default: 30
    #[serde(default = "NotifierConfig::default_min_scan_period_ms")]
    pub min_scan_period_ms: u64,
}

impl NotifierConfig {
    fn default_min_scan_period_ms() -> u64 {
        30
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            min_scan_period_ms: Self::default_min_scan_period_ms(),
        }
    }
}

/// Periods used by a subscription that does not name its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Longest delay before pending changes are delivered. 0 disables.
    /// Default: 30
    #[serde(default = "SubscriptionConfig::default_max_update_period_ms")]
    pub max_update_period_ms: u64,

    /// Heartbeat period for a full resync. 0 disables.
    /// Default: 10000
    #[serde(default = "SubscriptionConfig::default_min_update_period_ms")]
    pub min_update_period_ms: u64,
}

impl SubscriptionConfig {
    fn default_max_update_period_ms() -> u64 {
        30
    }

    fn default_min_update_period_ms() -> u64 {
        10_000
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            max_update_period_ms: Self::default_max_update_period_ms(),
            min_update_period_ms: Self::default_min_update_period_ms(),
        }
    }
}

/// Text session behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Echo every input line before its response.
    #[serde(default)]
    pub echo: bool,

    /// How often the binary ticks the notifier manager.
    /// Default: 10
    #[serde(default = "SessionConfig::default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Anchored regexes over text addresses the session may not write.
    #[serde(default)]
    pub write_protect: Vec<String>,
}

impl SessionConfig {
    fn default_tick_interval_ms() -> u64 {
        10
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            echo: false,
            tick_interval_ms: Self::default_tick_interval_ms(),
            write_protect: Vec::new(),
        }
    }
}

/// Size of the generated example mixer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixerConfig {
    /// Default: 8
    #[serde(default = "MixerConfig::default_inputs")]
    pub inputs: u16,

    /// Default: 24
    #[serde(default = "MixerConfig::default_outputs")]
    pub outputs: u16,
}

impl MixerConfig {
    fn default_inputs() -> u16 {
        8
    }

    fn default_outputs() -> u16 {
        24
    }
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            inputs: Self::default_inputs(),
            outputs: Self::default_outputs(),
        }
    }
}

/// Logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// An `EnvFilter` directive.
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
