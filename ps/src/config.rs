//! pillsync configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use varkit::Language;

use crate::surface::SelectionTiming;
use crate::sync::{PinTiming, SyncOptions};

/// Main pillsync configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Template language used to resolve pill values
    pub language: Language,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Template catalog (JSON) used by the CLI
    pub catalog: Option<PathBuf>,

    /// Editing surface timings
    pub editor: EditorConfig,

    /// Cross-window channel settings
    pub sync: SyncConfig,

    /// Pinned popout refocus timings
    pub pin: PinConfig,

    /// Persisted store location
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .pillsync.yml
        let local_config = PathBuf::from(".pillsync.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/pillsync/pillsync.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("pillsync").join("pillsync.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Editing surface timings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Same pill is not auto-selected twice within this window
    #[serde(rename = "auto-select-guard-ms")]
    pub auto_select_guard_ms: u64,

    /// Auto-select is suppressed this long after a double click
    #[serde(rename = "auto-select-suppress-ms")]
    pub auto_select_suppress_ms: u64,

    /// Delay before a single click selects the whole pill
    #[serde(rename = "click-select-delay-ms")]
    pub click_select_delay_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            auto_select_guard_ms: 200,
            auto_select_suppress_ms: 600,
            click_select_delay_ms: 220,
        }
    }
}

impl EditorConfig {
    pub fn timing(&self) -> SelectionTiming {
        SelectionTiming {
            auto_select_guard: Duration::from_millis(self.auto_select_guard_ms),
            auto_select_suppress: Duration::from_millis(self.auto_select_suppress_ms),
            click_select_delay: Duration::from_millis(self.click_select_delay_ms),
        }
    }
}

/// Cross-window channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Channel topic shared by every window of the origin
    pub topic: String,

    /// Messages buffered per subscriber before the oldest are dropped
    pub capacity: usize,

    /// Key persisted focus and pin state by template id
    #[serde(rename = "namespace-by-template")]
    pub namespace_by_template: bool,

    /// Drop snapshots older than the last one seen from the same sender
    #[serde(rename = "discard-stale")]
    pub discard_stale: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            topic: crate::sync::DEFAULT_TOPIC.to_string(),
            capacity: crate::sync::DEFAULT_CHANNEL_CAPACITY,
            namespace_by_template: true,
            discard_stale: true,
        }
    }
}

impl SyncConfig {
    pub fn options(&self) -> SyncOptions {
        SyncOptions {
            namespace_by_template: self.namespace_by_template,
            discard_stale: self.discard_stale,
        }
    }
}

/// Pinned popout refocus timings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    /// Delay between a focus-loss signal and the refocus attempt
    #[serde(rename = "debounce-ms")]
    pub debounce_ms: u64,

    /// No new attempt while the previous one is settling
    #[serde(rename = "throttle-ms")]
    pub throttle_ms: u64,

    /// Minimum gap between two attempts
    #[serde(rename = "min-gap-ms")]
    pub min_gap_ms: u64,

    /// Period of the focus liveness check
    #[serde(rename = "liveness-ms")]
    pub liveness_ms: u64,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            throttle_ms: 100,
            min_gap_ms: 50,
            liveness_ms: 500,
        }
    }
}

impl PinConfig {
    pub fn timing(&self) -> PinTiming {
        PinTiming {
            debounce: Duration::from_millis(self.debounce_ms.min(100)),
            throttle: Duration::from_millis(self.throttle_ms),
            min_gap: Duration::from_millis(self.min_gap_ms),
            liveness: Duration::from_millis(self.liveness_ms.max(1)),
        }
    }
}

/// Persisted store location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(rename = "store-dir")]
    pub store_dir: PathBuf,

    pub origin: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_dir: keystore::config::default_store_dir(),
            origin: keystore::DEFAULT_ORIGIN.to_string(),
        }
    }
}
