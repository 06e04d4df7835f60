// src/utils/config.rs
//! Layered configuration
//!
//! Sources are merged in order, later sources winning:
//!
//! 1. Built-in defaults
//! 2. Optional `feed-archiver.{toml,yaml,json}` in the working directory
//!    (or an explicit path passed to [`AppConfig::load_from`])
//! 3. Environment variables, e.g. `FEED_ARCHIVER_ARCHIVER__MAX_MESSAGES=500`

use crate::recording::compressor::CompressionLevel;
use crate::utils::errors::{ArchiveError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_NAME: &str = "feed-archiver";
const ENV_PREFIX: &str = "FEED_ARCHIVER";

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub archiver: ArchiverConfig,
    pub sink: SinkConfig,
    pub replay: ReplayConfig,
    pub observability: ObservabilityConfig,
}

/// Capture and export behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiverConfig {
    /// Start capturing immediately
    pub enabled: bool,

    /// Live buffer size that triggers a synchronous export
    pub max_messages: usize,

    /// Run the periodic export timer while enabled
    pub auto_export: bool,

    /// Keep a redacted copy of the decoded message next to the payload
    pub include_decoded: bool,

    /// Periodic export interval (milliseconds)
    pub export_interval_ms: u64,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_messages: 10_000,
            auto_export: false,
            include_decoded: false,
            export_interval_ms: 5 * 60 * 1000,
        }
    }
}

impl ArchiverConfig {
    pub fn export_interval(&self) -> Duration {
        Duration::from_millis(self.export_interval_ms)
    }

    /// Reject values that would make the store or scheduler degenerate
    pub fn validate(&self) -> Result<()> {
        if self.max_messages == 0 {
            return Err(ArchiveError::ConfigError(
                "max_messages must be at least 1".to_string(),
            ));
        }
        if self.export_interval_ms == 0 {
            return Err(ArchiveError::ConfigError(
                "export_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Directory sink settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Directory export documents are written to
    pub output_dir: PathBuf,

    /// zstd-compress documents (`.json.zst`)
    pub compress: bool,

    /// `fast`, `balanced` or `best`; only used when `compress` is set
    pub compression_level: CompressionLevel,

    /// SQLite index file name, relative to `output_dir`
    pub index_db: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("archives"),
            compress: false,
            compression_level: CompressionLevel::default(),
            index_db: "exports.db".to_string(),
        }
    }
}

/// Replay defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Playback speed multiplier (1.0 = original cadence)
    pub speed: f64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { speed: 1.0 }
    }
}

/// Logging and metrics settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,

    /// Prometheus scrape address, e.g. `127.0.0.1:9100`
    pub metrics_addr: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_addr: None,
        }
    }
}

impl AppConfig {
    /// Load from the default file name (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::build(File::with_name(DEFAULT_CONFIG_NAME).required(false))
    }

    /// Load from an explicit file and the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::build(File::from(path.as_ref()).required(true))
    }

    fn build<S>(file: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ArchiveError::ConfigError(format!("Failed to load config: {}", e)))?;

        let config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| ArchiveError::ConfigError(format!("Invalid config: {}", e)))?;

        config.archiver.validate()?;

        if !(config.replay.speed.is_finite() && config.replay.speed > 0.0) {
            return Err(ArchiveError::ConfigError(format!(
                "replay.speed must be positive, got {}",
                config.replay.speed
            )));
        }

        Ok(config)
    }
}
