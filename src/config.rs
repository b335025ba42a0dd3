//! Configuration System
//!
//! Layered configuration built with the `config` crate. Precedence, lowest to
//! highest: built-in defaults, the global config file, an explicit `--config`
//! file, `REPLICATE_*` environment variables. CLI flags are applied on top by
//! the binary. The sync interval is not a setting: it always comes from the
//! command line.

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::env::ENV_PREFIX;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplicateConfig {
    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the synchronization engine and scheduler
///
/// Unknown keys are rejected, so a stray `interval` here fails loudly instead
/// of being ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncSettings {
    /// Read size when hashing files
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Reuse fingerprints across passes while size and mtime are unchanged
    #[serde(default)]
    pub fingerprint_cache: bool,

    /// Fail the pass instead of emptying the replica when the source root is missing
    #[serde(default)]
    pub guard_missing_source: bool,

    /// Copy the source modification time onto replica files
    #[serde(default = "default_true")]
    pub preserve_mtime: bool,
}

fn default_chunk_size() -> usize {
    crate::tree::hasher::CHUNK_SIZE
}

fn default_true() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            fingerprint_cache: false,
            guard_missing_source: false,
            preserve_mtime: true,
        }
    }
}

impl SyncSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sync.chunk_size".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl ReplicateConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sync.validate()?;
        self.logging.validate().map_err(|e| ConfigError::InvalidValue {
            key: "logging".to_string(),
            message: e.to_string(),
        })
    }
}

fn interval_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+)([smhdSMHD])$").expect("interval pattern is valid"))
}

/// Parse a sync interval such as `30s`, `5m`, `12H` or `1d`
///
/// The unit letter is case-insensitive. Zero and values that overflow a
/// `Duration` are rejected.
pub fn parse_interval(value: &str) -> Result<Duration, ConfigError> {
    let trimmed = value.trim();
    let captures = interval_pattern()
        .captures(trimmed)
        .ok_or_else(|| ConfigError::InvalidInterval(value.to_string()))?;

    let amount: u64 = captures[1]
        .parse()
        .map_err(|_| ConfigError::InvalidInterval(value.to_string()))?;
    if amount == 0 {
        return Err(ConfigError::NonPositiveInterval(value.to_string()));
    }

    let unit_seconds = match captures[2].to_ascii_lowercase().as_str() {
        "s" => 1,
        "m" => 60,
        "h" => 3_600,
        _ => 86_400,
    };

    amount
        .checked_mul(unit_seconds)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::InvalidInterval(value.to_string()))
}

/// Human-readable rendering of an interval for startup logs
pub fn describe_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    let (amount, unit) = if secs % 86_400 == 0 {
        (secs / 86_400, "day")
    } else if secs % 3_600 == 0 {
        (secs / 3_600, "hour")
    } else if secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if amount == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", amount, unit)
    }
}
