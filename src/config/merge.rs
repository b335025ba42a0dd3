//! Merge rules: built-in defaults, applied before any file or environment source.

use crate::tree::hasher::CHUNK_SIZE;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("sync.chunk_size", CHUNK_SIZE as i64)?
        .set_default("sync.fingerprint_cache", false)?
        .set_default("sync.guard_missing_source", false)?
        .set_default("sync.preserve_mtime", true)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.console", true)?
        .set_default("logging.color", true)
}
