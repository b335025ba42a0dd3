//! CLI parse: clap types for the `replicate` binary plus argument validation.

use crate::config::{parse_interval, ReplicateConfig};
use crate::error::ConfigError;
use crate::tree::path::{absolutize, overlaps};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Replicate - keep a replica directory identical to a source directory
#[derive(Parser, Debug, Clone)]
#[command(name = "replicate")]
#[command(about = "Periodically mirror a source directory into a replica directory")]
#[command(version)]
pub struct Cli {
    /// Directory to mirror from
    pub source: PathBuf,

    /// Directory to mirror into (created if missing)
    pub replica: PathBuf,

    /// Interval between passes, e.g. 30s, 5m, 12h, 1d
    pub interval: String,

    /// Append-only log file, must end in .log
    pub log_file: PathBuf,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Run a single pass and exit
    #[arg(long, default_value = "false")]
    pub once: bool,

    /// Plan and report actions without touching the replica
    #[arg(long, default_value = "false")]
    pub dry_run: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Shorthand for --log-level debug
    #[arg(long, short = 'v', default_value = "false")]
    pub verbose: bool,

    /// Fail passes instead of emptying the replica when the source is missing
    #[arg(long, default_value = "false")]
    pub guard_missing_source: bool,

    /// Reuse fingerprints while a file's size and mtime are unchanged
    #[arg(long, default_value = "false")]
    pub fingerprint_cache: bool,
}

/// Arguments after validation, with both roots made absolute
#[derive(Debug, Clone)]
pub struct ValidatedArgs {
    pub source: PathBuf,
    pub replica: PathBuf,
    pub interval: Duration,
    pub log_file: PathBuf,
}

impl Cli {
    /// Check the positional arguments
    ///
    /// Rejects a malformed interval, identical or nested roots and a log file
    /// without the `.log` extension.
    pub fn validate(&self) -> Result<ValidatedArgs, ConfigError> {
        let interval = parse_interval(&self.interval)?;

        let source = absolutize(&self.source);
        let replica = absolutize(&self.replica);
        if source == replica {
            return Err(ConfigError::SameRoots(source));
        }
        if overlaps(&source, &replica) {
            return Err(ConfigError::NestedRoots {
                source_root: source,
                replica,
            });
        }

        if !has_log_extension(&self.log_file) {
            return Err(ConfigError::InvalidLogFile(self.log_file.clone()));
        }

        Ok(ValidatedArgs {
            source,
            replica,
            interval,
            log_file: absolutize(&self.log_file),
        })
    }
}

impl ValidatedArgs {
    /// Layer the command line over a loaded configuration
    ///
    /// Flags only override when given; the log file always comes from the
    /// positional argument. The interval is not part of the config and stays
    /// in `self.interval`.
    pub fn apply_to(&self, cli: &Cli, config: &mut ReplicateConfig) {
        if cli.fingerprint_cache {
            config.sync.fingerprint_cache = true;
        }
        if cli.guard_missing_source {
            config.sync.guard_missing_source = true;
        }

        if cli.verbose {
            config.logging.level = "debug".to_string();
        }
        if let Some(level) = &cli.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &cli.log_format {
            config.logging.format = format.clone();
        }
        config.logging.file = Some(self.log_file.clone());
    }
}

fn has_log_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("log"))
        .unwrap_or(false)
}
