//! Logging System
//!
//! Structured logging using the `tracing` crate. Events go to the console and,
//! when a log file is configured, are appended to that file as well. The log
//! file is opened in append mode and never rotated or truncated here.

use crate::error::LoggingError;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Environment variable holding a full `EnvFilter` directive string
pub const LOG_ENV: &str = "REPLICATE_LOG";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Write events to stdout
    #[serde(default = "default_true")]
    pub console: bool,

    /// Enable colored console output (text format only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Append-only log file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            console: true,
            color: true,
            file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

fn parse_format(format: &str) -> Result<LogFormat, LoggingError> {
    match format {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(LoggingError::Invalid {
            field: "format",
            value: format!("{} (must be 'json' or 'text')", other),
        }),
    }
}

fn parse_level(level: &str) -> Result<(), LoggingError> {
    match level {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => Ok(()),
        other => Err(LoggingError::Invalid {
            field: "level",
            value: other.to_string(),
        }),
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), LoggingError> {
        parse_level(&self.level)?;
        parse_format(&self.format)?;
        Ok(())
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn console_layer(format: LogFormat, color: bool) -> BoxedLayer {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(std::io::stdout)
            .boxed(),
        LogFormat::Text => fmt::layer()
            .with_target(false)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(color)
            .with_writer(std::io::stdout)
            .boxed(),
    }
}

fn file_layer(format: LogFormat, path: &Path) -> Result<BoxedLayer, LoggingError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| LoggingError::File {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LoggingError::File {
            path: path.to_path_buf(),
            source: e,
        })?;
    let writer = Mutex::new(file);

    Ok(match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(writer)
            .boxed(),
        LogFormat::Text => fmt::layer()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false)
            .with_writer(writer)
            .boxed(),
    })
}

/// Build the level filter: `REPLICATE_LOG` wins over the configured level
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }
    parse_level(&config.level)?;
    Ok(EnvFilter::new(&config.level))
}

/// Initialize the global subscriber
///
/// Can only succeed once per process.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let format = parse_format(&config.format)?;
    let filter = build_env_filter(config)?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.console {
        layers.push(console_layer(format, config.color));
    }
    if let Some(path) = &config.file {
        layers.push(file_layer(format, path)?);
    }

    Registry::default()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))
}
