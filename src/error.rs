//! Error types for the replicate mirror engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Startup configuration errors. Always fatal before any pass runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "Invalid sync interval '{0}': expected <integer><s|m|h|d>, e.g. 30s, 5m, 12H, 1d"
    )]
    InvalidInterval(String),

    #[error("Sync interval must be positive, got '{0}'")]
    NonPositiveInterval(String),

    #[error("Source and replica must be different paths: {0:?}")]
    SameRoots(PathBuf),

    #[error("Replica {replica:?} and source {source_root:?} must not be nested inside each other")]
    NestedRoots {
        source_root: PathBuf,
        replica: PathBuf,
    },

    #[error("Invalid log file {0:?}: use the .log extension")]
    InvalidLogFile(PathBuf),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}

/// Failure while hashing a single file
#[derive(Debug, Error)]
#[error("Failed to fingerprint {path:?}: {source}")]
pub struct FingerprintError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Failure to produce a snapshot for one side of a pass
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("Root {root:?} is unavailable: {source}")]
    RootUnavailable {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Root {root:?} is not a directory")]
    NotADirectory { root: PathBuf },

    #[error("Directory {path:?} under {root:?} could not be listed: {source}")]
    Incomplete {
        root: PathBuf,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Pass-level failure. The pass is aborted but the scheduler keeps running.
#[derive(Debug, Error)]
pub enum PassError {
    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error("Replica root {root:?} could not be created: {source}")]
    ReplicaUnavailable {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Source root {0:?} does not exist; refusing to empty the replica")]
    SourceMissing(PathBuf),
}

/// Classification of a failed (or skipped) reconciliation action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionErrorKind {
    NotFound,
    PermissionDenied,
    AlreadyExists,
    DirectoryNotEmpty,
    StorageFull,
    Other,
    /// Not attempted because an action it depends on failed
    DependencyFailed,
}

impl ActionErrorKind {
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ActionErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => ActionErrorKind::PermissionDenied,
            io::ErrorKind::AlreadyExists => ActionErrorKind::AlreadyExists,
            _ => Self::from_raw_os_error(err),
        }
    }

    /// errno / Win32 codes for the cases matched by raw value
    fn from_raw_os_error(err: &io::Error) -> Self {
        match err.raw_os_error() {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Some(39) => ActionErrorKind::DirectoryNotEmpty,
            #[cfg(any(
                target_os = "macos",
                target_os = "ios",
                target_os = "freebsd",
                target_os = "netbsd",
                target_os = "openbsd",
                target_os = "dragonfly"
            ))]
            Some(66) => ActionErrorKind::DirectoryNotEmpty,
            #[cfg(unix)]
            Some(28) => ActionErrorKind::StorageFull,
            #[cfg(windows)]
            Some(145) => ActionErrorKind::DirectoryNotEmpty,
            #[cfg(windows)]
            Some(112) => ActionErrorKind::StorageFull,
            _ => ActionErrorKind::Other,
        }
    }
}

impl fmt::Display for ActionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionErrorKind::NotFound => "not_found",
            ActionErrorKind::PermissionDenied => "permission_denied",
            ActionErrorKind::AlreadyExists => "already_exists",
            ActionErrorKind::DirectoryNotEmpty => "directory_not_empty",
            ActionErrorKind::StorageFull => "storage_full",
            ActionErrorKind::Other => "other",
            ActionErrorKind::DependencyFailed => "dependency_failed",
        };
        f.write_str(label)
    }
}

/// Failure of one filesystem operation during reconciliation
#[derive(Debug, Error)]
#[error("{operation} {path:?} failed ({kind}): {source}")]
pub struct ActionError {
    pub kind: ActionErrorKind,
    pub operation: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl ActionError {
    pub fn new(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            kind: ActionErrorKind::from_io(&source),
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Logging initialization failure
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log {field}: {value}")]
    Invalid { field: &'static str, value: String },

    #[error("Failed to open log file {path:?}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to install log subscriber: {0}")]
    Install(String),
}

/// Top-level error surfaced by the binary
#[derive(Debug, Error)]
pub enum ReplicateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pass(#[from] PassError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("Failed to install shutdown handler: {0}")]
    Signal(#[source] io::Error),
}

impl ReplicateError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ReplicateError::Config(_) => 2,
            _ => 1,
        }
    }
}
