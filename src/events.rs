//! Structured events emitted by a synchronization pass.
//!
//! The engine only produces events; where they end up (console, log file) is
//! decided by the installed [`EventSink`], which by default forwards them to
//! `tracing`.

use crate::error::ActionErrorKind;
use crate::sync::plan::ActionKind;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info, warn};

/// Result of one attempted action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    /// Dry-run: the action would have been applied
    Planned,
    Failed {
        error: ActionErrorKind,
        message: String,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Succeeded => f.write_str("succeeded"),
            Outcome::Planned => f.write_str("planned"),
            Outcome::Failed { error, .. } => write!(f, "failed:{}", error),
        }
    }
}

/// One event per attempted action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEvent {
    pub timestamp: DateTime<Utc>,
    pub action: ActionKind,
    pub path: String,
    pub outcome: Outcome,
}

impl ActionEvent {
    pub fn now(action: ActionKind, path: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            path: path.into(),
            outcome,
        }
    }
}

/// One event per finished pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassSummary {
    pub timestamp: DateTime<Utc>,
    pub source_entries: usize,
    pub replica_entries: usize,
    pub planned: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub interrupted: bool,
    pub dry_run: bool,
    pub duration_ms: u64,
}

/// Receiver of pass events
pub trait EventSink: Send + Sync {
    fn action(&self, event: &ActionEvent);
    fn pass_completed(&self, summary: &PassSummary);
}

/// Forwards events to `tracing`, which the logging layer fans out to the
/// console and the log file
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn action(&self, event: &ActionEvent) {
        match &event.outcome {
            Outcome::Failed { error, message } => error!(
                event = "action",
                action = %event.action,
                path = %event.path,
                outcome = "failed",
                error_kind = %error,
                error = %message,
                "Action failed"
            ),
            outcome => info!(
                event = "action",
                action = %event.action,
                path = %event.path,
                outcome = %outcome,
                "Action applied"
            ),
        }
    }

    fn pass_completed(&self, summary: &PassSummary) {
        if summary.failed > 0 || summary.interrupted {
            warn!(
                event = "pass",
                planned = summary.planned,
                attempted = summary.attempted,
                succeeded = summary.succeeded,
                failed = summary.failed,
                skipped = summary.skipped,
                interrupted = summary.interrupted,
                dry_run = summary.dry_run,
                duration_ms = summary.duration_ms,
                "Pass completed with failures"
            );
        } else {
            info!(
                event = "pass",
                source_entries = summary.source_entries,
                replica_entries = summary.replica_entries,
                planned = summary.planned,
                attempted = summary.attempted,
                succeeded = summary.succeeded,
                dry_run = summary.dry_run,
                duration_ms = summary.duration_ms,
                "Pass completed"
            );
        }
    }
}

/// Keeps every event in memory; useful for tests and dry-run reports
#[derive(Debug, Default)]
pub struct RecordingSink {
    actions: Mutex<Vec<ActionEvent>>,
    passes: Mutex<Vec<PassSummary>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<ActionEvent> {
        self.actions.lock().clone()
    }

    pub fn passes(&self) -> Vec<PassSummary> {
        self.passes.lock().clone()
    }
}

impl EventSink for RecordingSink {
    fn action(&self, event: &ActionEvent) {
        self.actions.lock().push(event.clone());
    }

    fn pass_completed(&self, summary: &PassSummary) {
        self.passes.lock().push(summary.clone());
    }
}
