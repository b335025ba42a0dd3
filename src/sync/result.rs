use crate::error::ActionErrorKind;
use crate::sync::plan::ActionKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One action that failed or was skipped because a prerequisite failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassFailure {
    pub path: String,
    pub action: ActionKind,
    pub error: ActionErrorKind,
    pub message: String,
}

/// Aggregate outcome of one pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassResult {
    /// When the pass began; the orchestrator stamps this before walking
    pub started_at: DateTime<Utc>,
    pub planned: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<PassFailure>,
    /// Shutdown was requested before every action could run
    pub interrupted: bool,
    pub dry_run: bool,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl PassResult {
    pub fn new(planned: usize, dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            planned,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            failures: Vec::new(),
            interrupted: false,
            dry_run,
            duration: Duration::ZERO,
        }
    }

    /// No failed or skipped actions, and the pass was not interrupted
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.interrupted
    }

    pub fn failures_for(&self, action: ActionKind) -> impl Iterator<Item = &PassFailure> {
        self.failures.iter().filter(move |f| f.action == action)
    }

    /// Machine-readable report, as printed by `replicate --once`
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
