//! Reconciler: applies a plan to the replica tree, one action at a time.
//! Owns per-action failure handling and event emission; planning stays in `plan`.

use crate::error::{ActionError, ActionErrorKind};
use crate::events::{ActionEvent, EventSink, Outcome, TracingSink};
use crate::sync::plan::{Action, Plan};
use crate::sync::result::{PassFailure, PassResult};
use crate::tree::path::{is_descendant, join_key};
use filetime::FileTime;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Tracks failed actions so that actions depending on them are skipped
#[derive(Debug, Default)]
struct FailedPrerequisites {
    /// Directories that could not be created
    directories: Vec<String>,
    /// Paths that could not be removed
    deletions: Vec<String>,
}

impl FailedPrerequisites {
    /// Returns the failed prerequisite that blocks `action`, if any
    fn blocking(&self, action: &Action) -> Option<&str> {
        let path = action.path();

        if let Some(dir) = self.directories.iter().find(|d| is_descendant(path, d)) {
            return Some(dir.as_str());
        }

        match action {
            Action::CreateDirectory { .. } | Action::CopyOrUpdateFile { .. } => {
                self.deletions.iter().find(|p| p.as_str() == path).map(String::as_str)
            }
            Action::DeleteDirectory { .. } => self
                .deletions
                .iter()
                .find(|p| is_descendant(p, path))
                .map(String::as_str),
            Action::DeleteFile { .. } => None,
        }
    }

    fn record(&mut self, action: &Action) {
        match action {
            Action::CreateDirectory { path } => self.directories.push(path.clone()),
            Action::DeleteFile { path } | Action::DeleteDirectory { path } => {
                self.deletions.push(path.clone())
            }
            Action::CopyOrUpdateFile { .. } => {}
        }
    }
}

/// Applies planned actions against the replica root
pub struct Reconciler {
    replica_root: PathBuf,
    sink: Arc<dyn EventSink>,
    shutdown: Option<Arc<AtomicBool>>,
    dry_run: bool,
    preserve_mtime: bool,
}

impl Reconciler {
    pub fn new(replica_root: impl Into<PathBuf>) -> Self {
        Self {
            replica_root: replica_root.into(),
            sink: Arc::new(TracingSink),
            shutdown: None,
            dry_run: false,
            preserve_mtime: true,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Stop before the next action once `flag` is set
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_preserve_mtime(mut self, preserve_mtime: bool) -> Self {
        self.preserve_mtime = preserve_mtime;
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Apply every action in order
    ///
    /// A failed action never aborts the pass: it is recorded, actions that
    /// structurally depend on it are skipped, and everything else still runs.
    pub fn apply(&self, plan: Plan) -> PassResult {
        let started = Instant::now();
        let mut result = PassResult::new(plan.len(), self.dry_run);
        let mut failed = FailedPrerequisites::default();

        for action in plan {
            if self.shutdown_requested() {
                warn!(
                    remaining = result.planned - result.attempted - result.skipped,
                    "Shutdown requested, stopping pass after current action"
                );
                result.interrupted = true;
                break;
            }

            if let Some(cause) = failed.blocking(&action) {
                warn!(
                    action = %action.kind(),
                    path = %action.path(),
                    blocked_by = %cause,
                    "Skipping action because a prerequisite failed"
                );
                result.skipped += 1;
                result.failures.push(PassFailure {
                    path: action.path().to_string(),
                    action: action.kind(),
                    error: ActionErrorKind::DependencyFailed,
                    message: format!("prerequisite {} failed", cause),
                });
                failed.record(&action);
                continue;
            }

            result.attempted += 1;
            let outcome = if self.dry_run {
                Outcome::Planned
            } else {
                match self.execute(&action) {
                    Ok(()) => Outcome::Succeeded,
                    Err(e) => Outcome::Failed {
                        error: e.kind,
                        message: e.to_string(),
                    },
                }
            };

            self.sink
                .action(&ActionEvent::now(action.kind(), action.path(), outcome.clone()));

            match outcome {
                Outcome::Failed { error, message } => {
                    result.failed += 1;
                    result.failures.push(PassFailure {
                        path: action.path().to_string(),
                        action: action.kind(),
                        error,
                        message,
                    });
                    failed.record(&action);
                }
                Outcome::Succeeded | Outcome::Planned => result.succeeded += 1,
            }
        }

        result.duration = started.elapsed();
        result
    }

    fn target(&self, key: &str) -> PathBuf {
        join_key(&self.replica_root, key)
    }

    fn execute(&self, action: &Action) -> Result<(), ActionError> {
        match action {
            Action::CreateDirectory { path } => self.create_directory(&self.target(path)),
            Action::CopyOrUpdateFile { path, source } => self.copy_file(source, &self.target(path)),
            Action::DeleteFile { path } => self.delete_file(&self.target(path)),
            Action::DeleteDirectory { path } => self.delete_directory(&self.target(path)),
        }
    }

    fn create_directory(&self, target: &Path) -> Result<(), ActionError> {
        clear_special_node(target).map_err(|e| ActionError::new("remove special node", target, e))?;
        match fs::create_dir(target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists && is_real_dir(target) => {
                debug!(path = %target.display(), "Directory already exists");
                Ok(())
            }
            Err(e) => Err(ActionError::new("create directory", target, e)),
        }
    }

    fn copy_file(&self, source: &Path, target: &Path) -> Result<(), ActionError> {
        clear_special_node(target).map_err(|e| ActionError::new("remove special node", target, e))?;
        fs::copy(source, target).map_err(|e| ActionError::new("copy file", target, e))?;

        if self.preserve_mtime {
            let metadata =
                fs::metadata(source).map_err(|e| ActionError::new("read source metadata", source, e))?;
            let modified = FileTime::from_last_modification_time(&metadata);
            filetime::set_file_mtime(target, modified)
                .map_err(|e| ActionError::new("preserve timestamp", target, e))?;
        }
        Ok(())
    }

    fn delete_file(&self, target: &Path) -> Result<(), ActionError> {
        match fs::remove_file(target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %target.display(), "File already removed");
                Ok(())
            }
            Err(e) => Err(ActionError::new("delete file", target, e)),
        }
    }

    /// Removes an empty directory; never recursive
    fn delete_directory(&self, target: &Path) -> Result<(), ActionError> {
        match fs::remove_dir(target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %target.display(), "Directory already removed");
                Ok(())
            }
            Err(e) => Err(ActionError::new("delete directory", target, e)),
        }
    }
}

/// Whether `path` is a directory itself, not a link to one
fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

/// Remove a link or special node sitting at `target`
///
/// `fs::copy` and `create_dir` would otherwise write through a link to a
/// location outside the replica, or block on a FIFO.
fn clear_special_node(target: &Path) -> std::io::Result<()> {
    match fs::symlink_metadata(target) {
        Ok(metadata) if !metadata.is_file() && !metadata.is_dir() => {
            debug!(path = %target.display(), "Removing special node before writing");
            fs::remove_file(target)
        }
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
