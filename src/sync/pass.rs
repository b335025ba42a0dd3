//! Pass orchestrator: walk both roots, plan, reconcile.

use crate::error::PassError;
use crate::events::{EventSink, PassSummary, TracingSink};
use crate::sync::executor::Reconciler;
use crate::sync::plan::{self, Plan};
use crate::sync::result::PassResult;
use crate::tree::cache::FingerprintCache;
use crate::tree::hasher::CHUNK_SIZE;
use crate::tree::walker::{Walker, WalkerConfig};
use crate::tree::Snapshot;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Options for a single pass
#[derive(Clone)]
pub struct PassOptions {
    pub dry_run: bool,
    pub chunk_size: usize,
    pub preserve_mtime: bool,
    /// Abort instead of emptying the replica when the source root is missing
    pub guard_missing_source: bool,
    pub sink: Arc<dyn EventSink>,
    pub shutdown: Option<Arc<AtomicBool>>,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            chunk_size: CHUNK_SIZE,
            preserve_mtime: true,
            guard_missing_source: false,
            sink: Arc::new(TracingSink),
            shutdown: None,
        }
    }
}

/// Fingerprint caches carried between passes, one per root
#[derive(Debug, Default)]
pub struct PassCaches {
    pub source: FingerprintCache,
    pub replica: FingerprintCache,
}

/// Composes walker, planner and reconciler into one synchronization pass
pub struct PassOrchestrator {
    source_root: PathBuf,
    replica_root: PathBuf,
    options: PassOptions,
}

impl PassOrchestrator {
    pub fn new(source_root: impl Into<PathBuf>, replica_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            replica_root: replica_root.into(),
            options: PassOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PassOptions) -> Self {
        self.options = options;
        self
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn replica_root(&self) -> &Path {
        &self.replica_root
    }

    /// Create the replica root if it does not exist yet
    pub fn ensure_replica_root(&self) -> Result<(), PassError> {
        if self.replica_root.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.replica_root).map_err(|e| PassError::ReplicaUnavailable {
            root: self.replica_root.clone(),
            source: e,
        })?;
        info!(replica = %self.replica_root.display(), "Created replica root");
        Ok(())
    }

    fn walker(&self, root: &Path, report_special: bool) -> Walker {
        Walker::with_config(
            root,
            WalkerConfig {
                chunk_size: self.options.chunk_size,
                report_special,
            },
        )
    }

    /// Walk both roots and compute the plan without applying it
    pub fn plan(&self, caches: Option<&mut PassCaches>) -> Result<(Plan, Snapshot, Snapshot), PassError> {
        self.ensure_replica_root()?;

        // Replica links and special nodes are reported so they get removed.
        let source_walker = self.walker(&self.source_root, false);
        let replica_walker = self.walker(&self.replica_root, true);
        let (source, replica) = match caches {
            Some(caches) => (
                source_walker.walk_cached(&mut caches.source)?,
                replica_walker.walk_cached(&mut caches.replica)?,
            ),
            None => (source_walker.walk()?, replica_walker.walk()?),
        };

        if !source.root_present() {
            if self.options.guard_missing_source {
                return Err(PassError::SourceMissing(self.source_root.clone()));
            }
            warn!(
                source = %self.source_root.display(),
                replica_entries = replica.len(),
                "Source root is missing; mirroring an empty tree"
            );
        }

        let plan = plan::plan(&source, &replica);
        debug!(
            source_entries = source.len(),
            replica_entries = replica.len(),
            actions = plan.len(),
            "Plan computed"
        );
        Ok((plan, source, replica))
    }

    /// Run one full pass
    ///
    /// Fails only if a root cannot be walked (or the replica root cannot be
    /// created); per-action failures are reported in the returned result.
    #[instrument(skip_all, fields(source = %self.source_root.display(), replica = %self.replica_root.display()))]
    pub fn run(&self, caches: Option<&mut PassCaches>) -> Result<PassResult, PassError> {
        let started_at = Utc::now();
        let started = Instant::now();
        let (plan, source, replica) = self.plan(caches)?;

        let mut reconciler = Reconciler::new(&self.replica_root)
            .with_sink(Arc::clone(&self.options.sink))
            .with_dry_run(self.options.dry_run)
            .with_preserve_mtime(self.options.preserve_mtime);
        if let Some(flag) = &self.options.shutdown {
            reconciler = reconciler.with_shutdown(Arc::clone(flag));
        }

        let mut result = reconciler.apply(plan);
        result.started_at = started_at;
        result.duration = started.elapsed();

        self.options.sink.pass_completed(&PassSummary {
            timestamp: Utc::now(),
            source_entries: source.len(),
            replica_entries: replica.len(),
            planned: result.planned,
            attempted: result.attempted,
            succeeded: result.succeeded,
            failed: result.failed,
            skipped: result.skipped,
            interrupted: result.interrupted,
            dry_run: result.dry_run,
            duration_ms: result.duration.as_millis() as u64,
        });

        Ok(result)
    }
}

/// Run one pass with default options
pub fn run_pass(source_root: &Path, replica_root: &Path) -> Result<PassResult, PassError> {
    PassOrchestrator::new(source_root, replica_root).run(None)
}
