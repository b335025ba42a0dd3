//! Periodic scheduler
//!
//! Runs one synchronization pass per interval until shutdown is requested.
//! Passes never overlap: `tick` holds the pass guard for the duration of a pass
//! and a tick that cannot take it is skipped. A pass that overruns the interval
//! makes the next tick start immediately instead of being dropped.

use crate::error::{PassError, ReplicateError};
use crate::logging::{init_logging, LoggingConfig};
use crate::sync::pass::{PassCaches, PassOptions, PassOrchestrator};
use crate::sync::result::PassResult;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Upper bound on how long the idle loop sleeps before re-checking shutdown
const POLL_SLICE: Duration = Duration::from_millis(100);

/// Scheduler configuration
#[derive(Clone)]
pub struct SchedulerConfig {
    pub source_root: PathBuf,
    pub replica_root: PathBuf,
    pub interval: Duration,
    /// Keep fingerprint caches between passes
    pub fingerprint_cache: bool,
    /// Options for every pass; the shutdown flag is replaced by the scheduler's
    pub pass: PassOptions,
}

impl SchedulerConfig {
    pub fn new(source_root: impl Into<PathBuf>, replica_root: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            source_root: source_root.into(),
            replica_root: replica_root.into(),
            interval,
            fingerprint_cache: false,
            pass: PassOptions::default(),
        }
    }
}

/// What a single tick did
#[derive(Debug)]
pub enum TickOutcome {
    /// A pass ran to completion (possibly with per-action failures)
    Completed(PassResult),
    /// The pass aborted before reconciling
    Aborted(PassError),
    /// Another pass was still running
    Overlapped,
    /// Shutdown had already been requested
    ShuttingDown,
}

/// Explicit lifecycle around repeated passes: `start`, `tick`, `stop`, `run`
pub struct Scheduler {
    orchestrator: PassOrchestrator,
    interval: Duration,
    use_cache: bool,
    /// Pass guard; the caches it protects are only touched by the running pass
    pass_guard: Mutex<PassCaches>,
    shutdown: Arc<AtomicBool>,
    started: AtomicBool,
    passes: AtomicU64,
    last_run: Mutex<Option<DateTime<Utc>>>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let options = PassOptions {
            shutdown: Some(Arc::clone(&shutdown)),
            ..config.pass
        };
        let orchestrator =
            PassOrchestrator::new(config.source_root, config.replica_root).with_options(options);

        Self {
            orchestrator,
            interval: config.interval,
            use_cache: config.fingerprint_cache,
            pass_guard: Mutex::new(PassCaches::default()),
            shutdown,
            started: AtomicBool::new(false),
            passes: AtomicU64::new(0),
            last_run: Mutex::new(None),
        }
    }

    /// Flag that stops the scheduler once set; share it with signal handlers
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Register SIGINT and SIGTERM to set the shutdown flag
    pub fn install_signal_handlers(&self) -> std::io::Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        signal_hook::flag::register(SIGINT, self.shutdown_flag())?;
        signal_hook::flag::register(SIGTERM, self.shutdown_flag())?;
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Number of ticks that ran a pass, aborted or not
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    /// When the most recent pass started
    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        *self.last_run.lock()
    }

    /// Prepare for ticking; the replica root must exist or be creatable
    pub fn start(&self) -> Result<(), PassError> {
        self.orchestrator.ensure_replica_root()?;
        self.started.store(true, Ordering::SeqCst);
        info!(
            source = %self.orchestrator.source_root().display(),
            replica = %self.orchestrator.replica_root().display(),
            interval_secs = self.interval.as_secs(),
            "Scheduler started"
        );
        Ok(())
    }

    /// Run one pass unless one is already in progress
    pub fn tick(&self) -> TickOutcome {
        if self.is_shutdown() {
            return TickOutcome::ShuttingDown;
        }

        let Some(mut caches) = self.pass_guard.try_lock() else {
            warn!("Previous pass still running; skipping this tick");
            return TickOutcome::Overlapped;
        };

        *self.last_run.lock() = Some(Utc::now());
        let pass_number = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(pass = pass_number, "Starting pass");

        let outcome = if self.use_cache {
            self.orchestrator.run(Some(&mut *caches))
        } else {
            self.orchestrator.run(None)
        };

        match outcome {
            Ok(result) => {
                if result.failed > 0 {
                    warn!(
                        pass = pass_number,
                        failed = result.failed,
                        skipped = result.skipped,
                        "Pass finished with failures"
                    );
                }
                TickOutcome::Completed(result)
            }
            Err(e) => {
                error!(pass = pass_number, error = %e, "Pass aborted; retrying next tick");
                TickOutcome::Aborted(e)
            }
        }
    }

    /// Request shutdown; the running pass stops after its current action
    pub fn stop(&self) {
        if !self.shutdown.swap(true, Ordering::SeqCst) {
            info!("Shutdown requested");
        }
    }

    /// Tick every interval until shutdown
    ///
    /// Calls `start` first if it has not been called yet.
    pub fn run(&self) -> Result<(), PassError> {
        if !self.started.load(Ordering::SeqCst) {
            self.start()?;
        }

        while !self.is_shutdown() {
            let tick_started = Instant::now();
            self.tick();
            if self.is_shutdown() {
                break;
            }

            let elapsed = tick_started.elapsed();
            match self.interval.checked_sub(elapsed) {
                Some(remaining) if !remaining.is_zero() => self.sleep(remaining),
                _ => warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    interval_secs = self.interval.as_secs(),
                    "Pass overran the interval; starting next pass immediately"
                ),
            }
        }

        self.started.store(false, Ordering::SeqCst);
        info!(passes = self.passes(), "Scheduler stopped");
        Ok(())
    }

    fn sleep(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while !self.is_shutdown() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(POLL_SLICE));
        }
    }
}

/// Mirror `source` into `replica` every `interval` until SIGINT or SIGTERM
///
/// Installs default logging to the console and `log_file` first, so this can
/// only be called once per process.
pub fn sync(source: &Path, replica: &Path, interval: Duration, log_file: &Path) -> Result<(), ReplicateError> {
    init_logging(&LoggingConfig {
        file: Some(log_file.to_path_buf()),
        ..LoggingConfig::default()
    })?;

    let scheduler = Scheduler::new(SchedulerConfig::new(source, replica, interval));
    scheduler
        .install_signal_handlers()
        .map_err(ReplicateError::Signal)?;
    scheduler.start()?;
    scheduler.run()?;
    Ok(())
}
