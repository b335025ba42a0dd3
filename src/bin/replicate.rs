//! Replicate CLI Binary
//!
//! Mirrors a source directory into a replica directory once per interval.

use clap::Parser;
use replicate::cli::Cli;
use replicate::config::{describe_interval, ConfigLoader};
use replicate::error::ReplicateError;
use replicate::events::TracingSink;
use replicate::logging::init_logging;
use replicate::scheduler::{Scheduler, SchedulerConfig, TickOutcome};
use replicate::sync::PassOptions;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{}", e);
            eprintln!("replicate: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn run(cli: &Cli) -> Result<i32, ReplicateError> {
    let args = cli.validate()?;
    let mut config = ConfigLoader::load(cli.config.as_deref())?;
    args.apply_to(cli, &mut config);
    config.validate()?;

    init_logging(&config.logging)?;

    info!(
        source = %args.source.display(),
        replica = %args.replica.display(),
        log_file = %args.log_file.display(),
        dry_run = cli.dry_run,
        "Replicate starting"
    );
    info!("Sync interval set to {}", describe_interval(args.interval));

    let scheduler = Scheduler::new(SchedulerConfig {
        source_root: args.source.clone(),
        replica_root: args.replica.clone(),
        interval: args.interval,
        fingerprint_cache: config.sync.fingerprint_cache,
        pass: PassOptions {
            dry_run: cli.dry_run,
            chunk_size: config.sync.chunk_size,
            preserve_mtime: config.sync.preserve_mtime,
            guard_missing_source: config.sync.guard_missing_source,
            sink: Arc::new(TracingSink),
            shutdown: None,
        },
    });
    scheduler
        .install_signal_handlers()
        .map_err(ReplicateError::Signal)?;
    scheduler.start()?;

    if cli.once {
        return Ok(match scheduler.tick() {
            TickOutcome::Completed(result) => {
                match result.to_json() {
                    Ok(report) => println!("{}", report),
                    Err(e) => error!(error = %e, "Failed to render pass result"),
                }
                if result.failed == 0 {
                    0
                } else {
                    error!(failed = result.failed, "Pass completed with failures");
                    1
                }
            }
            TickOutcome::Aborted(_) => 1,
            TickOutcome::Overlapped | TickOutcome::ShuttingDown => 0,
        });
    }

    scheduler.run()?;
    info!("Replicate stopped");
    Ok(0)
}
