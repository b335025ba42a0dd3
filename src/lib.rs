//! Replicate: One-Way Directory Mirroring
//!
//! Keeps a replica directory identical to a source directory. Each pass walks
//! both trees, fingerprints file content with BLAKE3, plans the minimal set of
//! create, copy and delete actions, and applies them in dependency order.

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod scheduler;
pub mod sync;
pub mod tree;
pub mod types;

pub use error::{PassError, ReplicateError};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use sync::{plan, run_pass, Action, Plan, PassResult};
pub use tree::{Snapshot, Walker};
