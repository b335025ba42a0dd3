//! Synchronization engine
//!
//! One pass walks source and replica into snapshots, plans the actions that
//! make the replica an exact copy of the source, and applies them in order.

pub mod executor;
pub mod pass;
pub mod plan;
pub mod result;

pub use executor::Reconciler;
pub use pass::{run_pass, PassCaches, PassOptions, PassOrchestrator};
pub use plan::{plan, Action, ActionKind, Plan};
pub use result::{PassFailure, PassResult};
