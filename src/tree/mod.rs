//! Filesystem snapshots
//!
//! Walks a directory tree into an immutable [`Snapshot`] of every file and
//! directory beneath a root, each file carrying a content fingerprint.

pub mod cache;
pub mod hasher;
pub mod path;
pub mod snapshot;
pub mod walker;

pub use cache::FingerprintCache;
pub use snapshot::{Entry, Snapshot};
pub use walker::{Walker, WalkerConfig};
