//! Core type definitions shared across the mirror engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// BLAKE3 digest of a file's byte content
pub type Fingerprint = [u8; 32];

/// Kind of filesystem node tracked by a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    /// Symbolic link, FIFO, socket or device node; never mirrored
    Other,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Directory => write!(f, "directory"),
            EntryKind::Other => write!(f, "other"),
        }
    }
}

/// Render a fingerprint as lowercase hex for logs and JSON output
pub fn fingerprint_hex(fingerprint: &Fingerprint) -> String {
    hex::encode(fingerprint)
}
