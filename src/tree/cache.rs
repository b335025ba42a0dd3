//! Cross-pass fingerprint cache
//!
//! Keyed by relative path; an entry is reused only while the file's size and
//! modification time are unchanged. Anything else forces a rehash.

use crate::types::Fingerprint;
use std::collections::{HashMap, HashSet};
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CachedFingerprint {
    size: u64,
    modified: SystemTime,
    fingerprint: Fingerprint,
}

/// Fingerprints remembered between passes for one root
#[derive(Debug, Default)]
pub struct FingerprintCache {
    entries: HashMap<String, CachedFingerprint>,
    seen: HashSet<String>,
    hits: u64,
    misses: u64,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a fingerprint for a file with the given size and mtime
    ///
    /// A missing mtime is always a miss.
    pub fn lookup(
        &mut self,
        relative_path: &str,
        size: u64,
        modified: Option<SystemTime>,
    ) -> Option<Fingerprint> {
        self.seen.insert(relative_path.to_string());
        let hit = match (self.entries.get(relative_path), modified) {
            (Some(cached), Some(modified)) => {
                cached.size == size && cached.modified == modified
            }
            _ => false,
        };

        if hit {
            self.hits += 1;
            self.entries.get(relative_path).map(|c| c.fingerprint)
        } else {
            self.misses += 1;
            None
        }
    }

    /// Record a freshly computed fingerprint
    pub fn store(
        &mut self,
        relative_path: &str,
        size: u64,
        modified: Option<SystemTime>,
        fingerprint: Fingerprint,
    ) {
        self.seen.insert(relative_path.to_string());
        match modified {
            Some(modified) => {
                self.entries.insert(
                    relative_path.to_string(),
                    CachedFingerprint {
                        size,
                        modified,
                        fingerprint,
                    },
                );
            }
            None => {
                self.entries.remove(relative_path);
            }
        }
    }

    /// Forget a path, e.g. after hashing it failed
    pub fn invalidate(&mut self, relative_path: &str) {
        self.entries.remove(relative_path);
    }

    /// Drop entries not touched since the previous call
    pub fn retain_seen(&mut self) {
        let seen = std::mem::take(&mut self.seen);
        self.entries.retain(|path, _| seen.contains(path));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
