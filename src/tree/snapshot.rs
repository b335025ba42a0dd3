//! Snapshot of one directory tree at one instant

use crate::types::{fingerprint_hex, EntryKind, Fingerprint};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One filesystem node discovered during a walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Root-relative, slash-separated key
    pub relative_path: String,
    pub kind: EntryKind,
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Last modification time, when the platform reports one
    #[serde(skip)]
    pub modified: Option<SystemTime>,
    /// Content fingerprint; `None` for directories and for files that could
    /// not be hashed
    #[serde(serialize_with = "serialize_fingerprint")]
    pub fingerprint: Option<Fingerprint>,
}

fn serialize_fingerprint<S>(value: &Option<Fingerprint>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(fingerprint) => serializer.serialize_some(&fingerprint_hex(fingerprint)),
        None => serializer.serialize_none(),
    }
}

impl Entry {
    pub fn directory(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            kind: EntryKind::Directory,
            size: 0,
            modified: None,
            fingerprint: None,
        }
    }

    pub fn file(
        relative_path: impl Into<String>,
        size: u64,
        fingerprint: Option<Fingerprint>,
    ) -> Self {
        Self {
            relative_path: relative_path.into(),
            kind: EntryKind::File,
            size,
            modified: None,
            fingerprint,
        }
    }

    /// A node that is neither a regular file nor a directory
    pub fn other(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            kind: EntryKind::Other,
            size: 0,
            modified: None,
            fingerprint: None,
        }
    }

    pub fn with_modified(mut self, modified: Option<SystemTime>) -> Self {
        self.modified = modified;
        self
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Whether this entry and `other` hold the same content
    ///
    /// Directories match on kind alone. Files must agree on size (checked
    /// first) and on a known fingerprint; an unknown fingerprint on either
    /// side never compares equal. `Other` nodes never compare equal.
    pub fn content_equal(&self, other: &Entry) -> bool {
        match (self.kind, other.kind) {
            (EntryKind::Directory, EntryKind::Directory) => true,
            (EntryKind::File, EntryKind::File) => {
                if self.size != other.size {
                    return false;
                }
                match (&self.fingerprint, &other.fingerprint) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

/// All entries under one root, keyed by relative path
#[derive(Debug, Clone)]
pub struct Snapshot {
    root: PathBuf,
    root_present: bool,
    entries: BTreeMap<String, Entry>,
}

impl Snapshot {
    /// Snapshot of a root that does not exist
    pub fn absent(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            root_present: false,
            entries: BTreeMap::new(),
        }
    }

    pub fn from_entries(root: impl Into<PathBuf>, entries: impl IntoIterator<Item = Entry>) -> Self {
        Self {
            root: root.into(),
            root_present: true,
            entries: entries
                .into_iter()
                .map(|entry| (entry.relative_path.clone(), entry))
                .collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the root directory existed when the walk ran
    pub fn root_present(&self) -> bool {
        self.root_present
    }

    pub fn get(&self, relative_path: &str) -> Option<&Entry> {
        self.entries.get(relative_path)
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.entries.contains_key(relative_path)
    }

    /// Entries in lexicographic key order
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.iter().filter(|e| e.kind == EntryKind::File).count()
    }

    pub fn directory_count(&self) -> usize {
        self.iter().filter(|e| e.kind == EntryKind::Directory).count()
    }

    pub fn total_bytes(&self) -> u64 {
        self.iter().map(|e| e.size).sum()
    }
}
