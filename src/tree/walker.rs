//! Filesystem walker producing snapshots

use crate::error::WalkError;
use crate::tree::cache::FingerprintCache;
use crate::tree::hasher::{self, CHUNK_SIZE};
use crate::tree::path::relative_key;
use crate::tree::snapshot::{Entry, Snapshot};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Filesystem walker configuration
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Read size used when hashing file content
    pub chunk_size: usize,
    /// Record symlinks and special files as `EntryKind::Other` instead of
    /// skipping them
    pub report_special: bool,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            report_special: false,
        }
    }
}

/// Filesystem walker
///
/// Symbolic links are never followed, so a link pointing back into the tree
/// cannot cause unbounded recursion. Links and special files are skipped
/// unless `report_special` is set.
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given root path
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: WalkerConfig::default(),
        }
    }

    /// Create a walker with custom configuration
    pub fn with_config(root: impl Into<PathBuf>, config: WalkerConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree, hashing every file
    pub fn walk(&self) -> Result<Snapshot, WalkError> {
        self.walk_inner(None)
    }

    /// Walk the tree, reusing fingerprints from `cache` where size and mtime match
    pub fn walk_cached(&self, cache: &mut FingerprintCache) -> Result<Snapshot, WalkError> {
        let snapshot = self.walk_inner(Some(&mut *cache))?;
        cache.retain_seen();
        Ok(snapshot)
    }

    fn walk_inner(&self, mut cache: Option<&mut FingerprintCache>) -> Result<Snapshot, WalkError> {
        let started = Instant::now();

        match fs::metadata(&self.root) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => {
                return Err(WalkError::NotADirectory {
                    root: self.root.clone(),
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(root = %self.root.display(), "Root does not exist, using empty snapshot");
                return Ok(Snapshot::absent(self.root.clone()));
            }
            Err(e) => {
                return Err(WalkError::RootUnavailable {
                    root: self.root.clone(),
                    source: e,
                })
            }
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(&self.root).follow_links(false).min_depth(1);

        for item in walker {
            let entry = match item {
                Ok(entry) => entry,
                Err(e) => {
                    let depth = e.depth();
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::new(ErrorKind::Other, "filesystem loop"));

                    if source.kind() == ErrorKind::NotFound && depth > 0 {
                        debug!(path = %path.display(), "Entry vanished during walk");
                        continue;
                    }
                    if depth == 0 {
                        return Err(WalkError::RootUnavailable {
                            root: self.root.clone(),
                            source,
                        });
                    }
                    return Err(WalkError::Incomplete {
                        root: self.root.clone(),
                        path,
                        source,
                    });
                }
            };

            let relative = match entry
                .path()
                .strip_prefix(&self.root)
                .ok()
                .and_then(relative_key)
            {
                Some(key) => key,
                None => {
                    warn!(path = %entry.path().display(), "Skipping entry whose name is not valid UTF-8");
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                entries.push(Entry::directory(relative));
                continue;
            }

            if !file_type.is_file() {
                if self.config.report_special {
                    debug!(path = %relative, symlink = file_type.is_symlink(), "Recording special node");
                    entries.push(Entry::other(relative));
                } else {
                    debug!(path = %relative, symlink = file_type.is_symlink(), "Skipping special node");
                }
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    if e.io_error().map(|io| io.kind()) == Some(ErrorKind::NotFound) {
                        debug!(path = %relative, "File vanished during walk");
                    } else {
                        warn!(path = %relative, error = %e, "Failed to read file metadata");
                        entries.push(Entry::file(relative, 0, None));
                    }
                    continue;
                }
            };

            let size = metadata.len();
            let modified = metadata.modified().ok();
            let cached = cache
                .as_deref_mut()
                .and_then(|c| c.lookup(&relative, size, modified));

            let fingerprint = match cached {
                Some(fingerprint) => Some(fingerprint),
                None => match hasher::fingerprint_file_chunked(entry.path(), self.config.chunk_size) {
                    Ok(fingerprint) => {
                        if let Some(c) = cache.as_deref_mut() {
                            c.store(&relative, size, modified, fingerprint);
                        }
                        Some(fingerprint)
                    }
                    Err(e) if e.source.kind() == ErrorKind::NotFound => {
                        debug!(path = %relative, "File vanished before it could be hashed");
                        continue;
                    }
                    Err(e) => {
                        warn!(path = %relative, error = %e, "Fingerprint failed, treating file as changed");
                        if let Some(c) = cache.as_deref_mut() {
                            c.invalidate(&relative);
                        }
                        None
                    }
                },
            };

            entries.push(Entry::file(relative, size, fingerprint).with_modified(modified));
        }

        let snapshot = Snapshot::from_entries(self.root.clone(), entries);
        debug!(
            root = %self.root.display(),
            files = snapshot.file_count(),
            directories = snapshot.directory_count(),
            bytes = snapshot.total_bytes(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Snapshot complete"
        );
        Ok(snapshot)
    }
}
