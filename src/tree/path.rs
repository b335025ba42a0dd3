//! Path normalization utilities
//!
//! Snapshot keys are root-relative and slash-separated so the same node
//! produces the same key on both sides of a pass, on every platform.

use std::path::{Component, Path, PathBuf};

/// Normalize a root-relative path into a snapshot key
///
/// Components are joined with `/` and `.` components are dropped. Names are
/// kept byte-for-byte so a key always resolves back to the node it came from.
/// Returns `None` for paths that escape the root, are empty, or contain a
/// name that is not valid UTF-8.
pub fn relative_key(relative: &Path) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => parts.push(name.to_str()?.to_string()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Split a snapshot key into components, the ordering key used by the planner
pub fn components(key: &str) -> impl Iterator<Item = &str> {
    key.split('/')
}

/// Whether `key` lies strictly beneath `ancestor`
pub fn is_descendant(key: &str, ancestor: &str) -> bool {
    key.len() > ancestor.len()
        && key.starts_with(ancestor)
        && key.as_bytes()[ancestor.len()] == b'/'
}

/// Parent key of a snapshot key, `None` for top-level entries
pub fn parent_key(key: &str) -> Option<&str> {
    key.rfind('/').map(|idx| &key[..idx])
}

/// Resolve a snapshot key against a root directory
pub fn join_key(root: &Path, key: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in components(key) {
        path.push(part);
    }
    path
}

/// Make a path absolute, resolving as much of it as exists
///
/// The path is joined onto the current directory and `.`/`..` are folded
/// lexically. The longest existing ancestor is then canonicalized with `dunce`
/// (resolving symlinks without UNC prefixes on Windows) and the missing tail
/// is re-appended.
pub fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut lexical = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                lexical.pop();
            }
            Component::CurDir => {}
            other => lexical.push(other.as_os_str()),
        }
    }

    let mut existing = lexical.as_path();
    let mut tail = Vec::new();
    loop {
        if let Ok(mut resolved) = dunce::canonicalize(existing) {
            for name in tail.iter().rev() {
                resolved.push(name);
            }
            return resolved;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent;
            }
            _ => return lexical,
        }
    }
}

/// Whether one of two absolute paths contains the other (or they are equal)
pub fn overlaps(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}
