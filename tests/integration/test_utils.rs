//! Shared test utilities for integration tests
//!
//! Tree fixtures plus serialized access to process environment variables.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use walkdir::WalkDir;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Content of one node in a tree listing; `None` marks a directory
pub type Node = Option<Vec<u8>>;

/// Create files and directories under `root`
///
/// Keys ending in `/` are directories, everything else is a file with the
/// given content. Parent directories are created as needed.
pub fn write_tree(root: &Path, nodes: &[(&str, &str)]) {
    fs::create_dir_all(root).unwrap();
    for (key, content) in nodes {
        if let Some(dir) = key.strip_suffix('/') {
            fs::create_dir_all(root.join(dir)).unwrap();
        } else {
            let path = root.join(key);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
    }
}

/// Read every node beneath `root` into a map keyed by slash-joined relative path
pub fn read_tree(root: &Path) -> BTreeMap<String, Node> {
    let mut nodes = BTreeMap::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.unwrap();
        let key = entry
            .path()
            .strip_prefix(root)
            .unwrap()
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let content = if entry.file_type().is_dir() {
            None
        } else {
            Some(fs::read(entry.path()).unwrap())
        };
        nodes.insert(key, content);
    }
    nodes
}

/// Assert that `replica` holds exactly the same nodes and bytes as `source`
pub fn assert_mirrored(source: &Path, replica: &Path) {
    assert_eq!(read_tree(source), read_tree(replica));
}

/// Run `f` with the given environment variables set, restoring them afterwards
pub fn with_env<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let previous: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
        .collect();

    for (key, value) in vars {
        std::env::set_var(key, value);
    }

    let result = f();

    for (key, value) in previous {
        match value {
            Some(value) => std::env::set_var(&key, value),
            None => std::env::remove_var(&key),
        }
    }
    result
}

/// Strips all permission bits from a path and restores them on drop
#[cfg(unix)]
pub struct Unreadable {
    path: std::path::PathBuf,
    mode: u32,
}

#[cfg(unix)]
impl Unreadable {
    /// Returns `None` when permissions are not enforced (e.g. running as root)
    pub fn new(path: &Path) -> Option<Self> {
        use std::os::unix::fs::PermissionsExt;

        let mode = fs::metadata(path).unwrap().permissions().mode();
        fs::set_permissions(path, fs::Permissions::from_mode(0o000)).unwrap();
        let guard = Self {
            path: path.to_path_buf(),
            mode,
        };

        let enforced = if path.is_dir() {
            fs::read_dir(path).is_err()
        } else {
            fs::File::open(path).is_err()
        };
        if enforced {
            Some(guard)
        } else {
            eprintln!("permissions not enforced for this user, skipping");
            None
        }
    }
}

#[cfg(unix)]
impl Drop for Unreadable {
    fn drop(&mut self) {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(&self.path, fs::Permissions::from_mode(self.mode));
    }
}
