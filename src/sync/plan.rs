//! Diff planner: turns a (source, replica) snapshot pair into ordered actions.

use crate::tree::path::{components, join_key};
use crate::tree::{Entry, Snapshot};
use crate::types::EntryKind;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

/// Discriminant of an [`Action`], used in events and failure records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CreateDirectory,
    CopyOrUpdateFile,
    DeleteFile,
    DeleteDirectory,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionKind::CreateDirectory => "create_directory",
            ActionKind::CopyOrUpdateFile => "copy_or_update_file",
            ActionKind::DeleteFile => "delete_file",
            ActionKind::DeleteDirectory => "delete_directory",
        };
        f.write_str(label)
    }
}

/// One planned mutation of the replica tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    CreateDirectory { path: String },
    CopyOrUpdateFile { path: String, source: PathBuf },
    DeleteFile { path: String },
    DeleteDirectory { path: String },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::CreateDirectory { .. } => ActionKind::CreateDirectory,
            Action::CopyOrUpdateFile { .. } => ActionKind::CopyOrUpdateFile,
            Action::DeleteFile { .. } => ActionKind::DeleteFile,
            Action::DeleteDirectory { .. } => ActionKind::DeleteDirectory,
        }
    }

    /// Replica-relative key the action targets
    pub fn path(&self) -> &str {
        match self {
            Action::CreateDirectory { path }
            | Action::CopyOrUpdateFile { path, .. }
            | Action::DeleteFile { path }
            | Action::DeleteDirectory { path } => path,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Action::DeleteFile { .. } | Action::DeleteDirectory { .. })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.path())
    }
}

/// Ordered list of actions for one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    actions: Vec<Action>,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind() == kind).count()
    }
}

impl IntoIterator for Plan {
    type Item = Action;
    type IntoIter = std::vec::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

/// Compare two keys component-wise, so `a/b` sorts directly after `a` and
/// before `a-b`.
fn cmp_keys(a: &str, b: &str) -> Ordering {
    components(a).cmp(components(b))
}

fn create_action(source: &Snapshot, entry: &Entry) -> Option<Action> {
    let action = match entry.kind {
        EntryKind::Directory => Action::CreateDirectory {
            path: entry.relative_path.clone(),
        },
        EntryKind::File => Action::CopyOrUpdateFile {
            path: entry.relative_path.clone(),
            source: join_key(source.root(), &entry.relative_path),
        },
        EntryKind::Other => return None,
    };
    Some(action)
}

fn delete_action(entry: &Entry) -> Action {
    match entry.kind {
        EntryKind::Directory => Action::DeleteDirectory {
            path: entry.relative_path.clone(),
        },
        EntryKind::File | EntryKind::Other => Action::DeleteFile {
            path: entry.relative_path.clone(),
        },
    }
}

/// Compute the actions that turn `replica` into an exact copy of `source`
///
/// Deletions come first, deepest paths first, so a directory is always empty
/// by the time it is removed and a kind change frees its path before the
/// replacement is created. Creations and copies follow in component order, so
/// every directory precedes the entries nested in it.
///
/// Links and special nodes are never mirrored: on the source side they are
/// ignored, on the replica side they are always deleted.
pub fn plan(source: &Snapshot, replica: &Snapshot) -> Plan {
    let mut deletions = Vec::new();
    let mut creations = Vec::new();

    for entry in source.iter().filter(|e| e.kind != EntryKind::Other) {
        match replica.get(&entry.relative_path) {
            None => creations.extend(create_action(source, entry)),
            Some(existing) if existing.kind != entry.kind => {
                deletions.push(delete_action(existing));
                creations.extend(create_action(source, entry));
            }
            Some(existing) => {
                if entry.kind == EntryKind::File && !entry.content_equal(existing) {
                    creations.extend(create_action(source, entry));
                }
            }
        }
    }

    // Replica nodes with no mirrored counterpart go, including every link or
    // special node (the source side never mirrors those).
    for entry in replica.iter() {
        let mirrored = matches!(
            source.get(&entry.relative_path),
            Some(counterpart) if counterpart.kind != EntryKind::Other
        );
        if !mirrored {
            deletions.push(delete_action(entry));
        }
    }

    deletions.sort_by(|a, b| cmp_keys(b.path(), a.path()));
    creations.sort_by(|a, b| cmp_keys(a.path(), b.path()));

    deletions.extend(creations);
    Plan::new(deletions)
}
