//! Property-based tests for plan ordering
//!
//! Plans are replayed against an in-memory tree that enforces the same rules
//! as the filesystem: a node needs an existing parent directory, and a
//! directory can only be removed once it is empty.

use super::{build_model, node_specs, TreeModel};
use proptest::test_runner::{Config, TestRunner};
use replicate::sync::{plan, Action};
use replicate::tree::hasher::compute_content_hash;
use replicate::tree::{Entry, Snapshot};

fn snapshot(root: &str, model: &TreeModel) -> Snapshot {
    Snapshot::from_entries(
        root,
        model.iter().map(|(key, content)| match content {
            None => Entry::directory(key.clone()),
            Some(bytes) => Entry::file(
                key.clone(),
                bytes.len() as u64,
                Some(compute_content_hash(bytes)),
            ),
        }),
    )
}

fn parent_present(tree: &TreeModel, key: &str) -> bool {
    match key.rfind('/') {
        None => true,
        Some(idx) => matches!(tree.get(&key[..idx]), Some(None)),
    }
}

fn has_children(tree: &TreeModel, key: &str) -> bool {
    let prefix = format!("{}/", key);
    tree.keys().any(|k| k.starts_with(&prefix))
}

/// Replay `actions` on `tree`, panicking on any step the filesystem would reject
fn replay(tree: &mut TreeModel, source: &TreeModel, actions: &[Action]) {
    for action in actions {
        match action {
            Action::CreateDirectory { path } => {
                assert!(parent_present(tree, path), "parent missing for {action}");
                assert!(!tree.contains_key(path), "{action} over existing node");
                tree.insert(path.clone(), None);
            }
            Action::CopyOrUpdateFile { path, .. } => {
                assert!(parent_present(tree, path), "parent missing for {action}");
                assert!(!matches!(tree.get(path), Some(None)), "{action} over directory");
                tree.insert(path.clone(), source[path].clone());
            }
            Action::DeleteFile { path } => {
                assert!(matches!(tree.get(path), Some(Some(_))), "{action} of non-file");
                tree.remove(path);
            }
            Action::DeleteDirectory { path } => {
                assert!(!has_children(tree, path), "{action} of non-empty directory");
                tree.remove(path);
            }
        }
    }
}

/// Every plan is executable in order and turns the replica into the source
#[test]
fn test_plan_replays_to_source_property() {
    let mut runner = TestRunner::new(Config::with_cases(256));

    runner
        .run(&(node_specs(), node_specs()), |(source_specs, replica_specs)| {
            let source_model = build_model(&source_specs);
            let mut replica_model = build_model(&replica_specs);

            let planned = plan(
                &snapshot("/source", &source_model),
                &snapshot("/replica", &replica_model),
            );
            replay(&mut replica_model, &source_model, planned.actions());
            assert_eq!(replica_model, source_model);

            Ok(())
        })
        .unwrap();
}

/// Deletions come first; nothing is deleted that the source still holds as-is
#[test]
fn test_deletions_precede_creations_property() {
    let mut runner = TestRunner::new(Config::with_cases(256));

    runner
        .run(&(node_specs(), node_specs()), |(source_specs, replica_specs)| {
            let source_model = build_model(&source_specs);
            let replica_model = build_model(&replica_specs);

            let planned = plan(
                &snapshot("/source", &source_model),
                &snapshot("/replica", &replica_model),
            );
            let actions = planned.actions();

            if let Some(first_write) = actions.iter().position(|a| !a.is_delete()) {
                assert!(actions[first_write..].iter().all(|a| !a.is_delete()));
            }

            for action in actions.iter().filter(|a| a.is_delete()) {
                let key = action.path();
                assert!(
                    source_model.get(key) != replica_model.get(key),
                    "{action} removes a node the source still has unchanged"
                );
            }

            Ok(())
        })
        .unwrap();
}
