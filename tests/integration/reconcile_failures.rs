//! Per-action failure handling: isolation, dependency skips, interruption

use super::test_utils::write_tree;
use replicate::error::ActionErrorKind;
use replicate::events::{Outcome, RecordingSink};
use replicate::sync::{Action, ActionKind, Plan, Reconciler};
use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::TempDir;

fn create_dir(path: &str) -> Action {
    Action::CreateDirectory { path: path.to_string() }
}

#[test]
fn test_failed_directory_skips_descendants_only() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let replica = temp.path().join("replica");
    write_tree(&source, &[("blocked/f.txt", "f"), ("other/g.txt", "g")]);
    // A plain file where the directory should go makes create_dir fail
    write_tree(&replica, &[("blocked", "in the way")]);

    let plan = Plan::new(vec![
        create_dir("blocked"),
        Action::CopyOrUpdateFile {
            path: "blocked/f.txt".to_string(),
            source: source.join("blocked").join("f.txt"),
        },
        create_dir("other"),
        Action::CopyOrUpdateFile {
            path: "other/g.txt".to_string(),
            source: source.join("other").join("g.txt"),
        },
    ]);

    let sink = Arc::new(RecordingSink::new());
    let result = Reconciler::new(&replica).with_sink(sink.clone()).apply(plan);

    assert_eq!(result.planned, 4);
    assert_eq!(result.attempted, 3);
    assert_eq!(result.succeeded, 2);
    assert_eq!(result.failed, 1);
    assert_eq!(result.skipped, 1);
    assert!(!result.is_clean());

    assert_eq!(result.failures.len(), 2);
    assert_eq!(result.failures[0].path, "blocked");
    assert_eq!(result.failures[0].error, ActionErrorKind::AlreadyExists);
    assert_eq!(result.failures[1].path, "blocked/f.txt");
    assert_eq!(result.failures[1].error, ActionErrorKind::DependencyFailed);

    assert_eq!(fs::read_to_string(replica.join("other").join("g.txt")).unwrap(), "g");
    assert_eq!(fs::read_to_string(replica.join("blocked")).unwrap(), "in the way");

    // Skipped actions are reported in the result but emit no event
    let events = sink.actions();
    assert_eq!(events.len(), 3);
    assert!(matches!(
        events[0].outcome,
        Outcome::Failed { error: ActionErrorKind::AlreadyExists, .. }
    ));
}

#[test]
fn test_missing_source_file_fails_only_that_copy() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let replica = temp.path().join("replica");
    write_tree(&source, &[("present.txt", "here")]);
    fs::create_dir(&replica).unwrap();

    let plan = Plan::new(vec![
        Action::CopyOrUpdateFile {
            path: "gone.txt".to_string(),
            source: source.join("gone.txt"),
        },
        Action::CopyOrUpdateFile {
            path: "present.txt".to_string(),
            source: source.join("present.txt"),
        },
    ]);

    let result = Reconciler::new(&replica).apply(plan);

    assert_eq!(result.failed, 1);
    assert_eq!(result.succeeded, 1);
    assert_eq!(result.failures[0].error, ActionErrorKind::NotFound);
    assert_eq!(result.failures[0].action, ActionKind::CopyOrUpdateFile);
    assert!(replica.join("present.txt").exists());
}

#[test]
fn test_directory_delete_is_never_recursive() {
    let temp = TempDir::new().unwrap();
    let replica = temp.path().join("replica");
    write_tree(&replica, &[("full/keep.txt", "keep")]);

    let result = Reconciler::new(&replica).apply(Plan::new(vec![Action::DeleteDirectory {
        path: "full".to_string(),
    }]));

    assert_eq!(result.failed, 1);
    assert_eq!(result.failures[0].error, ActionErrorKind::DirectoryNotEmpty);
    assert!(replica.join("full").join("keep.txt").exists());
}

#[test]
fn test_deleting_absent_paths_succeeds() {
    let temp = TempDir::new().unwrap();
    let replica = temp.path().join("replica");
    fs::create_dir(&replica).unwrap();

    let result = Reconciler::new(&replica).apply(Plan::new(vec![
        Action::DeleteFile { path: "missing.txt".to_string() },
        Action::DeleteDirectory { path: "missing".to_string() },
    ]));

    assert!(result.is_clean());
    assert_eq!(result.succeeded, 2);
}

#[test]
fn test_shutdown_before_pass_attempts_nothing() {
    let temp = TempDir::new().unwrap();
    let replica = temp.path().join("replica");
    fs::create_dir(&replica).unwrap();

    let flag = Arc::new(AtomicBool::new(true));
    let result = Reconciler::new(&replica)
        .with_shutdown(flag)
        .apply(Plan::new(vec![create_dir("a"), create_dir("b")]));

    assert!(result.interrupted);
    assert_eq!(result.attempted, 0);
    assert_eq!(result.planned, 2);
    assert!(!replica.join("a").exists());
}
