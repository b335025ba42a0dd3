//! Walk-level failures: unreadable roots, partial listings, unhashable files

#![cfg(unix)]

use super::test_utils::{read_tree, write_tree, Unreadable};
use replicate::error::{PassError, WalkError};
use replicate::sync::{plan, run_pass, ActionKind, PassCaches, PassOrchestrator};
use replicate::tree::{FingerprintCache, Walker};
use tempfile::TempDir;

#[test]
fn test_unreadable_source_root_aborts_pass() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let replica = temp.path().join("replica");
    write_tree(&source, &[("a.txt", "a")]);
    write_tree(&replica, &[("keep.txt", "k")]);
    let before = read_tree(&replica);

    let Some(_guard) = Unreadable::new(&source) else {
        return;
    };
    let err = run_pass(&source, &replica).unwrap_err();

    assert!(matches!(err, PassError::Walk(WalkError::RootUnavailable { .. })));
    assert_eq!(read_tree(&replica), before);
}

#[test]
fn test_unreadable_source_subdirectory_aborts_pass() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let replica = temp.path().join("replica");
    write_tree(&source, &[("locked/inner.txt", "i"), ("a.txt", "a")]);
    write_tree(&replica, &[("locked/inner.txt", "i"), ("old.txt", "old")]);
    let before = read_tree(&replica);

    let Some(_guard) = Unreadable::new(&source.join("locked")) else {
        return;
    };
    let err = run_pass(&source, &replica).unwrap_err();

    match err {
        PassError::Walk(WalkError::Incomplete { path, .. }) => {
            assert_eq!(path, source.join("locked"));
        }
        other => panic!("expected incomplete walk, got {other}"),
    }
    // A partial listing must never turn into deletions
    assert_eq!(read_tree(&replica), before);
}

#[test]
fn test_unreadable_replica_subdirectory_aborts_pass() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let replica = temp.path().join("replica");
    write_tree(&source, &[("a.txt", "a")]);
    write_tree(&replica, &[("locked/inner.txt", "i")]);

    let Some(guard) = Unreadable::new(&replica.join("locked")) else {
        return;
    };
    let err = run_pass(&source, &replica).unwrap_err();
    drop(guard);

    assert!(matches!(err, PassError::Walk(WalkError::Incomplete { .. })));
    assert!(replica.join("locked").join("inner.txt").exists());
    assert!(!replica.join("a.txt").exists());
}

#[test]
fn test_unhashable_file_has_no_fingerprint_and_is_copied() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let replica = temp.path().join("replica");
    write_tree(&source, &[("secret.txt", "same"), ("open.txt", "same")]);
    write_tree(&replica, &[("secret.txt", "same"), ("open.txt", "same")]);

    let Some(_guard) = Unreadable::new(&source.join("secret.txt")) else {
        return;
    };
    let source_snapshot = Walker::new(&source).walk().unwrap();
    let replica_snapshot = Walker::new(&replica).walk().unwrap();

    let secret = source_snapshot.get("secret.txt").unwrap();
    assert_eq!(secret.fingerprint, None);
    assert_eq!(secret.size, 4);

    let plan = plan(&source_snapshot, &replica_snapshot);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.count(ActionKind::CopyOrUpdateFile), 1);
    assert_eq!(plan.actions()[0].path(), "secret.txt");
}

#[test]
fn test_unhashable_file_is_not_cached() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("tree");
    write_tree(&root, &[("f.txt", "content")]);

    let Some(guard) = Unreadable::new(&root.join("f.txt")) else {
        return;
    };
    let walker = Walker::new(&root);
    let mut cache = FingerprintCache::new();
    let snapshot = walker.walk_cached(&mut cache).unwrap();
    drop(guard);

    assert_eq!(snapshot.get("f.txt").unwrap().fingerprint, None);
    assert!(cache.is_empty());

    // Once readable again the file is hashed normally
    let snapshot = walker.walk_cached(&mut cache).unwrap();
    assert!(snapshot.get("f.txt").unwrap().fingerprint.is_some());
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_pass_with_unhashable_source_file_reports_copy_failure() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let replica = temp.path().join("replica");
    write_tree(&source, &[("secret.txt", "s"), ("open.txt", "o")]);

    let Some(_guard) = Unreadable::new(&source.join("secret.txt")) else {
        return;
    };
    let orchestrator = PassOrchestrator::new(&source, &replica);
    let mut caches = PassCaches::default();
    let result = orchestrator.run(Some(&mut caches)).unwrap();

    assert_eq!(result.planned, 2);
    assert_eq!(result.failed, 1);
    assert_eq!(result.failures[0].path, "secret.txt");
    assert!(replica.join("open.txt").exists());
}
