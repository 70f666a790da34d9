//! End-to-end repository lifecycle through the public handle API

use assert_fs::prelude::*;
use gitstate_repo::{RepositoryHandle, ResetMode, operations};
use predicates::prelude::*;
use std::fs;
use std::path::Path;

/// Initialise a repository with a local test identity, all through the
/// handle's own accessors.
fn init_repo_at(root: &Path) -> RepositoryHandle {
    let handle = RepositoryHandle::init(root, false).unwrap();
    let mut config = handle.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@test.com").unwrap();
    handle
}

fn stage(handle: &RepositoryHandle, root: &Path, name: &str, contents: &str) {
    fs::write(root.join(name), contents).unwrap();
    let mut index = handle.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
}

#[test]
fn test_commit_log_stats_round_trip() {
    let temp = assert_fs::TempDir::new().unwrap();
    let handle = init_repo_at(temp.path());

    stage(&handle, temp.path(), "notes.txt", "one\ntwo\n");
    let oid = operations::commit(&handle, "add notes", false).unwrap();

    let log = operations::log(&handle, 10, 0).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].oid, oid);
    assert_eq!(log[0].summary, "add notes");
    assert_eq!(log[0].parent_count, 0);

    let info = operations::find_commit(&handle, &oid).unwrap();
    assert_eq!(info.oid, oid);

    let stats = operations::commit_stats(&handle, &oid).unwrap();
    assert_eq!(stats.files_changed, 1);
    assert_eq!(stats.insertions, 2);
    assert_eq!(stats.deletions, 0);

    assert!(handle.current_branch().unwrap().is_some());
}

#[test]
fn test_hard_reset_forces_the_working_tree() {
    let temp = assert_fs::TempDir::new().unwrap();
    let handle = init_repo_at(temp.path());

    stage(&handle, temp.path(), "a.txt", "v1\n");
    let first = operations::commit(&handle, "first", false).unwrap();
    stage(&handle, temp.path(), "a.txt", "v2\n");
    operations::commit(&handle, "second", false).unwrap();

    // Conflicting uncommitted modification; hard reset must not be
    // blocked by it.
    temp.child("a.txt").write_str("dirty local edit\n").unwrap();

    operations::reset(&handle, &first, ResetMode::Hard).unwrap();

    temp.child("a.txt").assert("v1\n");
    temp.child(".git").assert(predicate::path::is_dir());

    let status = operations::status_summary(&handle).unwrap();
    assert_eq!(status, Default::default());
}

#[test]
fn test_discovery_round_trip_after_init() {
    let temp = assert_fs::TempDir::new().unwrap();
    let handle = init_repo_at(temp.path());
    drop(handle);

    let nested = temp.path().join("src/deep");
    fs::create_dir_all(&nested).unwrap();

    assert!(RepositoryHandle::is_repository(&nested));
    let root = RepositoryHandle::discover(&nested).unwrap();
    assert_eq!(
        root.canonicalize().unwrap(),
        temp.path().canonicalize().unwrap()
    );
}

#[test]
fn test_snapshots_outlive_the_handle() {
    let temp = assert_fs::TempDir::new().unwrap();
    let handle = init_repo_at(temp.path());
    stage(&handle, temp.path(), "a.txt", "a\n");
    let oid = operations::commit(&handle, "first", false).unwrap();

    let info = operations::find_commit(&handle, &oid).unwrap();
    drop(handle);

    // Fully materialized: no borrow of the released native object.
    assert_eq!(info.oid, oid);
    assert_eq!(info.author.name, "Test User");
}
