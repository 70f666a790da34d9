//! End-to-end: repository operations observed through the watch center

use gitstate_repo::{RepositoryHandle, operations};
use gitstate_test_utils::TestRepo;
use gitstate_watch::{ChangeCallback, WatchCenter};
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);
const SILENCE_WINDOW: Duration = Duration::from_secs(1);

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn test_center() -> WatchCenter {
    WatchCenter::with_intervals(Duration::from_millis(100), Duration::from_millis(200))
}

fn sender(tx: mpsc::Sender<()>) -> ChangeCallback {
    Arc::new(move |_: &Path| {
        let _ = tx.send(());
    })
}

/// Give the watcher time to register and baseline before driving changes.
fn settle() {
    thread::sleep(Duration::from_millis(300));
}

fn drain(rx: &mpsc::Receiver<()>) {
    while rx.try_recv().is_ok() {}
}

#[test]
fn test_branch_switch_notifies_every_subscriber() {
    init_tracing();
    let repo = TestRepo::new();
    repo.commit_file("a.txt", "a\n", "first");
    repo.create_branch("feature");

    let center = test_center();
    let (tx_a, rx_a) = mpsc::channel();
    let (tx_b, rx_b) = mpsc::channel();
    let _a = center.subscribe(repo.root(), sender(tx_a));
    let _b = center.subscribe(repo.root(), sender(tx_b));
    settle();

    let handle = RepositoryHandle::open(repo.root()).unwrap();
    operations::checkout_branch(&handle, "feature").unwrap();

    assert!(
        rx_a.recv_timeout(DELIVERY_TIMEOUT).is_ok(),
        "subscriber A missed the branch switch"
    );
    assert!(
        rx_b.recv_timeout(DELIVERY_TIMEOUT).is_ok(),
        "subscriber B missed the branch switch"
    );
}

#[test]
fn test_staging_notification_gates_the_status_read() {
    init_tracing();
    let repo = TestRepo::new();
    repo.commit_file("a.txt", "a\n", "first");

    let center = test_center();
    let (tx, rx) = mpsc::channel();
    // The callback runs the expensive status read the watcher exists to
    // gate — once per debounced burst, not per raw file event.
    let _id = center.subscribe(
        repo.root(),
        Arc::new(move |worktree: &Path| {
            let handle = RepositoryHandle::open(worktree).unwrap();
            let summary = operations::status_summary(&handle).unwrap();
            let _ = tx.send(summary);
        }),
    );
    settle();

    repo.stage_file("b.txt", "b\n");

    let summary = rx
        .recv_timeout(DELIVERY_TIMEOUT)
        .expect("no notification for the staged change");
    assert_eq!(summary.staged, 1);
}

#[test]
fn test_unsubscribed_party_stops_receiving() {
    init_tracing();
    let repo = TestRepo::new();
    repo.commit_file("a.txt", "a\n", "first");

    let center = test_center();
    let (tx_a, rx_a) = mpsc::channel();
    let (tx_b, rx_b) = mpsc::channel();
    let a = center.subscribe(repo.root(), sender(tx_a));
    let _b = center.subscribe(repo.root(), sender(tx_b));
    settle();

    repo.stage_file("b.txt", "b\n");
    assert!(rx_a.recv_timeout(DELIVERY_TIMEOUT).is_ok());
    assert!(rx_b.recv_timeout(DELIVERY_TIMEOUT).is_ok());

    center.unsubscribe(repo.root(), a);
    drain(&rx_a);
    drain(&rx_b);

    repo.stage_file("c.txt", "c\n");
    assert!(
        rx_b.recv_timeout(DELIVERY_TIMEOUT).is_ok(),
        "remaining subscriber missed the change"
    );
    assert_eq!(
        rx_a.recv_timeout(SILENCE_WINDOW),
        Err(RecvTimeoutError::Timeout),
        "unsubscribed party still notified"
    );
}

#[test]
fn test_last_unsubscribe_stops_monitoring() {
    init_tracing();
    let repo = TestRepo::new();
    repo.commit_file("a.txt", "a\n", "first");

    let center = test_center();
    let (tx, rx) = mpsc::channel();
    let id = center.subscribe(repo.root(), sender(tx));
    settle();
    assert!(center.is_watching(repo.root()));

    center.unsubscribe(repo.root(), id);
    assert!(!center.is_watching(repo.root()));
    drain(&rx);

    repo.stage_file("b.txt", "b\n");
    assert_eq!(
        rx.recv_timeout(SILENCE_WINDOW),
        Err(RecvTimeoutError::Timeout),
        "stopped watcher still delivered"
    );
}

#[test]
fn test_resubscribe_after_teardown_sees_new_changes() {
    init_tracing();
    let repo = TestRepo::new();
    repo.commit_file("a.txt", "a\n", "first");

    let center = test_center();
    let (tx1, _rx1) = mpsc::channel();
    let id = center.subscribe(repo.root(), sender(tx1));
    center.unsubscribe(repo.root(), id);

    let (tx2, rx2) = mpsc::channel();
    let _id = center.subscribe(repo.root(), sender(tx2));
    settle();

    repo.stage_file("b.txt", "b\n");
    assert!(
        rx2.recv_timeout(DELIVERY_TIMEOUT).is_ok(),
        "fresh watcher missed the change"
    );
}

#[test]
fn test_linked_worktree_changes_are_observed() {
    init_tracing();
    let repo = TestRepo::new();
    repo.commit_file("a.txt", "a\n", "first");

    let wt_temp = tempfile::TempDir::new().unwrap();
    let wt = repo.add_linked_worktree("side", &wt_temp.path().join("side"));

    let center = test_center();
    let (tx, rx) = mpsc::channel();
    let _id = center.subscribe(&wt, sender(tx));
    settle();

    // Stage inside the linked worktree: its index lives under the
    // primary repository's gitdir, which is what must be monitored.
    let wt_repo = git2::Repository::open(&wt).unwrap();
    std::fs::write(wt.join("side.txt"), "s\n").unwrap();
    let mut index = wt_repo.index().unwrap();
    index.add_path(Path::new("side.txt")).unwrap();
    index.write().unwrap();

    assert!(
        rx.recv_timeout(DELIVERY_TIMEOUT).is_ok(),
        "linked worktree change missed"
    );
}
