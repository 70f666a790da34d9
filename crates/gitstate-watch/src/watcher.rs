//! Debounced watcher over one working tree's git metadata.
//!
//! Monitors `<gitdir>/index` and `<gitdir>/HEAD` — the two files every
//! staging, commit, or branch switch touches — instead of running the
//! expensive status machinery on raw filesystem events. Event-driven
//! monitoring via the platform notifier is preferred; mtime polling is
//! the fallback for paths the notifier cannot register (NFS, some
//! network mounts).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Delay between the first observation of a burst and the callback.
pub const DEBOUNCE: Duration = Duration::from_millis(500);

/// Wake interval of the polling fallback.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Notification handler, invoked with the watched working-tree path.
pub type ChangeCallback = Arc<dyn Fn(&Path) + Send + Sync>;

/// Mutable watcher state, shared with the notifier callback, the polling
/// thread, and pending debounce timers. One lock guards the whole block
/// so timestamp/flag pairs are never torn.
#[derive(Default)]
struct WatchState {
    callback: Option<ChangeCallback>,
    /// A debounce delay is already scheduled; further observations in
    /// the burst are absorbed.
    pending: bool,
    /// Bumped on stop; a timer that wakes into a different generation
    /// must not fire.
    generation: u64,
    index_mtime: Option<SystemTime>,
    head_mtime: Option<SystemTime>,
}

/// Watches one working tree's git metadata and fires a single debounced
/// callback per burst of changes.
///
/// Monitoring failures never propagate: a watcher that can establish
/// neither strategy logs a warning and stays inert, so a broken watch
/// path cannot take down direct repository operations.
pub struct ChangeWatcher {
    worktree: PathBuf,
    index_path: PathBuf,
    head_path: PathBuf,
    debounce: Duration,
    poll_interval: Duration,
    state: Arc<Mutex<WatchState>>,
    events: Option<RecommendedWatcher>,
    poll_stop: Option<Sender<()>>,
    poll_thread: Option<JoinHandle<()>>,
}

impl ChangeWatcher {
    /// Create a watcher for `worktree` with the default intervals.
    ///
    /// The metadata directory is resolved once, here: `<worktree>/.git`
    /// as a directory is used directly; as a file (linked working tree)
    /// its `gitdir:` line names the real metadata directory. A worktree
    /// is not expected to change its linkage while being watched.
    pub fn new(worktree: impl Into<PathBuf>) -> Self {
        Self::with_intervals(worktree, DEBOUNCE, POLL_INTERVAL)
    }

    /// Create a watcher with explicit debounce and poll intervals.
    pub fn with_intervals(
        worktree: impl Into<PathBuf>,
        debounce: Duration,
        poll_interval: Duration,
    ) -> Self {
        let worktree = worktree.into();
        let git_dir = resolve_git_dir(&worktree).unwrap_or_else(|| worktree.join(".git"));

        Self {
            index_path: git_dir.join("index"),
            head_path: git_dir.join("HEAD"),
            worktree,
            debounce,
            poll_interval,
            state: Arc::new(Mutex::new(WatchState::default())),
            events: None,
            poll_stop: None,
            poll_thread: None,
        }
    }

    /// The working tree this watcher covers.
    pub fn worktree(&self) -> &Path {
        &self.worktree
    }

    /// Resolved path of the monitored index file.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Resolved path of the monitored HEAD file.
    pub fn head_path(&self) -> &Path {
        &self.head_path
    }

    /// Whether a monitoring strategy is currently active.
    pub fn is_watching(&self) -> bool {
        self.events.is_some() || self.poll_thread.is_some()
    }

    /// Begin monitoring, invoking `callback` once per debounced burst.
    ///
    /// Strategy order: platform file events first, mtime polling if the
    /// notifier cannot register the metadata paths. If both fail the
    /// watcher stays inert — staleness is preferred over a hard failure
    /// here.
    pub fn start(&mut self, callback: ChangeCallback) {
        self.stop();

        {
            let mut state = self.state.lock().unwrap();
            state.callback = Some(callback);
            state.pending = false;
        }

        if self.start_events() {
            tracing::debug!(worktree = %self.worktree.display(), "watching via file events");
            return;
        }
        if self.start_polling() {
            tracing::debug!(worktree = %self.worktree.display(), "watching via mtime polling");
            return;
        }

        tracing::warn!(
            worktree = %self.worktree.display(),
            "no watch strategy available; changes will not be reported"
        );
        self.state.lock().unwrap().callback = None;
    }

    /// Stop monitoring and clear all internal state.
    ///
    /// Pending debounce timers are invalidated (their callback will not
    /// fire), the polling thread is woken and joined, and the notifier
    /// registration is dropped. A stopped watcher holds no threads, no
    /// open watches, and no stale timestamps.
    pub fn stop(&mut self) {
        self.events = None;

        if let Some(stop) = self.poll_stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.poll_thread.take() {
            let _ = handle.join();
        }

        let mut state = self.state.lock().unwrap();
        state.generation = state.generation.wrapping_add(1);
        state.pending = false;
        state.callback = None;
        state.index_mtime = None;
        state.head_mtime = None;
    }

    fn start_events(&mut self) -> bool {
        // Watch the metadata directory and filter to the two files of
        // interest. Git replaces index and HEAD by lockfile rename, so a
        // watch registered on the file itself goes stale after the first
        // change; the directory watch survives the rename.
        let Some(git_dir) = self.index_path.parent().map(Path::to_path_buf) else {
            return false;
        };

        let state = Arc::clone(&self.state);
        let worktree = self.worktree.clone();
        let debounce = self.debounce;

        let mut watcher = match notify::recommended_watcher(
            move |event: std::result::Result<notify::Event, notify::Error>| match event {
                Ok(event) if is_change(&event.kind) && touches_metadata(&event.paths) => {
                    note_change(&state, &worktree, debounce);
                }
                _ => {}
            },
        ) {
            Ok(watcher) => watcher,
            Err(e) => {
                tracing::debug!(error = %e, "platform notifier unavailable");
                return false;
            }
        };

        if let Err(e) = watcher.watch(&git_dir, RecursiveMode::NonRecursive) {
            tracing::debug!(error = %e, path = %git_dir.display(), "notifier registration failed");
            return false;
        }

        self.events = Some(watcher);
        true
    }

    fn start_polling(&mut self) -> bool {
        if !self.index_path.exists() && !self.head_path.exists() {
            return false;
        }

        {
            // First observation establishes the baseline only.
            let mut state = self.state.lock().unwrap();
            state.index_mtime = mtime(&self.index_path);
            state.head_mtime = mtime(&self.head_path);
        }

        let (stop_tx, stop_rx) = mpsc::channel();
        let state = Arc::clone(&self.state);
        let worktree = self.worktree.clone();
        let index_path = self.index_path.clone();
        let head_path = self.head_path.clone();
        let debounce = self.debounce;
        let interval = self.poll_interval;

        let handle = thread::Builder::new()
            .name(format!("gitstate-poll {}", worktree.display()))
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                        Err(RecvTimeoutError::Timeout) => {}
                    }

                    let index_now = mtime(&index_path);
                    let head_now = mtime(&head_path);
                    let changed = {
                        let mut state = state.lock().unwrap();
                        let changed = newer(state.index_mtime, index_now)
                            || newer(state.head_mtime, head_now);
                        state.index_mtime = index_now.or(state.index_mtime);
                        state.head_mtime = head_now.or(state.head_mtime);
                        changed
                    };
                    if changed {
                        note_change(&state, &worktree, debounce);
                    }
                }
            });

        match handle {
            Ok(handle) => {
                self.poll_thread = Some(handle);
                self.poll_stop = Some(stop_tx);
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "poll thread unavailable");
                false
            }
        }
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Resolve the metadata directory for `worktree`.
///
/// A `.git` directory is the metadata directory itself. A `.git` file is
/// the linked-working-tree pointer: its `gitdir:` line names the real
/// metadata directory, relative paths resolving against the worktree.
fn resolve_git_dir(worktree: &Path) -> Option<PathBuf> {
    let entry = worktree.join(".git");
    let meta = fs::metadata(&entry).ok()?;
    if meta.is_dir() {
        return Some(entry);
    }

    let contents = fs::read_to_string(&entry).ok()?;
    let target = contents
        .lines()
        .find_map(|line| line.strip_prefix("gitdir:"))?
        .trim();
    let target = Path::new(target);
    if target.is_absolute() {
        Some(target.to_path_buf())
    } else {
        Some(worktree.join(target))
    }
}

/// Record one raw change observation, front-debounced.
///
/// The first observation of a burst sets the pending flag and schedules
/// a one-shot timer; observations while a delay is pending are absorbed.
/// The timer is not extended by later observations, so the callback
/// always fires within one debounce interval of the burst's start even
/// under continuous activity.
fn note_change(state: &Arc<Mutex<WatchState>>, worktree: &Path, debounce: Duration) {
    let generation = {
        let mut state = state.lock().unwrap();
        if state.callback.is_none() || state.pending {
            return;
        }
        state.pending = true;
        state.generation
    };

    let state = Arc::clone(state);
    let worktree = worktree.to_path_buf();
    thread::spawn(move || {
        thread::sleep(debounce);

        let callback = {
            let mut state = state.lock().unwrap();
            if state.generation != generation {
                // Stopped (or restarted) while the delay was pending.
                return;
            }
            state.pending = false;
            state.callback.clone()
        };
        if let Some(callback) = callback {
            callback(&worktree);
        }
    });
}

fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

/// Whether any event path names the index file or the HEAD reference.
/// The watch is non-recursive on the metadata directory, so matching the
/// final component is exact.
fn touches_metadata(paths: &[PathBuf]) -> bool {
    paths.iter().any(|path| {
        matches!(
            path.file_name().and_then(|name| name.to_str()),
            Some("index" | "HEAD")
        )
    })
}

fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// A change is a strictly later timestamp than the last observation. A
/// first observation (no previous timestamp) is baseline only.
fn newer(last: Option<SystemTime>, now: Option<SystemTime>) -> bool {
    match (last, now) {
        (Some(last), Some(now)) => now > last,
        _ => false,
    }
}
