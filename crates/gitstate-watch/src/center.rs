//! Shared watcher registry with per-path fan-out.
//!
//! N subscribers of the same working tree share exactly one
//! [`ChangeWatcher`] — one notifier registration, one polling cost. The
//! watcher's lifecycle is driven entirely by subscriber reference
//! counting: started when the first subscriber arrives, stopped when the
//! last one leaves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use uuid::Uuid;

use crate::watcher::{ChangeCallback, ChangeWatcher, DEBOUNCE, POLL_INTERVAL};

/// Opaque token identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

struct WatcherEntry {
    watcher: ChangeWatcher,
    subscribers: HashMap<SubscriptionId, ChangeCallback>,
}

/// Deduplicates watchers per working-tree path and fans each debounced
/// notification out to every current subscriber.
///
/// Construct one per process and hand it by reference to anything that
/// needs to subscribe. All table access is serialized through a single
/// lock, so subscribe, unsubscribe, and fan-out never race.
pub struct WatchCenter {
    entries: Arc<Mutex<HashMap<PathBuf, WatcherEntry>>>,
    debounce: Duration,
    poll_interval: Duration,
}

impl Default for WatchCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchCenter {
    /// A center whose watchers use the default intervals.
    pub fn new() -> Self {
        Self::with_intervals(DEBOUNCE, POLL_INTERVAL)
    }

    /// A center whose watchers use explicit intervals.
    pub fn with_intervals(debounce: Duration, poll_interval: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            debounce,
            poll_interval,
        }
    }

    /// Register `callback` for changes under `worktree`.
    ///
    /// Reuses the path's existing watcher when one is running; otherwise
    /// creates and starts one. The returned token is the only way to end
    /// the subscription.
    pub fn subscribe(
        &self,
        worktree: impl AsRef<Path>,
        callback: ChangeCallback,
    ) -> SubscriptionId {
        let worktree = worktree.as_ref().to_path_buf();
        let id = SubscriptionId(Uuid::new_v4());

        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(&worktree) {
            entry.subscribers.insert(id, callback);
            tracing::debug!(
                worktree = %worktree.display(),
                subscribers = entry.subscribers.len(),
                "joined existing watcher"
            );
            return id;
        }

        let mut watcher =
            ChangeWatcher::with_intervals(&worktree, self.debounce, self.poll_interval);
        watcher.start(self.fan_out_handler());

        let mut subscribers = HashMap::new();
        subscribers.insert(id, callback);
        entries.insert(
            worktree.clone(),
            WatcherEntry {
                watcher,
                subscribers,
            },
        );
        tracing::debug!(worktree = %worktree.display(), "started watcher");
        id
    }

    /// Drop the subscription `id` for `worktree`.
    ///
    /// Removing the last subscriber stops the watcher and removes the
    /// entry — the only path by which a watcher is stopped, so watchers
    /// never outlive their last interested party.
    pub fn unsubscribe(&self, worktree: impl AsRef<Path>, id: SubscriptionId) {
        let worktree = worktree.as_ref();

        let stopped = {
            let mut entries = self.entries.lock().unwrap();
            let Some(entry) = entries.get_mut(worktree) else {
                return;
            };
            entry.subscribers.remove(&id);
            if entry.subscribers.is_empty() {
                entries.remove(worktree)
            } else {
                None
            }
        };

        // Stop outside the table lock; joining the poll thread can block.
        if let Some(mut entry) = stopped {
            entry.watcher.stop();
            tracing::debug!(worktree = %worktree.display(), "stopped watcher");
        }
    }

    /// Number of current subscribers for `worktree`.
    pub fn subscriber_count(&self, worktree: impl AsRef<Path>) -> usize {
        let entries = self.entries.lock().unwrap();
        entries
            .get(worktree.as_ref())
            .map(|entry| entry.subscribers.len())
            .unwrap_or(0)
    }

    /// Whether a watcher entry currently exists for `worktree`.
    pub fn is_watching(&self, worktree: impl AsRef<Path>) -> bool {
        self.entries.lock().unwrap().contains_key(worktree.as_ref())
    }

    /// The handler every watcher is started with: snapshot the path's
    /// current subscribers under the lock, then invoke them after
    /// releasing it (a callback may itself subscribe or unsubscribe).
    /// A missing entry means the last subscriber left while the debounce
    /// delay was pending — a no-op.
    fn fan_out_handler(&self) -> ChangeCallback {
        let entries: Weak<Mutex<HashMap<PathBuf, WatcherEntry>>> = Arc::downgrade(&self.entries);
        Arc::new(move |worktree: &Path| {
            let Some(entries) = entries.upgrade() else {
                return;
            };
            let callbacks: Vec<ChangeCallback> = {
                let entries = entries.lock().unwrap();
                match entries.get(worktree) {
                    Some(entry) => entry.subscribers.values().cloned().collect(),
                    None => return,
                }
            };
            for callback in callbacks {
                callback(worktree);
            }
        })
    }
}

impl Drop for WatchCenter {
    fn drop(&mut self) {
        // Entries own running watchers; stop them before the table goes.
        let mut entries = self.entries.lock().unwrap();
        for (_, entry) in entries.iter_mut() {
            entry.watcher.stop();
        }
        entries.clear();
    }
}
