//! Debounced git metadata change detection and fan-out
//!
//! [`ChangeWatcher`] monitors one working tree's `index` and `HEAD` for
//! the earliest sign that staged state or the current branch changed;
//! [`WatchCenter`] shares one watcher per working tree across any number
//! of subscribers.

pub mod center;
pub mod watcher;

pub use center::{SubscriptionId, WatchCenter};
pub use watcher::{ChangeCallback, ChangeWatcher, DEBOUNCE, POLL_INTERVAL};
