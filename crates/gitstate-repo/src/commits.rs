//! Materialized commit and signature snapshots.
//!
//! Everything here copies its scalar/string data out of the native
//! objects, so values stay valid after the repository handle that
//! produced them is gone.

use chrono::{DateTime, TimeZone, Utc};

/// Name/email/timestamp triple from a commit or repository config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub when: DateTime<Utc>,
}

impl Signature {
    pub(crate) fn from_git(sig: &git2::Signature<'_>) -> Self {
        Self {
            name: sig.name().unwrap_or("Unknown").to_string(),
            email: sig.email().unwrap_or("").to_string(),
            when: timestamp(sig.when().seconds()),
        }
    }
}

/// Committer identity without a timestamp, for display surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    pub name: String,
    pub email: String,
}

/// Snapshot of one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Full hex object id
    pub oid: String,

    /// Abbreviated object id (7 characters)
    pub short_oid: String,

    /// Full commit message
    pub message: String,

    /// First line of the commit message
    pub summary: String,

    pub author: Signature,
    pub committer: Signature,

    /// Number of parents (0 for a root commit)
    pub parent_count: usize,

    /// Full hex ids of the parents, in order
    pub parent_ids: Vec<String>,

    /// Commit timestamp
    pub time: DateTime<Utc>,
}

impl CommitInfo {
    pub(crate) fn from_commit(commit: &git2::Commit<'_>) -> Self {
        let oid = commit.id();
        let message = commit.message().unwrap_or("").to_string();
        let summary = message.lines().next().unwrap_or("").to_string();

        Self {
            oid: oid.to_string(),
            short_oid: format!("{:.7}", oid),
            message,
            summary,
            author: Signature::from_git(&commit.author()),
            committer: Signature::from_git(&commit.committer()),
            parent_count: commit.parent_count(),
            parent_ids: commit.parent_ids().map(|id| id.to_string()).collect(),
            time: timestamp(commit.time().seconds()),
        }
    }

    /// Whether this is the first commit in the repository's history.
    pub fn is_root(&self) -> bool {
        self.parent_count == 0
    }
}

/// Diff statistics for one commit versus its first parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

fn timestamp(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).single().unwrap_or_default()
}
