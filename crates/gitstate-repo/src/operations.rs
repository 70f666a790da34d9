//! Porcelain-level operations over a [`RepositoryHandle`].
//!
//! All functions are stateless; repository state lives in the native
//! object reached through the handle. Handles are not safe for
//! unsynchronized concurrent use — callers run one operation per handle
//! at a time.

use git2::{BranchType, ErrorCode, Oid, Status, StatusOptions};

use crate::commits::{CommitInfo, DiffStats};
use crate::error::{self, Error, Result};
use crate::repository::RepositoryHandle;

/// How far [`reset`] rewinds repository state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResetMode {
    /// Move HEAD only
    Soft,
    /// Move HEAD and reset the index
    #[default]
    Mixed,
    /// Move HEAD, reset the index, and force-overwrite the working tree
    Hard,
}

/// Staged/unstaged/untracked entry counts for one working tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSummary {
    pub staged: usize,
    pub unstaged: usize,
    pub untracked: usize,
}

/// Create a commit from the current index, or amend the HEAD commit.
///
/// Without `amend`, at least one staged entry is required unless this is
/// the repository's very first commit. Amending rewrites the HEAD commit
/// in place, preserving the original author and refreshing the
/// committer. Returns the new commit's full hex id.
pub fn commit(repo: &RepositoryHandle, message: &str, amend: bool) -> Result<String> {
    let git = repo.raw();
    let mut index = git
        .index()
        .map_err(|e| error::from_git(&e, "commit index"))?;

    let head_commit = match git.head() {
        Ok(head) => Some(
            head.peel_to_commit()
                .map_err(|e| error::from_git(&e, "commit parent"))?,
        ),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
        Err(e) => return Err(error::from_git(&e, "commit")),
    };

    if !amend && let Some(parent) = &head_commit {
        let parent_tree = parent
            .tree()
            .map_err(|e| error::from_git(&e, "commit parent tree"))?;
        let staged = git
            .diff_tree_to_index(Some(&parent_tree), Some(&index), None)
            .map_err(|e| error::from_git(&e, "commit staged check"))?;
        if staged.deltas().len() == 0 {
            return Err(Error::Index {
                message: "no staged changes to commit".to_string(),
            });
        }
    }

    let tree_id = index
        .write_tree()
        .map_err(|e| error::from_git(&e, "commit write-tree"))?;
    let tree = git
        .find_tree(tree_id)
        .map_err(|e| error::from_git(&e, "commit tree"))?;

    let oid = if amend {
        let head_commit = head_commit.ok_or_else(|| Error::ReferenceNotFound {
            message: "cannot amend: repository has no commits".to_string(),
        })?;
        let committer = git
            .signature()
            .map_err(|e| error::from_git(&e, "commit signature"))?;
        // author: None keeps the original author on the amended commit
        head_commit
            .amend(
                Some("HEAD"),
                None,
                Some(&committer),
                None,
                Some(message),
                Some(&tree),
            )
            .map_err(|e| error::from_git(&e, "commit amend"))?
    } else {
        let sig = git
            .signature()
            .map_err(|e| error::from_git(&e, "commit signature"))?;
        let parents: Vec<&git2::Commit<'_>> = head_commit.iter().collect();
        git.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .map_err(|e| error::from_git(&e, "commit"))?
    };

    tracing::debug!(oid = %oid, amend, "created commit");
    Ok(oid.to_string())
}

/// Walk history from HEAD, newest first, skipping `skip` commits and
/// collecting up to `limit` snapshots.
///
/// An empty repository returns an empty list — a normal state, not a
/// failure.
pub fn log(repo: &RepositoryHandle, limit: usize, skip: usize) -> Result<Vec<CommitInfo>> {
    let git = repo.raw();

    let head = match git.head() {
        Ok(head) => head,
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
            return Ok(Vec::new());
        }
        Err(e) => return Err(error::from_git(&e, "log reference HEAD")),
    };
    let tip = head
        .peel_to_commit()
        .map_err(|e| error::from_git(&e, "log"))?;

    let mut revwalk = git.revwalk().map_err(|e| error::from_git(&e, "log"))?;
    revwalk
        .push(tip.id())
        .map_err(|e| error::from_git(&e, "log"))?;
    revwalk
        .set_sorting(git2::Sort::TIME)
        .map_err(|e| error::from_git(&e, "log"))?;

    let mut commits = Vec::with_capacity(limit);
    for oid in revwalk.skip(skip).take(limit) {
        let oid = oid.map_err(|e| error::from_git(&e, "log walk"))?;
        let commit = git
            .find_commit(oid)
            .map_err(|e| error::from_git(&e, "log commit"))?;
        commits.push(CommitInfo::from_commit(&commit));
    }

    Ok(commits)
}

/// Look up one commit by hex id and materialize a snapshot.
pub fn find_commit(repo: &RepositoryHandle, hash: &str) -> Result<CommitInfo> {
    let oid = Oid::from_str(hash).map_err(|e| error::from_git(&e, "reference lookup"))?;
    let commit = repo
        .raw()
        .find_commit(oid)
        .map_err(|e| error::from_git(&e, "reference lookup"))?;
    Ok(CommitInfo::from_commit(&commit))
}

/// Diff statistics for one commit versus its first parent.
///
/// A root commit diffs against the empty tree, so its stats are the full
/// introduced content.
pub fn commit_stats(repo: &RepositoryHandle, hash: &str) -> Result<DiffStats> {
    let git = repo.raw();
    let oid = Oid::from_str(hash).map_err(|e| error::from_git(&e, "reference lookup"))?;
    let commit = git
        .find_commit(oid)
        .map_err(|e| error::from_git(&e, "reference lookup"))?;

    let tree = commit
        .tree()
        .map_err(|e| error::from_git(&e, "diff tree"))?;
    let parent_tree = match commit.parent(0) {
        Ok(parent) => Some(
            parent
                .tree()
                .map_err(|e| error::from_git(&e, "diff parent tree"))?,
        ),
        Err(_) => None,
    };

    let diff = git
        .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
        .map_err(|e| error::from_git(&e, "diff"))?;
    let stats = diff
        .stats()
        .map_err(|e| error::from_git(&e, "diff stats"))?;

    Ok(DiffStats {
        files_changed: stats.files_changed(),
        insertions: stats.insertions(),
        deletions: stats.deletions(),
    })
}

/// Resolve `target` (any revision expression) and reset to it.
///
/// Hard reset passes a forced checkout so conflicting local
/// modifications never block it, matching destructive reset semantics.
pub fn reset(repo: &RepositoryHandle, target: &str, mode: ResetMode) -> Result<()> {
    let git = repo.raw();
    let object = git
        .revparse_single(target)
        .map_err(|e| error::from_git(&e, "reference lookup"))?;

    tracing::debug!(target, ?mode, "resetting repository");
    match mode {
        ResetMode::Soft => git.reset(&object, git2::ResetType::Soft, None),
        ResetMode::Mixed => git.reset(&object, git2::ResetType::Mixed, None),
        ResetMode::Hard => {
            let mut checkout = git2::build::CheckoutBuilder::new();
            checkout.force();
            git.reset(&object, git2::ResetType::Hard, Some(&mut checkout))
        }
    }
    .map_err(|e| error::from_git(&e, "checkout reset"))?;

    Ok(())
}

/// Names of all local branches.
pub fn branches(repo: &RepositoryHandle) -> Result<Vec<String>> {
    let iter = repo
        .raw()
        .branches(Some(BranchType::Local))
        .map_err(|e| error::from_git(&e, "branch list"))?;

    let mut names = Vec::new();
    for entry in iter {
        let (branch, _) = entry.map_err(|e| error::from_git(&e, "branch list"))?;
        if let Some(name) = branch
            .name()
            .map_err(|e| error::from_git(&e, "branch name"))?
        {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Check out a local branch and move HEAD to it.
pub fn checkout_branch(repo: &RepositoryHandle, name: &str) -> Result<()> {
    let git = repo.raw();
    let branch = git
        .find_branch(name, BranchType::Local)
        .map_err(|e| error::from_git(&e, "branch"))?;
    let reference = branch.into_reference();

    let object = reference
        .peel(git2::ObjectType::Commit)
        .map_err(|e| error::from_git(&e, "checkout branch"))?;
    git.checkout_tree(&object, None)
        .map_err(|e| error::from_git(&e, "checkout branch"))?;

    let refname = reference.name().ok_or_else(|| Error::ReferenceNotFound {
        message: format!("branch '{name}' has a non-utf8 reference name"),
    })?;
    git.set_head(refname)
        .map_err(|e| error::from_git(&e, "checkout branch"))?;

    tracing::debug!(branch = name, "checked out branch");
    Ok(())
}

/// Staged/unstaged/untracked counts via the native status machinery.
///
/// This is the expensive read the change watcher exists to gate — call
/// it on debounced notifications, not on raw file events.
pub fn status_summary(repo: &RepositoryHandle) -> Result<StatusSummary> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true);

    let statuses = repo
        .raw()
        .statuses(Some(&mut opts))
        .map_err(|e| error::from_git(&e, "status"))?;

    let mut summary = StatusSummary::default();
    for entry in statuses.iter() {
        let status = entry.status();
        if status.intersects(
            Status::INDEX_NEW
                | Status::INDEX_MODIFIED
                | Status::INDEX_DELETED
                | Status::INDEX_RENAMED
                | Status::INDEX_TYPECHANGE,
        ) {
            summary.staged += 1;
        }
        if status.intersects(
            Status::WT_MODIFIED | Status::WT_DELETED | Status::WT_RENAMED | Status::WT_TYPECHANGE,
        ) {
            summary.unstaged += 1;
        }
        if status.contains(Status::WT_NEW) {
            summary.untracked += 1;
        }
    }
    Ok(summary)
}
