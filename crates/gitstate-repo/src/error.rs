//! Error types for gitstate-repo
//!
//! libgit2 reports failures as a numeric code, an error class, and a
//! thread-local message. [`from_git`] folds those plus the attempted
//! operation's context string into one closed set of typed errors.

use std::path::PathBuf;

use git2::{ErrorClass, ErrorCode};

/// Result type for gitstate-repo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gitstate-repo operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not a git repository: {path}")]
    NotARepository { path: PathBuf },

    #[error("Repository path does not exist: {path}")]
    RepositoryPathMissing { path: PathBuf },

    #[error("Repository is corrupted: {message}")]
    RepositoryCorrupted { message: String },

    #[error("Worktree not found: {message}")]
    WorktreeNotFound { message: String },

    #[error("Worktree already exists: {message}")]
    WorktreeExists { message: String },

    #[error("Worktree is locked: {message}")]
    WorktreeLocked { message: String },

    #[error("Branch not found: {message}")]
    BranchNotFound { message: String },

    #[error("Branch already exists: {message}")]
    BranchExists { message: String },

    #[error("Reference not found: {message}")]
    ReferenceNotFound { message: String },

    #[error("Merge conflict: {message}")]
    MergeConflict { message: String },

    #[error("Uncommitted changes: {message}")]
    UncommittedChanges { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Invalid path: {path}")]
    InvalidPath { path: PathBuf },

    #[error("Index error: {message}")]
    Index { message: String },

    #[error("Checkout failed: {message}")]
    Checkout { message: String },

    #[error("Git error {code}: {message}")]
    Unknown { code: i32, message: String },
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        from_git(&err, "")
    }
}

/// Map a libgit2 error plus the context of the attempted operation into a
/// typed [`Error`].
///
/// Ambiguous codes (not-found, already-exists) are disambiguated by
/// substring matches against `context` — e.g. a not-found raised while
/// looking up a branch carries "branch" in its context and becomes
/// [`Error::BranchNotFound`].
pub fn from_git(err: &git2::Error, context: &str) -> Error {
    let message = if err.message().is_empty() {
        context.to_string()
    } else {
        err.message().to_string()
    };

    match err.code() {
        ErrorCode::NotFound => {
            if context.contains("worktree") {
                Error::WorktreeNotFound { message }
            } else if context.contains("branch") {
                Error::BranchNotFound { message }
            } else if context.contains("reference") {
                Error::ReferenceNotFound { message }
            } else {
                Error::Unknown {
                    code: err.raw_code(),
                    message,
                }
            }
        }
        ErrorCode::Exists => {
            if context.contains("worktree") {
                Error::WorktreeExists { message }
            } else if context.contains("branch") {
                Error::BranchExists { message }
            } else {
                Error::Unknown {
                    code: err.raw_code(),
                    message,
                }
            }
        }
        ErrorCode::Locked => Error::WorktreeLocked { message },
        ErrorCode::Conflict | ErrorCode::MergeConflict => Error::MergeConflict { message },
        ErrorCode::Uncommitted | ErrorCode::Modified => Error::UncommittedChanges { message },
        ErrorCode::Auth | ErrorCode::Certificate => Error::AuthenticationFailed { message },
        _ => match err.class() {
            ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssh => Error::Network { message },
            ErrorClass::Index => Error::Index { message },
            ErrorClass::Checkout => Error::Checkout { message },
            ErrorClass::Repository => Error::RepositoryCorrupted { message },
            _ => Error::Unknown {
                code: err.raw_code(),
                message,
            },
        },
    }
}

/// Check a raw libgit2 return code, raising the mapped error for failures.
///
/// Non-negative codes are success (or a count) and pass through. Negative
/// codes go through the same disambiguation as [`from_git`]; codes outside
/// the documented set become [`Error::Unknown`] carrying the original
/// value.
pub fn check(code: i32, context: &str) -> Result<()> {
    if code >= 0 {
        return Ok(());
    }
    match code_from_raw(code) {
        ErrorCode::GenericError => Err(Error::Unknown {
            code,
            message: context.to_string(),
        }),
        known => Err(from_git(
            &git2::Error::new(known, ErrorClass::None, context),
            context,
        )),
    }
}

/// Raw libgit2 error codes, per `git_error_code` in git2/errors.h.
fn code_from_raw(code: i32) -> ErrorCode {
    match code {
        -3 => ErrorCode::NotFound,
        -4 => ErrorCode::Exists,
        -13 => ErrorCode::Conflict,
        -14 => ErrorCode::Locked,
        -16 => ErrorCode::Auth,
        -22 => ErrorCode::Uncommitted,
        -24 => ErrorCode::MergeConflict,
        _ => ErrorCode::GenericError,
    }
}
