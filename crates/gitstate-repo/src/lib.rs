//! libgit2 wrapper for the git state sync layer
//!
//! Owns repository handles, porcelain-level operations (commit, log,
//! diff stats, reset), and the typed error taxonomy they surface.

pub mod commits;
pub mod error;
pub mod operations;
pub mod repository;

pub use commits::{CommitInfo, DiffStats, Signature, SignatureInfo};
pub use error::{Error, Result};
pub use operations::{ResetMode, StatusSummary};
pub use repository::RepositoryHandle;
