//! Owning handle over one libgit2 repository.

use std::path::{Path, PathBuf};

use git2::{ErrorCode, Repository};

use crate::commits::{Signature, SignatureInfo};
use crate::error::{self, Error, Result};

/// Exclusive owner of one open native repository.
///
/// The native object lives exactly as long as the handle; a failed
/// constructor returns an error and no partially-valid handle escapes.
/// Operations that mutate repository state live in
/// [`crate::operations`] — every method here is read-only.
pub struct RepositoryHandle {
    path: PathBuf,
    repo: Repository,
}

impl RepositoryHandle {
    /// Open an existing repository at `path`.
    ///
    /// Returns [`Error::RepositoryPathMissing`] when the path does not
    /// exist and [`Error::NotARepository`] when it holds no repository.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::RepositoryPathMissing {
                path: path.to_path_buf(),
            });
        }

        let repo = Repository::open(path).map_err(|e| match e.code() {
            ErrorCode::NotFound => Error::NotARepository {
                path: path.to_path_buf(),
            },
            _ => error::from_git(&e, "open repository"),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            repo,
        })
    }

    /// Initialise a new repository at `path`.
    pub fn init(path: impl AsRef<Path>, bare: bool) -> Result<Self> {
        let path = path.as_ref();
        let repo = if bare {
            Repository::init_bare(path)
        } else {
            Repository::init(path)
        }
        .map_err(|e| error::from_git(&e, "init repository"))?;

        tracing::debug!(path = %path.display(), bare, "initialised repository");
        Ok(Self {
            path: path.to_path_buf(),
            repo,
        })
    }

    /// Clone `url` into `local_path`.
    pub fn clone(url: &str, local_path: impl AsRef<Path>) -> Result<Self> {
        let local_path = local_path.as_ref();
        let repo = Repository::clone(url, local_path)
            .map_err(|e| error::from_git(&e, "clone repository"))?;

        tracing::debug!(url, path = %local_path.display(), "cloned repository");
        Ok(Self {
            path: local_path.to_path_buf(),
            repo,
        })
    }

    /// Walk upward from `from` to find the enclosing repository root.
    ///
    /// Returns the working-tree root for a normal repository, or the
    /// git directory for a bare one.
    pub fn discover(from: impl AsRef<Path>) -> Result<PathBuf> {
        let from = from.as_ref();
        let repo = Repository::discover(from).map_err(|e| match e.code() {
            ErrorCode::NotFound => Error::NotARepository {
                path: from.to_path_buf(),
            },
            _ => error::from_git(&e, "discover repository"),
        })?;

        Ok(repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| repo.path().to_path_buf()))
    }

    /// Whether `path` is inside a git repository. Never fails.
    pub fn is_repository(path: impl AsRef<Path>) -> bool {
        Repository::discover(path).is_ok()
    }

    /// The path this handle was opened against.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Borrow the native repository for use by [`crate::operations`].
    pub fn raw(&self) -> &Repository {
        &self.repo
    }

    pub fn is_bare(&self) -> bool {
        self.repo.is_bare()
    }

    /// Whether the repository has no commits yet.
    pub fn is_empty(&self) -> Result<bool> {
        self.repo
            .is_empty()
            .map_err(|e| error::from_git(&e, "repository state"))
    }

    pub fn is_head_detached(&self) -> Result<bool> {
        self.repo
            .head_detached()
            .map_err(|e| error::from_git(&e, "reference HEAD"))
    }

    /// Working-tree root, absent for bare repositories.
    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// The git metadata directory.
    pub fn gitdir(&self) -> &Path {
        self.repo.path()
    }

    /// Short name of the current branch.
    ///
    /// `None` for detached or unborn HEAD — both are legitimate states,
    /// not errors.
    pub fn current_branch(&self) -> Result<Option<String>> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => Ok(head.shorthand().map(String::from)),
            Ok(_) => Ok(None),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(error::from_git(&e, "reference HEAD")),
        }
    }

    /// Committer identity from repository/global configuration.
    pub fn default_signature(&self) -> Result<Signature> {
        let sig = self
            .repo
            .signature()
            .map_err(|e| error::from_git(&e, "default signature"))?;
        Ok(Signature::from_git(&sig))
    }

    /// Committer identity with placeholders instead of failure.
    ///
    /// Surfaces that only display a name must not fail because
    /// `user.name` is unset.
    pub fn signature_info(&self) -> SignatureInfo {
        match self.repo.signature() {
            Ok(sig) => SignatureInfo {
                name: sig.name().unwrap_or("Unknown").to_string(),
                email: sig.email().unwrap_or("").to_string(),
            },
            Err(_) => SignatureInfo {
                name: "Unknown".to_string(),
                email: String::new(),
            },
        }
    }

    /// Borrow the staging-area index. Dropped when the caller is done.
    pub fn index(&self) -> Result<git2::Index> {
        self.repo.index().map_err(|e| error::from_git(&e, "index"))
    }

    /// Borrow the HEAD reference.
    pub fn head(&self) -> Result<git2::Reference<'_>> {
        self.repo
            .head()
            .map_err(|e| error::from_git(&e, "reference HEAD"))
    }

    /// Borrow the repository configuration.
    pub fn config(&self) -> Result<git2::Config> {
        self.repo
            .config()
            .map_err(|e| error::from_git(&e, "config"))
    }
}

impl std::fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("path", &self.path)
            .field("bare", &self.repo.is_bare())
            .finish()
    }
}
