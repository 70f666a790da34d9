//! Git repository fixtures at three realism levels.
//!
//! Choose the lowest-realism fixture that satisfies your test's needs —
//! fakes are faster and have fewer external dependencies.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Creates a minimal `.git` directory structure **without** initialising a
/// real git repository.
///
/// Realism level: **FAKE** — directory structure only, no git object store.
///
/// Use for: tests that need `index`/`HEAD` files to exist under `.git` (path
/// resolution, watcher registration) but perform no real git operations.
///
/// # Panics
/// Panics if the filesystem operations fail.
pub fn fake_git_dir(path: &Path) {
    fs::create_dir(path.join(".git"))
        .unwrap_or_else(|e| panic!("fake_git_dir: failed to create .git: {e}"));
    fs::write(path.join(".git/HEAD"), "ref: refs/heads/main\n")
        .unwrap_or_else(|e| panic!("fake_git_dir: failed to write HEAD: {e}"));
    fs::write(path.join(".git/index"), "")
        .unwrap_or_else(|e| panic!("fake_git_dir: failed to write index: {e}"));
}

/// A temporary working tree backed by a real git repository, with helpers
/// for staging and committing through `git2`.
///
/// Realism level: **REAL** — valid git object store; history is whatever
/// the test builds.
///
/// The repository gets a local `user.name`/`user.email` so signature
/// lookups never depend on the host's global config.
///
/// # Example
///
/// ```rust,no_run
/// use gitstate_test_utils::TestRepo;
///
/// let repo = TestRepo::new();
/// repo.stage_file("notes.txt", "one\ntwo\n");
/// let oid = repo.commit_staged("add notes");
/// assert_eq!(oid.to_string().len(), 40);
/// ```
pub struct TestRepo {
    temp_dir: TempDir,
    repo: git2::Repository,
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRepo {
    /// Initialise a fresh repository with a test identity and no commits.
    ///
    /// # Panics
    /// Panics if init or config writes fail.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("TestRepo: failed to create temp dir");
        let repo = git2::Repository::init(temp_dir.path())
            .expect("TestRepo: failed to init git repository");

        {
            let mut config = repo.config().expect("TestRepo: failed to open config");
            config
                .set_str("user.name", "Test User")
                .expect("TestRepo: failed to set user.name");
            config
                .set_str("user.email", "test@test.com")
                .expect("TestRepo: failed to set user.email");
        }

        Self { temp_dir, repo }
    }

    /// Working-tree root.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The underlying `git2` repository, for fixture-level plumbing.
    pub fn raw(&self) -> &git2::Repository {
        &self.repo
    }

    /// Write `contents` to `name` under the working tree and stage it.
    ///
    /// # Panics
    /// Panics if the write or index update fails.
    pub fn stage_file(&self, name: &str, contents: &str) {
        let file_path = self.root().join(name);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("TestRepo: failed to create {}: {e}", parent.display()));
        }
        fs::write(&file_path, contents)
            .unwrap_or_else(|e| panic!("TestRepo: failed to write {name}: {e}"));

        let mut index = self.repo.index().expect("TestRepo: failed to open index");
        index
            .add_path(Path::new(name))
            .unwrap_or_else(|e| panic!("TestRepo: failed to stage {name}: {e}"));
        index.write().expect("TestRepo: failed to write index");
    }

    /// Commit whatever is currently staged, parented on HEAD if present.
    ///
    /// # Panics
    /// Panics if any git operation fails.
    pub fn commit_staged(&self, message: &str) -> git2::Oid {
        let mut index = self.repo.index().expect("TestRepo: failed to open index");
        let tree_id = index.write_tree().expect("TestRepo: failed to write tree");
        let tree = self
            .repo
            .find_tree(tree_id)
            .expect("TestRepo: failed to find tree");
        let sig = self
            .repo
            .signature()
            .expect("TestRepo: failed to build signature");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap_or_else(|e| panic!("TestRepo: failed to commit: {e}"))
    }

    /// Stage a file and commit it in one step.
    pub fn commit_file(&self, name: &str, contents: &str, message: &str) -> git2::Oid {
        self.stage_file(name, contents);
        self.commit_staged(message)
    }

    /// Create a local branch named `name` at HEAD.
    ///
    /// # Panics
    /// Panics if HEAD is unborn or branch creation fails.
    pub fn create_branch(&self, name: &str) {
        let head = self
            .repo
            .head()
            .expect("TestRepo: HEAD required to branch")
            .peel_to_commit()
            .expect("TestRepo: failed to peel HEAD");
        self.repo
            .branch(name, &head, false)
            .unwrap_or_else(|e| panic!("TestRepo: failed to create branch {name}: {e}"));
    }

    /// Add a linked working tree named `name` at `at` (which must not
    /// exist yet — put it inside a `TempDir` the test owns).
    ///
    /// The linked tree's `.git` entry is a pointer file naming a metadata
    /// directory under the primary repository's gitdir. Requires at least
    /// one commit.
    ///
    /// # Panics
    /// Panics if worktree creation fails.
    pub fn add_linked_worktree(&self, name: &str, at: &Path) -> PathBuf {
        self.repo
            .worktree(name, at, None)
            .unwrap_or_else(|e| panic!("TestRepo: failed to add worktree {name}: {e}"));
        at.to_path_buf()
    }
}
