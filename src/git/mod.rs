//! Git operations abstraction layer
//!
//! This module provides a trait-based abstraction over the git operations
//! the release pipeline needs, allowing the orchestration to run against a
//! real repository or an in-memory one.
//!
//! # Overview
//!
//! The primary abstraction is the [Repository] trait, a narrow capability
//! set: inspect the work tree, query remotes and ancestry, commit, tag,
//! branch, check out, revert and merge. The implementations are:
//!
//! - [repository::Git2Repository]: A real implementation using the `git2` crate
//! - [mock::MockRepository]: An in-memory commit graph for testing
//!
//! # Usage
//!
//! Pipeline code depends on the [Repository] trait only.
//!
//! ```rust
//! # use git_release::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> git_release::Result<()> {
//! if repo.is_worktree_clean()? {
//!     let head = repo.head_oid()?;
//!     println!("{} is at {}", repo.current_branch()?, head);
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::domain::Tag;
use crate::error::Result;
use git2::Oid;
use std::path::{Path, PathBuf};

/// A configured remote and its URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
    pub name: String,
    pub fetch_url: String,
    /// Falls back to the fetch URL when no push URL is configured
    pub push_url: String,
}

/// Version-control capabilities used by the release pipeline
///
/// State queries are never cached by implementations: every call reflects
/// the repository as it is at that moment.
///
/// ## Error Handling
///
/// All methods return [crate::error::Result<T>]. Implementations map
/// underlying errors (like `git2::Error`) to the appropriate
/// [crate::error::GitReleaseError] variants.
pub trait Repository {
    /// Root of the work tree
    fn workdir(&self) -> Result<PathBuf>;

    /// The repository's `.git` directory
    fn git_dir(&self) -> PathBuf;

    /// Name of the checked-out branch; fails on a detached HEAD
    fn current_branch(&self) -> Result<String>;

    /// Commit HEAD points at
    fn head_oid(&self) -> Result<Oid>;

    /// True when no tracked file has staged or unstaged changes; untracked
    /// files do not count
    fn is_worktree_clean(&self) -> Result<bool>;

    /// True when `path` (relative to the work tree) differs from HEAD
    fn is_path_modified(&self, path: &Path) -> Result<bool>;

    /// All configured remotes
    fn list_remotes(&self) -> Result<Vec<RemoteInfo>>;

    /// Refresh remote-tracking branches and tags from `remote`
    fn fetch(&self, remote: &str) -> Result<()>;

    /// Ask `remote` itself whether it has the tag `tag`
    fn remote_tag_exists(&self, remote: &str, tag: &str) -> Result<bool>;

    /// Commit of the remote-tracking branch `remote/branch`, as of the last fetch
    fn remote_branch_head(&self, remote: &str, branch: &str) -> Result<Option<Oid>>;

    /// True when `commit` is `ancestor` or has it in its history
    fn is_descendant_of(&self, commit: Oid, ancestor: Oid) -> Result<bool>;

    /// Parents of `commit`, first parent first
    fn commit_parents(&self, commit: Oid) -> Result<Vec<Oid>>;

    /// Whether the local branch `name` exists
    fn branch_exists(&self, name: &str) -> Result<bool>;

    /// Read a work tree file
    fn read_worktree_file(&self, path: &Path) -> Result<String>;

    /// Overwrite a work tree file
    fn write_worktree_file(&self, path: &Path, contents: &str) -> Result<()>;

    /// Untracked, non-ignored files in the work tree
    fn untracked_paths(&self) -> Result<Vec<PathBuf>>;

    /// Stage every change to tracked files, plus the untracked `new_paths`,
    /// and commit it on HEAD. Other untracked files are left alone.
    fn commit_tracked(&self, new_paths: &[&Path], message: &str) -> Result<Oid>;

    /// Stage only `paths` and commit them on HEAD
    fn commit_paths(&self, paths: &[&Path], message: &str) -> Result<Oid>;

    /// Create an annotated tag; fails if the tag already exists
    fn create_annotated_tag(&self, tag: &Tag) -> Result<Oid>;

    /// Create a local branch at `target`; fails if it already exists
    fn create_branch(&self, name: &str, target: Oid) -> Result<()>;

    /// Delete a local branch that is not checked out
    fn delete_branch(&self, name: &str) -> Result<()>;

    /// Check out a local branch without discarding local modifications
    fn checkout_branch(&self, name: &str) -> Result<()>;

    /// Commit the inverse of `commit` on HEAD
    fn revert_commit(&self, commit: Oid) -> Result<Oid>;

    /// Merge local branch `branch` into HEAD, taking `branch`'s side of any
    /// conflicting hunk, and commit the result with both parents
    fn merge_favoring_incoming(&self, branch: &str, message: &str) -> Result<Oid>;
}
