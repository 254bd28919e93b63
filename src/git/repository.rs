use crate::domain::tag::tag_refname;
use crate::domain::Tag;
use crate::error::{GitReleaseError, Result};
use crate::git::RemoteInfo;
use git2::build::CheckoutBuilder;
use git2::{
    BranchType, Commit, Direction, ErrorCode, FileFavor, Index, MergeOptions,
    ObjectType, Oid, Repository as Git2Repo, Signature, StatusOptions, Tree,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository with a work tree
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        if repo.is_bare() {
            return Err(GitReleaseError::config(
                "cannot release from a bare repository",
            ));
        }

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    /// Access the underlying git2 repository
    pub fn inner(&self) -> &Git2Repo {
        &self.repo
    }

    fn head_commit(&self) -> Result<Commit<'_>> {
        Ok(self.repo.head()?.peel_to_commit()?)
    }

    fn signature(&self) -> Result<Signature<'static>> {
        self.repo.signature().map_err(|e| {
            GitReleaseError::config(format!(
                "cannot determine committer identity (set user.name and user.email): {}",
                e
            ))
        })
    }

    /// Commit the tree of `index` on HEAD, refusing empty commits
    fn commit_index(&self, index: &mut Index, message: &str) -> Result<Oid> {
        let tree_id = index.write_tree()?;
        let parent = self.head_commit()?;
        if parent.tree_id() == tree_id {
            return Err(GitReleaseError::NothingToCommit);
        }

        let tree = self.repo.find_tree(tree_id)?;
        let sig = self.signature()?;
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])?;
        Ok(oid)
    }

    /// Move the work tree and index to `tree`, then commit it on HEAD
    fn checkout_and_commit(&self, tree: &Tree<'_>, message: &str, parents: &[&Commit<'_>]) -> Result<Oid> {
        let mut opts = CheckoutBuilder::new();
        opts.safe();
        self.repo.checkout_tree(tree.as_object(), Some(&mut opts))?;

        let sig = self.signature()?;
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, tree, parents)?;
        Ok(oid)
    }

    fn absolute(&self, path: &Path) -> Result<PathBuf> {
        Ok(super::Repository::workdir(self)?.join(path))
    }
}

/// Credential callbacks shared by fetch and ls-remote.
///
/// Supports SSH authentication via keys from ~/.ssh/, the SSH agent, or
/// git's default credential helpers.
fn remote_callbacks<'a>() -> git2::RemoteCallbacks<'a> {
    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, allowed_types| {
        if allowed_types.contains(git2::CredentialType::SSH_KEY) {
            let username = username_from_url.unwrap_or("git");

            if let Some(home) = dirs::home_dir() {
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = home.join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = git2::Cred::ssh_key(username, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }

            if let Ok(cred) = git2::Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
        }

        git2::Cred::default()
    });
    callbacks
}

impl super::Repository for Git2Repository {
    fn workdir(&self) -> Result<PathBuf> {
        self.repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| GitReleaseError::config("repository has no work tree"))
    }

    fn git_dir(&self) -> PathBuf {
        self.repo.path().to_path_buf()
    }

    fn current_branch(&self) -> Result<String> {
        let head = self.repo.head()?;
        if !head.is_branch() {
            return Err(GitReleaseError::branch(
                "HEAD is detached; check out a branch before releasing",
            ));
        }

        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| GitReleaseError::branch("current branch name is not valid UTF-8"))
    }

    fn head_oid(&self) -> Result<Oid> {
        Ok(self.head_commit()?.id())
    }

    fn is_worktree_clean(&self) -> Result<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(statuses.is_empty())
    }

    fn is_path_modified(&self, path: &Path) -> Result<bool> {
        let status = self.repo.status_file(path)?;
        Ok(!status.is_empty() && !status.is_ignored())
    }

    fn list_remotes(&self) -> Result<Vec<RemoteInfo>> {
        let names = self.repo.remotes()?;
        let mut remotes = Vec::new();

        for name in names.iter().flatten() {
            let remote = self.repo.find_remote(name)?;
            let fetch_url = remote.url().unwrap_or_default().to_string();
            let push_url = remote
                .pushurl()
                .map(str::to_string)
                .unwrap_or_else(|| fetch_url.clone());

            remotes.push(RemoteInfo {
                name: name.to_string(),
                fetch_url,
                push_url,
            });
        }

        Ok(remotes)
    }

    fn fetch(&self, remote_name: &str) -> Result<()> {
        let mut remote = self.repo.find_remote(remote_name).map_err(|e| {
            GitReleaseError::remote(format!("Cannot find remote '{}': {}", remote_name, e))
        })?;

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks());

        // All branches into remote-tracking refs, plus every tag
        let refspec_heads = format!("+refs/heads/*:refs/remotes/{}/*", remote_name);
        let refspecs = [refspec_heads.as_str(), "+refs/tags/*:refs/tags/*"];
        remote
            .fetch(&refspecs, Some(&mut fetch_options), None)
            .map_err(|e| {
                GitReleaseError::remote(format!("Fetch from '{}' failed: {}", remote_name, e))
            })?;

        Ok(())
    }

    fn remote_tag_exists(&self, remote_name: &str, tag: &str) -> Result<bool> {
        let mut remote = self.repo.find_remote(remote_name).map_err(|e| {
            GitReleaseError::remote(format!("Cannot find remote '{}': {}", remote_name, e))
        })?;

        let connection = remote
            .connect_auth(Direction::Fetch, Some(remote_callbacks()), None)
            .map_err(|e| {
                GitReleaseError::remote(format!("Cannot connect to '{}': {}", remote_name, e))
            })?;

        let refname = tag_refname(tag);
        let exists = connection
            .list()?
            .iter()
            .any(|head| head.name() == refname);

        Ok(exists)
    }

    fn remote_branch_head(&self, remote: &str, branch: &str) -> Result<Option<Oid>> {
        let refname = format!("refs/remotes/{}/{}", remote, branch);
        match self.repo.find_reference(&refname) {
            Ok(reference) => Ok(Some(reference.peel_to_commit()?.id())),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn is_descendant_of(&self, commit: Oid, ancestor: Oid) -> Result<bool> {
        Ok(commit == ancestor || self.repo.graph_descendant_of(commit, ancestor)?)
    }

    fn commit_parents(&self, commit: Oid) -> Result<Vec<Oid>> {
        Ok(self.repo.find_commit(commit)?.parent_ids().collect())
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        match self.repo.find_branch(name, BranchType::Local) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn read_worktree_file(&self, path: &Path) -> Result<String> {
        let absolute = self.absolute(path)?;
        fs::read_to_string(&absolute).map_err(|e| {
            GitReleaseError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })
    }

    fn write_worktree_file(&self, path: &Path, contents: &str) -> Result<()> {
        fs::write(self.absolute(path)?, contents)?;
        Ok(())
    }

    fn untracked_paths(&self) -> Result<Vec<PathBuf>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(statuses
            .iter()
            .filter(|entry| entry.status().is_wt_new())
            .filter_map(|entry| entry.path().map(PathBuf::from))
            .collect())
    }

    fn commit_tracked(&self, new_paths: &[&Path], message: &str) -> Result<Oid> {
        let mut index = self.repo.index()?;
        index.update_all(["*"].iter(), None)?;
        for path in new_paths {
            index.add_path(path)?;
        }
        index.write()?;

        self.commit_index(&mut index, message)
    }

    fn commit_paths(&self, paths: &[&Path], message: &str) -> Result<Oid> {
        let mut index = self.repo.index()?;
        for path in paths {
            if self.absolute(path)?.exists() {
                index.add_path(path)?;
            } else {
                index.remove_path(path)?;
            }
        }
        index.write()?;

        self.commit_index(&mut index, message)
    }

    fn create_annotated_tag(&self, tag: &Tag) -> Result<Oid> {
        let target = self.repo.find_object(tag.target, Some(ObjectType::Commit))?;
        let sig = self.signature()?;

        let oid = self
            .repo
            .tag(&tag.name, &target, &sig, &tag.message, false)
            .map_err(|e| {
                if e.code() == ErrorCode::Exists {
                    GitReleaseError::LocalTagExists(tag.name.clone())
                } else {
                    e.into()
                }
            })?;

        Ok(oid)
    }

    fn create_branch(&self, name: &str, target: Oid) -> Result<()> {
        let commit = self.repo.find_commit(target)?;
        self.repo.branch(name, &commit, false).map_err(|e| {
            if e.code() == ErrorCode::Exists {
                GitReleaseError::branch(format!("branch '{}' already exists", name))
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        let mut branch = self.repo.find_branch(name, BranchType::Local).map_err(|e| {
            GitReleaseError::branch(format!("Cannot find branch '{}': {}", name, e))
        })?;
        branch.delete()?;
        Ok(())
    }

    fn checkout_branch(&self, name: &str) -> Result<()> {
        let refname = format!("refs/heads/{}", name);
        let target = self
            .repo
            .find_reference(&refname)
            .map_err(|e| GitReleaseError::branch(format!("Cannot find branch '{}': {}", name, e)))?
            .peel_to_commit()?;

        let mut opts = CheckoutBuilder::new();
        opts.safe();
        self.repo.checkout_tree(target.as_object(), Some(&mut opts))?;
        self.repo.set_head(&refname)?;
        Ok(())
    }

    fn revert_commit(&self, commit: Oid) -> Result<Oid> {
        let reverted = self.repo.find_commit(commit)?;
        let head = self.head_commit()?;

        let mut index = self.repo.revert_commit(&reverted, &head, 0, None)?;
        if index.has_conflicts() {
            return Err(GitReleaseError::Revert(commit.to_string()));
        }

        let tree_id = index.write_tree_to(&self.repo)?;
        let tree = self.repo.find_tree(tree_id)?;
        let message = format!(
            "Revert \"{}\"\n\nThis reverts commit {}.\n",
            reverted.summary().unwrap_or_default(),
            commit
        );

        self.checkout_and_commit(&tree, &message, &[&head])
    }

    fn merge_favoring_incoming(&self, branch: &str, message: &str) -> Result<Oid> {
        let ours = self.head_commit()?;
        let theirs = self
            .repo
            .find_branch(branch, BranchType::Local)
            .map_err(|e| GitReleaseError::branch(format!("Cannot find branch '{}': {}", branch, e)))?
            .get()
            .peel_to_commit()?;

        let mut opts = MergeOptions::new();
        opts.file_favor(FileFavor::Theirs);

        let mut index = self.repo.merge_commits(&ours, &theirs, Some(&opts))?;
        if index.has_conflicts() {
            let paths = index
                .conflicts()?
                .filter_map(|conflict| conflict.ok())
                .filter_map(|conflict| conflict.our.or(conflict.their).or(conflict.ancestor))
                .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
                .collect();
            return Err(GitReleaseError::MergeConflict {
                branch: branch.to_string(),
                paths,
            });
        }

        let tree_id = index.write_tree_to(&self.repo)?;
        let tree = self.repo.find_tree(tree_id)?;

        self.checkout_and_commit(&tree, message, &[&ours, &theirs])
    }
}
