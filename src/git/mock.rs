use crate::domain::Tag;
use crate::error::{GitReleaseError, Result};
use crate::git::{RemoteInfo, Repository};
use git2::Oid;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

type Snapshot = BTreeMap<PathBuf, String>;

#[derive(Debug, Clone)]
struct MockCommit {
    parents: Vec<Oid>,
    message: String,
    files: Snapshot,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u32,
    commits: HashMap<Oid, MockCommit>,
    branches: BTreeMap<String, Oid>,
    head: String,
    worktree: Snapshot,
    tags: BTreeMap<String, (Oid, String)>,
    remotes: Vec<RemoteInfo>,
    remote_tags: BTreeMap<String, BTreeSet<String>>,
    remote_branches: BTreeMap<(String, String), Oid>,
    tracking: BTreeMap<(String, String), Oid>,
    failures: HashSet<String>,
    merge_conflicts: Vec<String>,
    calls: Vec<String>,
}

/// In-memory repository for testing without actual git operations
///
/// Commits are full file snapshots, so reverts and merges behave like their
/// git counterparts at file granularity. Every trait call is recorded and
/// any operation can be made to fail with [`MockRepository::fail_on`].
pub struct MockRepository {
    state: RefCell<MockState>,
}

impl MockRepository {
    /// Create a repository with one root commit on `master`
    pub fn new() -> Self {
        Self::with_files("master", &[])
    }

    /// Create a repository whose root commit on `branch` contains `files`
    pub fn with_files(branch: &str, files: &[(&str, &str)]) -> Self {
        let snapshot: Snapshot = files
            .iter()
            .map(|(path, contents)| (PathBuf::from(path), contents.to_string()))
            .collect();

        let mut state = MockState {
            head: branch.to_string(),
            worktree: snapshot.clone(),
            ..MockState::default()
        };
        let root = state.insert_commit(Vec::new(), "Initial commit", snapshot);
        state.branches.insert(branch.to_string(), root);

        MockRepository {
            state: RefCell::new(state),
        }
    }

    /// Write a file in the work tree
    pub fn set_worktree_file(&self, path: &str, contents: &str) {
        self.state
            .borrow_mut()
            .worktree
            .insert(PathBuf::from(path), contents.to_string());
    }

    /// Remove a file from the work tree
    pub fn remove_worktree_file(&self, path: &str) {
        self.state.borrow_mut().worktree.remove(Path::new(path));
    }

    /// Write and commit `files` on the current branch, bypassing call recording
    pub fn commit_files(&self, files: &[(&str, &str)], message: &str) -> Oid {
        let mut state = self.state.borrow_mut();
        let parent = state.branches[&state.head];
        let mut snapshot = state.commits[&parent].files.clone();
        for (path, contents) in files {
            let (path, contents) = (PathBuf::from(path), contents.to_string());
            state.worktree.insert(path.clone(), contents.clone());
            snapshot.insert(path, contents);
        }
        let oid = state.insert_commit(vec![parent], message, snapshot);
        let head = state.head.clone();
        state.branches.insert(head, oid);
        oid
    }

    /// Create `branch` at HEAD and switch to it
    pub fn switch_new_branch(&self, branch: &str) {
        let mut state = self.state.borrow_mut();
        let head = state.branches[&state.head];
        state.branches.insert(branch.to_string(), head);
        state.head = branch.to_string();
    }

    /// Register a remote
    pub fn add_remote(&self, name: &str, url: &str) {
        self.state.borrow_mut().remotes.push(RemoteInfo {
            name: name.to_string(),
            fetch_url: url.to_string(),
            push_url: url.to_string(),
        });
    }

    /// Make `tag` exist on `remote`
    pub fn publish_tag(&self, remote: &str, tag: &str) {
        self.state
            .borrow_mut()
            .remote_tags
            .entry(remote.to_string())
            .or_default()
            .insert(tag.to_string());
    }

    /// Make `branch` exist on `remote` at `oid`; visible locally after a fetch
    pub fn publish_branch(&self, remote: &str, branch: &str, oid: Oid) {
        self.state
            .borrow_mut()
            .remote_branches
            .insert((remote.to_string(), branch.to_string()), oid);
    }

    /// Make every subsequent call of `operation` fail
    pub fn fail_on(&self, operation: &str) {
        self.state
            .borrow_mut()
            .failures
            .insert(operation.to_string());
    }

    /// Make the next merges report conflicts in `paths`
    pub fn conflict_on_merge(&self, paths: &[&str]) {
        self.state.borrow_mut().merge_conflicts = paths.iter().map(|p| p.to_string()).collect();
    }

    /// Names of the trait operations called so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    /// Whether `operation` has been called
    pub fn was_called(&self, operation: &str) -> bool {
        self.state.borrow().calls.iter().any(|c| c == operation)
    }

    /// Total number of commits in the graph
    pub fn commit_count(&self) -> usize {
        self.state.borrow().commits.len()
    }

    /// Head of a local branch
    pub fn branch_head(&self, branch: &str) -> Option<Oid> {
        self.state.borrow().branches.get(branch).copied()
    }

    /// Local branch names
    pub fn branches(&self) -> Vec<String> {
        self.state.borrow().branches.keys().cloned().collect()
    }

    /// Commit a local tag points at
    pub fn tag_target(&self, tag: &str) -> Option<Oid> {
        self.state.borrow().tags.get(tag).map(|(oid, _)| *oid)
    }

    /// Annotation message of a local tag
    pub fn tag_message(&self, tag: &str) -> Option<String> {
        self.state.borrow().tags.get(tag).map(|(_, msg)| msg.clone())
    }

    /// Message of a commit
    pub fn commit_message(&self, oid: Oid) -> Option<String> {
        self.state.borrow().commits.get(&oid).map(|c| c.message.clone())
    }

    /// Contents of `path` as of commit `oid`
    pub fn file_at(&self, oid: Oid, path: &str) -> Option<String> {
        self.state
            .borrow()
            .commits
            .get(&oid)
            .and_then(|c| c.files.get(Path::new(path)).cloned())
    }

    /// Contents of `path` in the work tree
    pub fn worktree_file(&self, path: &str) -> Option<String> {
        self.state.borrow().worktree.get(Path::new(path)).cloned()
    }

    fn record(&self, operation: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(operation.to_string());
        if state.failures.contains(operation) {
            return Err(GitReleaseError::Git(git2::Error::from_str(&format!(
                "injected failure in {}",
                operation
            ))));
        }
        Ok(())
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    fn insert_commit(&mut self, parents: Vec<Oid>, message: &str, files: Snapshot) -> Oid {
        self.next_id += 1;
        let mut bytes = [0u8; 20];
        bytes[16..].copy_from_slice(&self.next_id.to_be_bytes());
        let oid = Oid::from_bytes(&bytes).unwrap_or_else(|_| Oid::zero());

        self.commits.insert(
            oid,
            MockCommit {
                parents,
                message: message.to_string(),
                files,
            },
        );
        oid
    }

    fn head_oid(&self) -> Result<Oid> {
        self.branches
            .get(&self.head)
            .copied()
            .ok_or_else(|| GitReleaseError::branch(format!("Branch not found: {}", self.head)))
    }

    fn snapshot(&self, oid: Oid) -> Result<&Snapshot> {
        self.commits
            .get(&oid)
            .map(|c| &c.files)
            .ok_or_else(|| GitReleaseError::branch(format!("Commit not found: {}", oid)))
    }

    fn head_snapshot(&self) -> Result<&Snapshot> {
        self.snapshot(self.head_oid()?)
    }

    fn ancestors(&self, start: Oid) -> HashSet<Oid> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(oid) = queue.pop_front() {
            if seen.insert(oid) {
                if let Some(commit) = self.commits.get(&oid) {
                    queue.extend(commit.parents.iter().copied());
                }
            }
        }
        seen
    }

    fn merge_base(&self, a: Oid, b: Oid) -> Option<Oid> {
        let of_a = self.ancestors(a);
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([b]);
        while let Some(oid) = queue.pop_front() {
            if of_a.contains(&oid) {
                return Some(oid);
            }
            if seen.insert(oid) {
                if let Some(commit) = self.commits.get(&oid) {
                    queue.extend(commit.parents.iter().copied());
                }
            }
        }
        None
    }

    /// Work tree files that HEAD does not track
    fn untracked(&self) -> Result<Snapshot> {
        let head = self.head_snapshot()?;
        Ok(self
            .worktree
            .iter()
            .filter(|(path, _)| !head.contains_key(*path))
            .map(|(path, contents)| (path.clone(), contents.clone()))
            .collect())
    }

    /// Whether every file HEAD tracks is unchanged in the work tree
    fn tracked_clean(&self) -> Result<bool> {
        let head = self.head_snapshot()?;
        Ok(head
            .iter()
            .all(|(path, contents)| self.worktree.get(path) == Some(contents)))
    }

    /// Replace the tracked part of the work tree with `files`, keeping untracked files
    fn reset_worktree(&mut self, files: Snapshot) -> Result<()> {
        let untracked = self.untracked()?;
        if let Some(path) = untracked.keys().find(|p| files.contains_key(*p)) {
            return Err(GitReleaseError::branch(format!(
                "untracked file '{}' would be overwritten",
                path.display()
            )));
        }
        self.worktree = files;
        self.worktree.extend(untracked);
        Ok(())
    }

    fn commit_on_head(&mut self, message: &str, files: Snapshot, extra_parent: Option<Oid>) -> Result<Oid> {
        let untracked = self.untracked()?;
        let mut parents = vec![self.head_oid()?];
        parents.extend(extra_parent);
        let oid = self.insert_commit(parents, message, files.clone());
        let head = self.head.clone();
        self.branches.insert(head, oid);
        self.worktree = files.clone();
        self.worktree.extend(
            untracked
                .into_iter()
                .filter(|(path, _)| !files.contains_key(path)),
        );
        Ok(oid)
    }
}

impl Repository for MockRepository {
    fn workdir(&self) -> Result<PathBuf> {
        Ok(PathBuf::from("/mock/repo"))
    }

    fn git_dir(&self) -> PathBuf {
        PathBuf::from("/mock/repo/.git")
    }

    fn current_branch(&self) -> Result<String> {
        self.record("current_branch")?;
        Ok(self.state.borrow().head.clone())
    }

    fn head_oid(&self) -> Result<Oid> {
        self.record("head_oid")?;
        self.state.borrow().head_oid()
    }

    fn is_worktree_clean(&self) -> Result<bool> {
        self.record("is_worktree_clean")?;
        self.state.borrow().tracked_clean()
    }

    fn is_path_modified(&self, path: &Path) -> Result<bool> {
        self.record("is_path_modified")?;
        let state = self.state.borrow();
        Ok(state.worktree.get(path) != state.head_snapshot()?.get(path))
    }

    fn list_remotes(&self) -> Result<Vec<RemoteInfo>> {
        self.record("list_remotes")?;
        Ok(self.state.borrow().remotes.clone())
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        self.record("fetch")?;
        let mut state = self.state.borrow_mut();
        if !state.remotes.iter().any(|r| r.name == remote) {
            return Err(GitReleaseError::remote(format!(
                "Cannot find remote '{}'",
                remote
            )));
        }

        let published: Vec<_> = state
            .remote_branches
            .iter()
            .filter(|((r, _), _)| r == remote)
            .map(|(key, oid)| (key.clone(), *oid))
            .collect();
        state.tracking.extend(published);
        Ok(())
    }

    fn remote_tag_exists(&self, remote: &str, tag: &str) -> Result<bool> {
        self.record("remote_tag_exists")?;
        Ok(self
            .state
            .borrow()
            .remote_tags
            .get(remote)
            .is_some_and(|tags| tags.contains(tag)))
    }

    fn remote_branch_head(&self, remote: &str, branch: &str) -> Result<Option<Oid>> {
        self.record("remote_branch_head")?;
        Ok(self
            .state
            .borrow()
            .tracking
            .get(&(remote.to_string(), branch.to_string()))
            .copied())
    }

    fn is_descendant_of(&self, commit: Oid, ancestor: Oid) -> Result<bool> {
        self.record("is_descendant_of")?;
        Ok(self.state.borrow().ancestors(commit).contains(&ancestor))
    }

    fn commit_parents(&self, commit: Oid) -> Result<Vec<Oid>> {
        self.state
            .borrow()
            .commits
            .get(&commit)
            .map(|c| c.parents.clone())
            .ok_or_else(|| GitReleaseError::branch(format!("Commit not found: {}", commit)))
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        self.record("branch_exists")?;
        Ok(self.state.borrow().branches.contains_key(name))
    }

    fn read_worktree_file(&self, path: &Path) -> Result<String> {
        self.record("read_worktree_file")?;
        self.state.borrow().worktree.get(path).cloned().ok_or_else(|| {
            GitReleaseError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{}: not found", path.display()),
            ))
        })
    }

    fn write_worktree_file(&self, path: &Path, contents: &str) -> Result<()> {
        self.record("write_worktree_file")?;
        self.state
            .borrow_mut()
            .worktree
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn untracked_paths(&self) -> Result<Vec<PathBuf>> {
        self.record("untracked_paths")?;
        Ok(self.state.borrow().untracked()?.into_keys().collect())
    }

    fn commit_tracked(&self, new_paths: &[&Path], message: &str) -> Result<Oid> {
        self.record("commit_tracked")?;
        let mut state = self.state.borrow_mut();
        let head = state.head_snapshot()?.clone();

        let mut files: Snapshot = head
            .keys()
            .filter_map(|path| {
                state
                    .worktree
                    .get(path)
                    .map(|contents| (path.clone(), contents.clone()))
            })
            .collect();
        for path in new_paths {
            if let Some(contents) = state.worktree.get(*path) {
                files.insert(path.to_path_buf(), contents.clone());
            }
        }

        if files == head {
            return Err(GitReleaseError::NothingToCommit);
        }
        state.commit_on_head(message, files, None)
    }

    fn commit_paths(&self, paths: &[&Path], message: &str) -> Result<Oid> {
        self.record("commit_paths")?;
        let mut state = self.state.borrow_mut();
        let mut files = state.head_snapshot()?.clone();
        for path in paths {
            match state.worktree.get(*path) {
                Some(contents) => files.insert(path.to_path_buf(), contents.clone()),
                None => files.remove(*path),
            };
        }
        if &files == state.head_snapshot()? {
            return Err(GitReleaseError::NothingToCommit);
        }

        // Unstaged paths stay modified in the work tree
        let worktree = state.worktree.clone();
        let oid = state.commit_on_head(message, files, None)?;
        state.worktree = worktree;
        Ok(oid)
    }

    fn create_annotated_tag(&self, tag: &Tag) -> Result<Oid> {
        self.record("create_annotated_tag")?;
        let mut state = self.state.borrow_mut();
        if state.tags.contains_key(&tag.name) {
            return Err(GitReleaseError::LocalTagExists(tag.name.clone()));
        }
        if !state.commits.contains_key(&tag.target) {
            return Err(GitReleaseError::branch(format!(
                "Commit not found: {}",
                tag.target
            )));
        }
        state
            .tags
            .insert(tag.name.clone(), (tag.target, tag.message.clone()));
        Ok(tag.target)
    }

    fn create_branch(&self, name: &str, target: Oid) -> Result<()> {
        self.record("create_branch")?;
        let mut state = self.state.borrow_mut();
        if state.branches.contains_key(name) {
            return Err(GitReleaseError::branch(format!(
                "branch '{}' already exists",
                name
            )));
        }
        state.branches.insert(name.to_string(), target);
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        self.record("delete_branch")?;
        let mut state = self.state.borrow_mut();
        if state.head == name {
            return Err(GitReleaseError::branch(format!(
                "Cannot delete checked out branch '{}'",
                name
            )));
        }
        state
            .branches
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| GitReleaseError::branch(format!("Branch not found: {}", name)))
    }

    fn checkout_branch(&self, name: &str) -> Result<()> {
        self.record("checkout_branch")?;
        let mut state = self.state.borrow_mut();
        let target = *state
            .branches
            .get(name)
            .ok_or_else(|| GitReleaseError::branch(format!("Cannot find branch '{}'", name)))?;

        if !state.tracked_clean()? {
            return Err(GitReleaseError::branch(
                "local changes would be overwritten by checkout",
            ));
        }

        let files = state.snapshot(target)?.clone();
        state.reset_worktree(files)?;
        state.head = name.to_string();
        Ok(())
    }

    fn revert_commit(&self, commit: Oid) -> Result<Oid> {
        self.record("revert_commit")?;
        let mut state = self.state.borrow_mut();

        let reverted = state
            .commits
            .get(&commit)
            .cloned()
            .ok_or_else(|| GitReleaseError::branch(format!("Commit not found: {}", commit)))?;
        let before = match reverted.parents.first() {
            Some(parent) => state.snapshot(*parent)?.clone(),
            None => Snapshot::new(),
        };

        let mut files = state.head_snapshot()?.clone();
        let touched: BTreeSet<&PathBuf> = reverted.files.keys().chain(before.keys()).collect();
        for path in touched {
            let (old, new) = (before.get(path), reverted.files.get(path));
            if old == new {
                continue;
            }
            if files.get(path) != new {
                return Err(GitReleaseError::Revert(commit.to_string()));
            }
            match old {
                Some(contents) => files.insert(path.clone(), contents.clone()),
                None => files.remove(path),
            };
        }

        let message = format!(
            "Revert \"{}\"\n\nThis reverts commit {}.\n",
            reverted.message.lines().next().unwrap_or_default(),
            commit
        );
        state.commit_on_head(&message, files, None)
    }

    fn merge_favoring_incoming(&self, branch: &str, message: &str) -> Result<Oid> {
        self.record("merge_favoring_incoming")?;
        let mut state = self.state.borrow_mut();

        if !state.merge_conflicts.is_empty() {
            return Err(GitReleaseError::MergeConflict {
                branch: branch.to_string(),
                paths: state.merge_conflicts.clone(),
            });
        }

        let ours = state.head_oid()?;
        let theirs = *state
            .branches
            .get(branch)
            .ok_or_else(|| GitReleaseError::branch(format!("Cannot find branch '{}'", branch)))?;
        let base = match state.merge_base(ours, theirs) {
            Some(oid) => state.snapshot(oid)?.clone(),
            None => Snapshot::new(),
        };

        let our_files = state.snapshot(ours)?.clone();
        let their_files = state.snapshot(theirs)?.clone();
        let paths: BTreeSet<&PathBuf> = our_files
            .keys()
            .chain(their_files.keys())
            .chain(base.keys())
            .collect();

        let mut merged = Snapshot::new();
        for path in paths {
            let (b, o, t) = (base.get(path), our_files.get(path), their_files.get(path));
            // Take our side only when theirs did not change the file
            let pick = if t == b { o } else { t };
            if let Some(contents) = pick {
                merged.insert(path.clone(), contents.clone());
            }
        }

        state.commit_on_head(message, merged, Some(theirs))
    }
}
