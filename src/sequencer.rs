//! Ordered release commits.
//!
//! | step | action                              |
//! |------|-------------------------------------|
//! | 0    | stamp documentation                 |
//! | 1    | doc commit (tracked + stamped files)|
//! | 2    | metadata rewrite, release mode      |
//! | 3    | release commit (metadata only)      |
//! | 4    | annotated tag at the release commit |
//! | 5    | metadata rewrite, dev mode          |
//! | 6    | dev commit (metadata only)          |
//!
//! The doc commit holds every change to tracked files plus the files the
//! stamper created. Untracked files that predate the run stay out of it.
//!
//! Every failure is wrapped with the name of the step that failed. Commits
//! already made are left in place.

use git2::Oid;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::MessagesConfig;
use crate::context::ReleaseContext;
use crate::domain::tag::render_template;
use crate::domain::{RewriteMode, Tag};
use crate::error::{GitReleaseError, Result};
use crate::git::Repository;
use crate::hooks::{DocumentStamper, HookContext, HookType};
use crate::interrupt::CancelFlag;
use crate::metadata::MetadataRewriter;
use crate::ui;

/// Commits and tag produced by a completed sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCommits {
    pub doc_commit: Oid,
    pub release_commit: Oid,
    pub tag: Tag,
    pub dev_commit: Oid,
}

/// Runs steps 0 through 6 on the checked-out branch
pub struct ReleaseSequencer<'a, R: Repository + ?Sized, S: DocumentStamper + ?Sized> {
    repo: &'a R,
    stamper: &'a S,
    rewriter: &'a MetadataRewriter,
    messages: &'a MessagesConfig,
    cancel: &'a CancelFlag,
}

impl<'a, R, S> ReleaseSequencer<'a, R, S>
where
    R: Repository + ?Sized,
    S: DocumentStamper + ?Sized,
{
    pub fn new(
        repo: &'a R,
        stamper: &'a S,
        rewriter: &'a MetadataRewriter,
        messages: &'a MessagesConfig,
        cancel: &'a CancelFlag,
    ) -> Self {
        ReleaseSequencer {
            repo,
            stamper,
            rewriter,
            messages,
            cancel,
        }
    }

    pub fn run(&self, ctx: &ReleaseContext) -> Result<ReleaseCommits> {
        let version = ctx.version.to_string();
        let metadata: &[&Path] = &[ctx.metadata_path.as_path()];

        let stamped = self.step("stamp documentation", || {
            let before: HashSet<PathBuf> = self.repo.untracked_paths()?.into_iter().collect();
            let hook = HookContext::new(HookType::DocStamp, ctx.version, &ctx.release_branch_name);
            self.stamper.stamp(&hook)?;
            let created: Vec<PathBuf> = self
                .repo
                .untracked_paths()?
                .into_iter()
                .filter(|path| !before.contains(path))
                .collect();
            Ok(created)
        })?;

        let doc_commit = self.step("doc commit", || {
            let created: Vec<&Path> = stamped.iter().map(PathBuf::as_path).collect();
            self.repo.commit_tracked(
                &created,
                &render_template(&self.messages.doc_commit, &version),
            )
        })?;
        ui::display_success(&format!("Committed documentation ({})", short(doc_commit)));

        self.step("release metadata", || {
            self.rewriter.apply(self.repo, &ctx.version, RewriteMode::Release)
        })?;

        let release_commit = self.step("release commit", || {
            self.repo.commit_paths(
                metadata,
                &render_template(&self.messages.release_commit, &version),
            )
        })?;
        ui::display_success(&format!("Committed release ({})", short(release_commit)));

        let tag = self.step("tag", || {
            let tag = Tag::new(
                version.clone(),
                render_template(&self.messages.tag, &version),
                release_commit,
            );
            self.repo.create_annotated_tag(&tag)?;
            Ok(tag)
        })?;
        ui::display_success(&format!("Tagged {} at {}", tag.name, short(tag.target)));

        self.step("dev metadata", || {
            self.rewriter.apply(self.repo, &ctx.version, RewriteMode::Dev)
        })?;

        let dev_commit = self.step("dev commit", || {
            self.repo.commit_paths(
                metadata,
                &render_template(&self.messages.dev_commit, &version),
            )
        })?;
        ui::display_success(&format!(
            "Committed {} ({})",
            ctx.version.dev_string(),
            short(dev_commit)
        ));

        Ok(ReleaseCommits {
            doc_commit,
            release_commit,
            tag,
            dev_commit,
        })
    }

    fn step<T>(&self, name: &'static str, action: impl FnOnce() -> Result<T>) -> Result<T> {
        self.cancel.check()?;
        ui::display_status(&format!("Release step: {}", name));
        action().map_err(|e| GitReleaseError::step(name, e))
    }
}

/// Abbreviated commit id for display
pub fn short(oid: Oid) -> String {
    let mut s = oid.to_string();
    s.truncate(10);
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::domain::VersionSpec;
    use crate::git::MockRepository;
    use std::cell::Cell;

    const BASE_GO: &str = "var (\n\tgitMajor string = \"1\"\n\tgitMinor string = \"9+\"\n\tgitVersion string = \"v1.9.0-dev\"\n)\n";
    const METADATA: &str = "pkg/version/base.go";

    /// Edits a doc file the way a stamping script would
    struct FileStamper<'a> {
        repo: &'a MockRepository,
        calls: Cell<usize>,
    }

    impl DocumentStamper for FileStamper<'_> {
        fn stamp(&self, context: &HookContext) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            self.repo
                .set_worktree_file("docs/install.md", &format!("install {}", context.version));
            Ok(())
        }
    }

    /// Stamps an existing doc and writes a new one
    struct CreatingStamper<'a> {
        repo: &'a MockRepository,
    }

    impl DocumentStamper for CreatingStamper<'_> {
        fn stamp(&self, context: &HookContext) -> Result<()> {
            self.repo
                .set_worktree_file("docs/install.md", &format!("install {}", context.version));
            self.repo
                .set_worktree_file("docs/RELEASED.md", &context.version.to_string());
            Ok(())
        }
    }

    struct FailingStamper;

    impl DocumentStamper for FailingStamper {
        fn stamp(&self, _context: &HookContext) -> Result<()> {
            Err(GitReleaseError::hook("versionize-docs.sh failed"))
        }
    }

    fn setup(version: VersionSpec) -> (MockRepository, ReleaseContext, Config) {
        let repo = MockRepository::with_files(
            "master",
            &[(METADATA, BASE_GO), ("docs/install.md", "install HEAD")],
        );
        repo.add_remote("origin", "https://example.com/widget.git");
        let config = Config::default();
        let ctx = ReleaseContext::build(&repo, &config, version, 1).unwrap();
        (repo, ctx, config)
    }

    #[test]
    fn test_full_sequence() {
        let (repo, ctx, config) = setup(VersionSpec::new(1, 3, 4));
        let stamper = FileStamper {
            repo: &repo,
            calls: Cell::new(0),
        };
        let rewriter = MetadataRewriter::new(&config.metadata);
        let cancel = CancelFlag::new();

        let commits = ReleaseSequencer::new(&repo, &stamper, &rewriter, &config.messages, &cancel)
            .run(&ctx)
            .unwrap();

        assert_eq!(stamper.calls.get(), 1);
        assert_eq!(commits.tag.target, commits.release_commit);
        assert_eq!(repo.tag_target("v1.3.4"), Some(commits.release_commit));
        assert_eq!(repo.tag_message("v1.3.4").unwrap(), "Release v1.3.4");
        assert_eq!(
            repo.commit_parents(commits.release_commit).unwrap(),
            vec![commits.doc_commit]
        );
        assert_eq!(
            repo.commit_parents(commits.dev_commit).unwrap(),
            vec![commits.release_commit]
        );

        assert_eq!(
            repo.commit_message(commits.doc_commit).unwrap(),
            "Versioning docs and examples for v1.3.4"
        );
        assert_eq!(repo.commit_message(commits.dev_commit).unwrap(), "Release v1.3.4-dev");

        let released = repo.file_at(commits.release_commit, METADATA).unwrap();
        assert!(released.contains("gitMinor string = \"3.4\""));
        assert!(released.contains("gitVersion string = \"v1.3.4\""));
        assert!(released.contains("gitMajor string = \"1\""));

        let dev = repo.file_at(commits.dev_commit, METADATA).unwrap();
        assert!(dev.contains("gitMinor string = \"3.4+\""));
        assert!(dev.contains("gitVersion string = \"v1.3.4-dev\""));

        assert_eq!(
            repo.file_at(commits.doc_commit, "docs/install.md").unwrap(),
            "install v1.3.4"
        );
        assert_eq!(repo.file_at(commits.doc_commit, METADATA).unwrap(), BASE_GO);
        assert!(repo.is_worktree_clean().unwrap());
    }

    #[test]
    fn test_doc_commit_skips_preexisting_untracked_files() {
        let (repo, ctx, config) = setup(VersionSpec::new(1, 3, 4));
        repo.set_worktree_file("scratch-notes.txt", "do not ship");
        let stamper = CreatingStamper { repo: &repo };
        let rewriter = MetadataRewriter::new(&config.metadata);
        let cancel = CancelFlag::new();

        let commits = ReleaseSequencer::new(&repo, &stamper, &rewriter, &config.messages, &cancel)
            .run(&ctx)
            .unwrap();

        assert_eq!(
            repo.file_at(commits.doc_commit, "docs/RELEASED.md").unwrap(),
            "v1.3.4"
        );
        assert_eq!(
            repo.file_at(commits.doc_commit, "docs/install.md").unwrap(),
            "install v1.3.4"
        );
        assert_eq!(repo.file_at(commits.doc_commit, "scratch-notes.txt"), None);
        assert_eq!(repo.file_at(commits.release_commit, "scratch-notes.txt"), None);
        assert_eq!(
            repo.worktree_file("scratch-notes.txt").unwrap(),
            "do not ship"
        );
    }

    #[test]
    fn test_major_release_dev_fields() {
        let (repo, ctx, config) = setup(VersionSpec::new(2, 0, 0));
        let stamper = FileStamper {
            repo: &repo,
            calls: Cell::new(0),
        };
        let rewriter = MetadataRewriter::new(&config.metadata);
        let cancel = CancelFlag::new();

        let commits = ReleaseSequencer::new(&repo, &stamper, &rewriter, &config.messages, &cancel)
            .run(&ctx)
            .unwrap();

        let dev = repo.file_at(commits.dev_commit, METADATA).unwrap();
        assert!(dev.contains("gitMajor string = \"2\""));
        assert!(dev.contains("gitMinor string = \"0.0+\""));
        assert!(dev.contains("gitVersion string = \"v2.0.0-dev\""));
    }

    #[test]
    fn test_stamp_failure_makes_no_commits() {
        let (repo, ctx, config) = setup(VersionSpec::new(1, 3, 4));
        let rewriter = MetadataRewriter::new(&config.metadata);
        let cancel = CancelFlag::new();

        let err = ReleaseSequencer::new(&repo, &FailingStamper, &rewriter, &config.messages, &cancel)
            .run(&ctx)
            .unwrap_err();

        assert!(matches!(
            err,
            GitReleaseError::SequencerStep { step: "stamp documentation", .. }
        ));
        assert_eq!(repo.commit_count(), 1);
    }

    #[test]
    fn test_unchanged_docs_fail_doc_commit() {
        struct NoopStamper;
        impl DocumentStamper for NoopStamper {
            fn stamp(&self, _context: &HookContext) -> Result<()> {
                Ok(())
            }
        }

        let (repo, ctx, config) = setup(VersionSpec::new(1, 3, 4));
        let rewriter = MetadataRewriter::new(&config.metadata);
        let cancel = CancelFlag::new();

        let err = ReleaseSequencer::new(&repo, &NoopStamper, &rewriter, &config.messages, &cancel)
            .run(&ctx)
            .unwrap_err();

        match err {
            GitReleaseError::SequencerStep { step, source } => {
                assert_eq!(step, "doc commit");
                assert!(matches!(*source, GitReleaseError::NothingToCommit));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_tag_failure_keeps_earlier_commits() {
        let (repo, ctx, config) = setup(VersionSpec::new(1, 3, 4));
        repo.fail_on("create_annotated_tag");
        let stamper = FileStamper {
            repo: &repo,
            calls: Cell::new(0),
        };
        let rewriter = MetadataRewriter::new(&config.metadata);
        let cancel = CancelFlag::new();

        let err = ReleaseSequencer::new(&repo, &stamper, &rewriter, &config.messages, &cancel)
            .run(&ctx)
            .unwrap_err();

        assert!(matches!(err, GitReleaseError::SequencerStep { step: "tag", .. }));
        assert_eq!(repo.commit_count(), 3);
        assert!(repo.tag_target("v1.3.4").is_none());
    }

    #[test]
    fn test_cancelled_before_start() {
        let (repo, ctx, config) = setup(VersionSpec::new(1, 3, 4));
        let rewriter = MetadataRewriter::new(&config.metadata);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let err = ReleaseSequencer::new(&repo, &FailingStamper, &rewriter, &config.messages, &cancel)
            .run(&ctx)
            .unwrap_err();
        assert!(matches!(err, GitReleaseError::Interrupted));
    }
}
