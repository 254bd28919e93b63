//! Main workflow orchestration logic
//!
//! Runs one release end to end against an already opened repository. The
//! binary only parses the version, loads configuration, takes the
//! repository lock and reports; everything in between lives here so it can
//! be driven against the in-memory repository in tests.

use git2::Oid;

use crate::backmerge::build_backmerge;
use crate::config::MessagesConfig;
use crate::context::ReleaseContext;
use crate::domain::Tag;
use crate::error::Result;
use crate::git::Repository;
use crate::hooks::DocumentStamper;
use crate::interrupt::CancelFlag;
use crate::metadata::MetadataRewriter;
use crate::preconditions::check_preconditions;
use crate::sequencer::ReleaseSequencer;
use crate::ui;

/// Result of a successful release run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub tag: Tag,
    pub doc_commit: Oid,
    pub release_commit: Oid,
    pub dev_commit: Oid,
    /// Local branch to propose against the mainline
    pub backmerge_branch: String,
    pub backmerge_commit: Oid,
}

/// Collaborators of a release run
pub struct ReleaseRun<'a, R: Repository + ?Sized, S: DocumentStamper + ?Sized> {
    pub repo: &'a R,
    pub stamper: &'a S,
    pub rewriter: &'a MetadataRewriter,
    pub messages: &'a MessagesConfig,
    pub cancel: &'a CancelFlag,
}

impl<'a, R, S> ReleaseRun<'a, R, S>
where
    R: Repository + ?Sized,
    S: DocumentStamper + ?Sized,
{
    /// Release workflow
    ///
    /// 1. Check preconditions (no mutation before this passes)
    /// 2. Stamp docs, commit, rewrite metadata, tag, advance to `-dev`
    /// 3. Build the backmerge branch, restoring the original branch
    pub fn execute(&self, ctx: &ReleaseContext) -> Result<ReleaseOutcome> {
        ui::display_status(&format!(
            "Checking preconditions for {} on '{}'",
            ctx.version, ctx.original_branch
        ));
        self.cancel.check()?;
        check_preconditions(self.repo, ctx, self.rewriter, self.stamper)?;
        ui::display_success("Preconditions satisfied");

        let commits = ReleaseSequencer::new(
            self.repo,
            self.stamper,
            self.rewriter,
            self.messages,
            self.cancel,
        )
        .run(ctx)?;

        let backmerge = build_backmerge(self.repo, ctx, commits.doc_commit, self.cancel)?;

        Ok(ReleaseOutcome {
            tag: commits.tag,
            doc_commit: commits.doc_commit,
            release_commit: commits.release_commit,
            dev_commit: commits.dev_commit,
            backmerge_branch: backmerge.branch,
            backmerge_commit: backmerge.merge_commit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::domain::VersionSpec;
    use crate::error::GitReleaseError;
    use crate::git::MockRepository;
    use crate::hooks::HookContext;

    const BASE_GO: &str = "var (\n\tgitMajor string = \"1\"\n\tgitMinor string = \"2.2+\"\n\tgitVersion string = \"v1.2.2-dev\"\n)\n";

    struct MockStamper<'a>(&'a MockRepository);

    impl DocumentStamper for MockStamper<'_> {
        fn stamp(&self, context: &HookContext) -> Result<()> {
            self.0
                .set_worktree_file("docs/README.md", &format!("docs for {}", context.version));
            Ok(())
        }
    }

    /// Point-release setup: on `release-1.2` with v1.2.2 published
    fn point_release_repo() -> MockRepository {
        let repo = MockRepository::with_files("master", &[("pkg/version/base.go", BASE_GO)]);
        repo.add_remote("origin", "https://example.com/widget.git");
        let master = repo.head_oid().unwrap();
        repo.publish_branch("origin", "master", master);

        repo.switch_new_branch("release-1.2");
        let release = repo.commit_files(&[("fix.go", "fixed")], "fix");
        repo.publish_branch("origin", "release-1.2", release);
        repo.publish_tag("origin", "v1.2.2");
        repo
    }

    fn run(repo: &MockRepository, version: VersionSpec) -> Result<ReleaseOutcome> {
        let config = Config::default();
        let ctx = ReleaseContext::build(repo, &config, version, 1700000000)?;
        let rewriter = MetadataRewriter::new(&config.metadata);
        let stamper = MockStamper(repo);
        let cancel = CancelFlag::new();

        ReleaseRun {
            repo,
            stamper: &stamper,
            rewriter: &rewriter,
            messages: &config.messages,
            cancel: &cancel,
        }
        .execute(&ctx)
    }

    #[test]
    fn test_point_release_end_to_end() {
        let repo = point_release_repo();
        let outcome = run(&repo, VersionSpec::new(1, 2, 3)).unwrap();

        assert_eq!(repo.current_branch().unwrap(), "release-1.2");
        assert_eq!(outcome.tag.name, "v1.2.3");
        assert_eq!(repo.tag_target("v1.2.3"), Some(outcome.release_commit));
        assert_eq!(repo.branch_head("release-1.2"), Some(outcome.dev_commit));
        assert_eq!(outcome.backmerge_branch, "1.2.3-merge-to-master");
        assert!(!repo
            .branches()
            .iter()
            .any(|b| b.starts_with("1.2.3-merge-to-master-tmp-")));

        let merged = repo
            .file_at(outcome.backmerge_commit, "pkg/version/base.go")
            .unwrap();
        assert!(merged.contains("\"v1.2.3-dev\""));
        assert_eq!(repo.file_at(outcome.backmerge_commit, "docs/README.md"), None);
        assert_eq!(
            repo.file_at(outcome.backmerge_commit, "fix.go").unwrap(),
            "fixed"
        );
    }

    #[test]
    fn test_missing_preceding_tag_makes_no_commits() {
        let repo = MockRepository::with_files("release-1.2", &[("pkg/version/base.go", BASE_GO)]);
        repo.add_remote("origin", "https://example.com/widget.git");
        repo.publish_tag("origin", "v1.2.1");

        let err = run(&repo, VersionSpec::new(1, 2, 3)).unwrap_err();
        assert!(matches!(err, GitReleaseError::MissingPrecedingTag { .. }));
        assert!(err.is_precondition());
        assert_eq!(repo.commit_count(), 1);
        assert_eq!(repo.branches(), vec!["release-1.2".to_string()]);
    }

    #[test]
    fn test_major_release_never_queries_remote_tags() {
        let repo = MockRepository::with_files("master", &[("pkg/version/base.go", BASE_GO)]);
        repo.add_remote("origin", "https://example.com/widget.git");
        repo.publish_branch("origin", "master", repo.head_oid().unwrap());

        let outcome = run(&repo, VersionSpec::new(2, 0, 0)).unwrap();
        assert!(!repo.was_called("remote_tag_exists"));

        let dev = repo.file_at(outcome.dev_commit, "pkg/version/base.go").unwrap();
        assert!(dev.contains("gitVersion string = \"v2.0.0-dev\""));
        assert!(dev.contains("gitMinor string = \"0.0+\""));
        assert_eq!(repo.current_branch().unwrap(), "master");
    }

    #[test]
    fn test_merge_conflict_restores_original_branch() {
        let repo = point_release_repo();
        repo.conflict_on_merge(&["docs/README.md"]);

        let err = run(&repo, VersionSpec::new(1, 2, 3)).unwrap_err();
        assert!(matches!(err, GitReleaseError::MergeConflict { .. }));
        assert_eq!(repo.current_branch().unwrap(), "release-1.2");
        assert!(repo.branch_exists("1.2.3-merge-to-master").unwrap());
        assert!(repo
            .branch_exists("1.2.3-merge-to-master-tmp-1700000000")
            .unwrap());
        // the release itself is complete
        assert!(repo.tag_target("v1.2.3").is_some());
    }

    #[test]
    fn test_interrupted_before_gate() {
        let repo = point_release_repo();
        let config = Config::default();
        let ctx = ReleaseContext::build(&repo, &config, VersionSpec::new(1, 2, 3), 1).unwrap();
        let rewriter = MetadataRewriter::new(&config.metadata);
        let stamper = MockStamper(&repo);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let err = ReleaseRun {
            repo: &repo,
            stamper: &stamper,
            rewriter: &rewriter,
            messages: &config.messages,
            cancel: &cancel,
        }
        .execute(&ctx)
        .unwrap_err();

        assert!(matches!(err, GitReleaseError::Interrupted));
        assert!(!repo.was_called("fetch"));
    }
}
