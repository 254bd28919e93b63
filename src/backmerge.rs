//! Backmerge branch construction.
//!
//! The backmerge branch lets the release history (tag, release commit, dev
//! commit) land on the mainline without the release-only documentation
//! edits. It is built from a scratch copy of the release line with the doc
//! commit reverted, merged onto the current remote mainline head with the
//! scratch side winning conflicting hunks. Nothing is pushed.

use git2::Oid;

use crate::context::ReleaseContext;
use crate::error::{GitReleaseError, Result};
use crate::git::Repository;
use crate::guard::BranchRestoreGuard;
use crate::interrupt::CancelFlag;
use crate::sequencer::short;
use crate::ui;

/// The local branch ready to be pushed and proposed against the mainline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backmerge {
    pub branch: String,
    pub merge_commit: Oid,
}

/// Build the backmerge branch for a completed release sequence.
///
/// The operator's branch is checked out again on every exit path. On a
/// merge conflict both the temporary and the backmerge branch are kept so
/// the merge can be finished by hand.
pub fn build_backmerge<R: Repository + ?Sized>(
    repo: &R,
    ctx: &ReleaseContext,
    doc_commit: Oid,
    cancel: &CancelFlag,
) -> Result<Backmerge> {
    let guard = BranchRestoreGuard::new(repo, ctx.original_branch.as_str());

    cancel.check()?;
    ui::display_status(&format!("Creating {}", ctx.temp_branch_name));
    repo.create_branch(&ctx.temp_branch_name, repo.head_oid()?)?;
    repo.checkout_branch(&ctx.temp_branch_name)?;

    cancel.check()?;
    let revert = repo.revert_commit(doc_commit)?;
    ui::display_success(&format!(
        "Reverted documentation commit {} ({})",
        short(doc_commit),
        short(revert)
    ));

    cancel.check()?;
    let remote = &ctx.fetch_remote_name;
    repo.fetch(remote)?;
    let mainline = repo
        .remote_branch_head(remote, &ctx.mainline_branch)?
        .ok_or_else(|| {
            GitReleaseError::branch(format!(
                "remote branch '{}/{}' not found",
                remote, ctx.mainline_branch
            ))
        })?;

    if repo.branch_exists(&ctx.backmerge_branch_name)? {
        return Err(GitReleaseError::branch(format!(
            "branch '{}' already exists; delete it and retry the backmerge",
            ctx.backmerge_branch_name
        )));
    }
    repo.create_branch(&ctx.backmerge_branch_name, mainline)?;
    repo.checkout_branch(&ctx.backmerge_branch_name)?;

    cancel.check()?;
    ui::display_status(&format!(
        "Merging {} into {}",
        ctx.temp_branch_name, ctx.backmerge_branch_name
    ));
    let message = format!(
        "Merge branch '{}' into {}",
        ctx.temp_branch_name, ctx.backmerge_branch_name
    );
    let merge_commit = repo.merge_favoring_incoming(&ctx.temp_branch_name, &message)?;

    guard.restore()?;
    repo.delete_branch(&ctx.temp_branch_name)?;
    ui::display_success(&format!(
        "Built {} ({})",
        ctx.backmerge_branch_name,
        short(merge_commit)
    ));

    Ok(Backmerge {
        branch: ctx.backmerge_branch_name.clone(),
        merge_commit,
    })
}
