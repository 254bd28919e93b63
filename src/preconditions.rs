//! Release precondition gate.
//!
//! Checks run in a fixed order and stop at the first failure. Nothing here
//! mutates the work tree, the index or any local ref; the only side effect
//! is refreshing remote-tracking refs for point releases.

use crate::context::ReleaseContext;
use crate::domain::branch::remote_tracking_name;
use crate::error::{GitReleaseError, Result};
use crate::git::Repository;
use crate::hooks::{DocumentStamper, HookExecutor};
use crate::metadata::MetadataRewriter;

/// Run every release precondition against the current repository state
pub fn check_preconditions<R, S>(
    repo: &R,
    ctx: &ReleaseContext,
    rewriter: &MetadataRewriter,
    stamper: &S,
) -> Result<()>
where
    R: Repository + ?Sized,
    S: DocumentStamper + ?Sized,
{
    check_clean_worktree(repo)?;
    check_metadata(repo, ctx, rewriter)?;
    if ctx.version.is_point_release() {
        check_remote_state(repo, ctx)?;
    }
    check_tools(repo, rewriter, stamper)
}

fn check_clean_worktree<R: Repository + ?Sized>(repo: &R) -> Result<()> {
    if !repo.is_worktree_clean()? {
        return Err(GitReleaseError::DirtyWorkingTree);
    }
    Ok(())
}

fn check_metadata<R: Repository + ?Sized>(
    repo: &R,
    ctx: &ReleaseContext,
    rewriter: &MetadataRewriter,
) -> Result<()> {
    if repo.is_path_modified(&ctx.metadata_path)? {
        return Err(GitReleaseError::DirtyMetadataFile(
            ctx.metadata_path.display().to_string(),
        ));
    }
    rewriter.check(repo, &ctx.version)
}

/// Remote checks for `patch != 0`: the tag is new, its predecessor exists,
/// and HEAD sits on the minor line's release branch.
fn check_remote_state<R: Repository + ?Sized>(repo: &R, ctx: &ReleaseContext) -> Result<()> {
    let remote = &ctx.fetch_remote_name;
    repo.fetch(remote)?;

    let tag = ctx.tag_name();
    if repo.remote_tag_exists(remote, &tag)? {
        return Err(GitReleaseError::TagAlreadyExists {
            tag,
            remote: remote.clone(),
        });
    }

    if let Some(previous) = ctx.version.previous_patch() {
        let previous = previous.to_string();
        if !repo.remote_tag_exists(remote, &previous)? {
            return Err(GitReleaseError::MissingPrecedingTag {
                tag: previous,
                remote: remote.clone(),
            });
        }
    }

    let violation = || GitReleaseError::AncestryViolation {
        branch: ctx.original_branch.clone(),
        release_ref: remote_tracking_name(remote, &ctx.release_branch_name),
    };
    let release_head = repo
        .remote_branch_head(remote, &ctx.release_branch_name)?
        .ok_or_else(violation)?;
    if !repo.is_descendant_of(repo.head_oid()?, release_head)? {
        return Err(violation());
    }

    Ok(())
}

fn check_tools<R, S>(repo: &R, rewriter: &MetadataRewriter, stamper: &S) -> Result<()>
where
    R: Repository + ?Sized,
    S: DocumentStamper + ?Sized,
{
    let workdir = repo.workdir()?;
    let tools = rewriter
        .required_tools()
        .into_iter()
        .chain(stamper.required_tools());

    for tool in tools {
        if HookExecutor::locate(&tool, &workdir).is_none() {
            return Err(GitReleaseError::ToolUnavailable(tool));
        }
    }
    Ok(())
}
