use crate::error::Result;
use crate::git::Repository;
use crate::ui;

/// Checks the operator's branch back out when dropped.
///
/// Covers every exit path of the backmerge: early returns, `?`, interrupts
/// and panics. Call [`BranchRestoreGuard::restore`] on the success path to
/// see restoration errors instead of having them printed from `drop`.
pub struct BranchRestoreGuard<'a, R: Repository + ?Sized> {
    repo: &'a R,
    original: String,
    armed: bool,
}

impl<'a, R: Repository + ?Sized> BranchRestoreGuard<'a, R> {
    pub fn new(repo: &'a R, original: impl Into<String>) -> Self {
        BranchRestoreGuard {
            repo,
            original: original.into(),
            armed: true,
        }
    }

    /// Restore now and disarm
    pub fn restore(mut self) -> Result<()> {
        self.armed = false;
        restore_branch(self.repo, &self.original)
    }
}

impl<R: Repository + ?Sized> Drop for BranchRestoreGuard<'_, R> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = restore_branch(self.repo, &self.original) {
            ui::display_error(&format!(
                "Could not switch back to '{}': {}. Run `git checkout {}` manually.",
                self.original, e, self.original
            ));
        }
    }
}

fn restore_branch<R: Repository + ?Sized>(repo: &R, original: &str) -> Result<()> {
    if repo.current_branch()? != original {
        repo.checkout_branch(original)?;
    }
    Ok(())
}
