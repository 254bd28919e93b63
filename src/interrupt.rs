use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{GitReleaseError, Result};

/// Shared cancellation flag raised by SIGINT, SIGTERM or SIGHUP.
///
/// The handler only stores `true`; the pipeline polls [`CancelFlag::check`]
/// between steps and unwinds through its normal error path, so branch
/// restoration still runs.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the process-wide handler for Ctrl-C and the termination
    /// signals (`termination` feature of `ctrlc`) and return its flag
    pub fn install() -> Result<Self> {
        let flag = CancelFlag::new();
        let handle = flag.cancelled.clone();
        ctrlc::set_handler(move || {
            handle.store(true, Ordering::SeqCst);
        })
        .map_err(|e| GitReleaseError::config(format!("cannot install signal handler: {}", e)))?;
        Ok(flag)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Interrupted)` once the flag has been raised
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(GitReleaseError::Interrupted);
        }
        Ok(())
    }
}
