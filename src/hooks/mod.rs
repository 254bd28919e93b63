//! External release commands
//!
//! The pipeline does not know how documentation is stamped or how the
//! metadata file is formatted; it only runs the configured commands and
//! aborts if one of them fails:
//! - doc-stamp: strips release-only doc sections and stamps version references
//! - format: canonical formatting of the metadata file after a rewrite

pub mod executor;
pub mod lifecycle;

pub use executor::{CommandStamper, HookExecutor};
pub use lifecycle::{HookContext, HookType};

use crate::error::Result;

/// Mutates documentation in the work tree for a release
pub trait DocumentStamper {
    /// Stamp the documentation for `context.version`
    fn stamp(&self, context: &HookContext) -> Result<()>;

    /// Programs that must be available before the release starts
    fn required_tools(&self) -> Vec<String> {
        Vec::new()
    }
}
