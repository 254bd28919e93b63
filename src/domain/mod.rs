//! Domain logic - pure release rules independent of git operations

pub mod branch;
pub mod tag;
pub mod version;

pub use tag::Tag;
pub use version::{RewriteMode, VersionSpec};
