//! Branch naming conventions shared with the rest of the release tooling.
//!
//! These names are an external contract: operators and CI jobs look for them
//! verbatim, so the formats here must not drift.

use super::version::VersionSpec;

/// Per-minor-version branch from which point releases are tagged
pub fn release_branch_name(version: &VersionSpec) -> String {
    format!("release-{}.{}", version.major, version.minor)
}

/// Branch that carries the release history onto the mainline
pub fn backmerge_branch_name(version: &VersionSpec) -> String {
    format!("{}-merge-to-master", version.numeric())
}

/// Scratch branch used while building the backmerge, unique per run
pub fn temp_branch_name(backmerge_branch: &str, unix_timestamp: i64) -> String {
    format!("{}-tmp-{}", backmerge_branch, unix_timestamp)
}

/// Short name of a remote-tracking branch, e.g. `origin/release-1.2`
pub fn remote_tracking_name(remote: &str, branch: &str) -> String {
    format!("{}/{}", remote, branch)
}
