use std::path::PathBuf;

use crate::config::Config;
use crate::domain::branch::{backmerge_branch_name, release_branch_name, temp_branch_name};
use crate::domain::VersionSpec;
use crate::error::{GitReleaseError, Result};
use crate::git::{RemoteInfo, Repository};

/// Everything a release run needs to know, resolved once up front.
///
/// Built before the first mutation and never modified afterwards; every
/// pipeline stage receives it by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseContext {
    pub version: VersionSpec,
    /// Branch checked out when the run started; restored at the end
    pub original_branch: String,
    pub release_branch_name: String,
    pub fetch_remote_name: String,
    pub fetch_url: String,
    pub push_url: String,
    pub mainline_branch: String,
    pub backmerge_branch_name: String,
    pub temp_branch_name: String,
    /// Metadata file, relative to the work tree
    pub metadata_path: PathBuf,
}

impl ReleaseContext {
    /// Resolve the run context against `repo`.
    ///
    /// `started_at` is the unix timestamp that makes the temporary branch
    /// name unique.
    pub fn build<R: Repository + ?Sized>(
        repo: &R,
        config: &Config,
        version: VersionSpec,
        started_at: i64,
    ) -> Result<Self> {
        let original_branch = repo.current_branch()?;
        let remote = select_remote(&repo.list_remotes()?, config)?;
        let backmerge = backmerge_branch_name(&version);

        Ok(ReleaseContext {
            version,
            original_branch,
            release_branch_name: release_branch_name(&version),
            fetch_remote_name: remote.name,
            fetch_url: remote.fetch_url,
            push_url: remote.push_url,
            mainline_branch: config.remote.mainline.clone(),
            temp_branch_name: temp_branch_name(&backmerge, started_at),
            backmerge_branch_name: backmerge,
            metadata_path: config.metadata.path.clone(),
        })
    }

    /// Tag name, identical to the version text
    pub fn tag_name(&self) -> String {
        self.version.to_string()
    }
}

/// Pick the fetch remote: by URL substring when configured, else by name
pub fn select_remote(remotes: &[RemoteInfo], config: &Config) -> Result<RemoteInfo> {
    if let Some(needle) = config
        .remote
        .url_contains
        .as_deref()
        .filter(|n| !n.is_empty())
    {
        return remotes
            .iter()
            .find(|r| r.fetch_url.contains(needle))
            .cloned()
            .ok_or_else(|| {
                GitReleaseError::remote(format!("no remote has a URL containing '{}'", needle))
            });
    }

    remotes
        .iter()
        .find(|r| r.name == config.remote.name)
        .cloned()
        .ok_or_else(|| {
            GitReleaseError::remote(format!("remote '{}' is not configured", config.remote.name))
        })
}
