use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GitReleaseError, Result};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "GIT_RELEASE_CONFIG";

/// File name looked up at the root of the work tree
pub const CONFIG_FILE_NAME: &str = "gitrelease.toml";

/// Represents the complete configuration for git-release.
///
/// Describes which remote to talk to, where the version metadata lives, which
/// external commands stamp the documentation, and the commit/tag messages.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub metadata: MetadataConfig,

    #[serde(default)]
    pub docs: DocsConfig,

    #[serde(default)]
    pub messages: MessagesConfig,
}

/// Remote and mainline selection.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RemoteConfig {
    /// Remote used for fetching release refs
    #[serde(default = "default_remote_name")]
    pub name: String,

    /// When set, the first remote whose URL contains this string wins over `name`
    #[serde(default)]
    pub url_contains: Option<String>,

    /// Mainline branch the backmerge branch is based on
    #[serde(default = "default_mainline")]
    pub mainline: String,
}

fn default_remote_name() -> String {
    "origin".to_string()
}

fn default_mainline() -> String {
    "master".to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            name: default_remote_name(),
            url_contains: None,
            mainline: default_mainline(),
        }
    }
}

/// Location and schema of the version metadata file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MetadataConfig {
    /// Path relative to the work tree root
    #[serde(default = "default_metadata_path")]
    pub path: PathBuf,

    #[serde(default = "default_major_field")]
    pub major_field: String,

    #[serde(default = "default_minor_field")]
    pub minor_field: String,

    #[serde(default = "default_version_field")]
    pub version_field: String,

    /// Canonical formatter; the metadata path is appended as the last argument
    #[serde(default)]
    pub format_command: Vec<String>,
}

fn default_metadata_path() -> PathBuf {
    PathBuf::from("pkg/version/base.go")
}

fn default_major_field() -> String {
    "gitMajor".to_string()
}

fn default_minor_field() -> String {
    "gitMinor".to_string()
}

fn default_version_field() -> String {
    "gitVersion".to_string()
}

impl Default for MetadataConfig {
    fn default() -> Self {
        MetadataConfig {
            path: default_metadata_path(),
            major_field: default_major_field(),
            minor_field: default_minor_field(),
            version_field: default_version_field(),
            format_command: Vec::new(),
        }
    }
}

/// External documentation stamping commands, run in order.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct DocsConfig {
    #[serde(default)]
    pub stamp_commands: Vec<Vec<String>>,
}

/// Commit and tag message templates; `{version}` is replaced with `vX.Y.Z`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MessagesConfig {
    #[serde(default = "default_doc_commit")]
    pub doc_commit: String,

    #[serde(default = "default_release_commit")]
    pub release_commit: String,

    #[serde(default = "default_tag")]
    pub tag: String,

    #[serde(default = "default_dev_commit")]
    pub dev_commit: String,
}

fn default_doc_commit() -> String {
    "Versioning docs and examples for {version}".to_string()
}

fn default_release_commit() -> String {
    "Release {version}".to_string()
}

fn default_tag() -> String {
    "Release {version}".to_string()
}

fn default_dev_commit() -> String {
    "Release {version}-dev".to_string()
}

impl Default for MessagesConfig {
    fn default() -> Self {
        MessagesConfig {
            doc_commit: default_doc_commit(),
            release_commit: default_release_commit(),
            tag: default_tag(),
            dev_commit: default_dev_commit(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| GitReleaseError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot drive a release
    pub fn validate(&self) -> Result<()> {
        if self.remote.name.trim().is_empty() {
            return Err(GitReleaseError::config("remote.name must not be empty"));
        }
        if self.remote.mainline.trim().is_empty() {
            return Err(GitReleaseError::config("remote.mainline must not be empty"));
        }
        if self.metadata.path.as_os_str().is_empty() || self.metadata.path.is_absolute() {
            return Err(GitReleaseError::config(
                "metadata.path must be a path relative to the work tree",
            ));
        }

        let fields = [
            &self.metadata.major_field,
            &self.metadata.minor_field,
            &self.metadata.version_field,
        ];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(GitReleaseError::config("metadata field names must not be empty"));
        }
        if fields[0] == fields[1] || fields[1] == fields[2] || fields[0] == fields[2] {
            return Err(GitReleaseError::config("metadata field names must be distinct"));
        }

        if self.docs.stamp_commands.iter().any(|c| c.is_empty()) {
            return Err(GitReleaseError::config("docs.stamp_commands entries must not be empty"));
        }

        Ok(())
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Path named by the `GIT_RELEASE_CONFIG` environment variable
/// 2. `gitrelease.toml` at the root of the work tree
/// 3. `~/.config/.gitrelease.toml` in user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read, parsed or validated
pub fn load_config(workdir: &Path) -> Result<Config> {
    let explicit = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
    load_config_from(explicit.as_deref(), workdir)
}

/// Same as [`load_config`] with the explicit path passed in directly.
pub fn load_config_from(explicit: Option<&Path>, workdir: &Path) -> Result<Config> {
    let config_str = if let Some(path) = explicit {
        fs::read_to_string(path).map_err(|e| {
            GitReleaseError::config(format!("cannot read {}: {}", path.display(), e))
        })?
    } else if workdir.join(CONFIG_FILE_NAME).exists() {
        fs::read_to_string(workdir.join(CONFIG_FILE_NAME))?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(format!(".{}", CONFIG_FILE_NAME));
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    Config::from_toml(&config_str)
}
