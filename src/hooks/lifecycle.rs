use std::collections::HashMap;

use crate::domain::VersionSpec;

/// Points in the release where external commands run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookType {
    /// Documentation stripping and version stamping, before the doc commit
    DocStamp,
    /// Canonical formatting of the metadata file after each rewrite
    Format,
}

impl HookType {
    /// Get the hook name as a string
    pub fn name(&self) -> &'static str {
        match self {
            HookType::DocStamp => "doc-stamp",
            HookType::Format => "format",
        }
    }
}

/// Context information passed to a hook
#[derive(Debug, Clone)]
pub struct HookContext {
    /// Type of hook being executed
    pub hook_type: HookType,
    /// Version being released
    pub version: VersionSpec,
    /// Per-minor release branch name
    pub release_branch: String,
}

impl HookContext {
    pub fn new(hook_type: HookType, version: VersionSpec, release_branch: impl Into<String>) -> Self {
        HookContext {
            hook_type,
            version,
            release_branch: release_branch.into(),
        }
    }

    /// Convert context to environment variables for the hook command
    ///
    /// Maps context fields to GITRELEASE_* environment variables
    pub fn to_env_vars(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();

        env.insert("GITRELEASE_HOOK".to_string(), self.hook_type.name().to_string());
        env.insert("GITRELEASE_VERSION".to_string(), self.version.to_string());
        env.insert("GITRELEASE_VERSION_MAJOR".to_string(), self.version.major.to_string());
        env.insert("GITRELEASE_VERSION_MINOR".to_string(), self.version.minor.to_string());
        env.insert("GITRELEASE_VERSION_PATCH".to_string(), self.version.patch.to_string());
        env.insert("GITRELEASE_RELEASE_BRANCH".to_string(), self.release_branch.clone());

        env
    }
}
