use thiserror::Error;

/// Unified error type for git-release operations
#[derive(Error, Debug)]
pub enum GitReleaseError {
    #[error("Invalid version '{0}': expected vMAJOR.MINOR.PATCH without leading zeros")]
    InputFormat(String),

    #[error("Working tree has uncommitted changes; commit or stash them before releasing")]
    DirtyWorkingTree,

    #[error("Metadata file '{0}' has staged or unstaged modifications")]
    DirtyMetadataFile(String),

    #[error("Tag '{tag}' already exists on remote '{remote}'")]
    TagAlreadyExists { tag: String, remote: String },

    #[error("Preceding tag '{tag}' does not exist on remote '{remote}'; release it first")]
    MissingPrecedingTag { tag: String, remote: String },

    #[error("Current branch '{branch}' does not descend from '{release_ref}'")]
    AncestryViolation { branch: String, release_ref: String },

    #[error("Required tool '{0}' is not available on this host")]
    ToolUnavailable(String),

    #[error("Cannot rewrite metadata file '{path}': field '{field}' not found")]
    MetadataRewrite { path: String, field: String },

    #[error("Release step '{step}' failed: {source}")]
    SequencerStep {
        step: &'static str,
        #[source]
        source: Box<GitReleaseError>,
    },

    #[error("Tag '{0}' already exists in the local repository; delete it with `git tag -d {0}` and retry")]
    LocalTagExists(String),

    #[error("Nothing to commit")]
    NothingToCommit,

    #[error("Revert of commit {0} produced conflicts")]
    Revert(String),

    #[error("Merge of '{branch}' conflicts in: {}; resolve manually", .paths.join(", "))]
    MergeConflict { branch: String, paths: Vec<String> },

    #[error("Hook error: {0}")]
    Hook(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Branch error: {0}")]
    Branch(String),

    #[error("Remote operation failed: {0}")]
    Remote(String),

    #[error("Repository is locked by another git-release process")]
    Locked,

    #[error("Interrupted by user")]
    Interrupted,

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in git-release
pub type Result<T> = std::result::Result<T, GitReleaseError>;

impl GitReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        GitReleaseError::Config(msg.into())
    }

    /// Create a branch error with context
    pub fn branch(msg: impl Into<String>) -> Self {
        GitReleaseError::Branch(msg.into())
    }

    /// Create a remote error with context
    pub fn remote(msg: impl Into<String>) -> Self {
        GitReleaseError::Remote(msg.into())
    }

    /// Create a hook error with context
    pub fn hook(msg: impl Into<String>) -> Self {
        GitReleaseError::Hook(msg.into())
    }

    /// Wrap a failure of one sequencer step
    pub fn step(step: &'static str, source: GitReleaseError) -> Self {
        GitReleaseError::SequencerStep {
            step,
            source: Box::new(source),
        }
    }

    /// Whether this failure happened before the repository was mutated
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            GitReleaseError::InputFormat(_)
                | GitReleaseError::DirtyWorkingTree
                | GitReleaseError::DirtyMetadataFile(_)
                | GitReleaseError::TagAlreadyExists { .. }
                | GitReleaseError::MissingPrecedingTag { .. }
                | GitReleaseError::AncestryViolation { .. }
                | GitReleaseError::ToolUnavailable(_)
                | GitReleaseError::Locked
        )
    }
}
