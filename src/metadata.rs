//! Version metadata rewriting.
//!
//! The metadata artifact is a source file holding three string fields, e.g.
//!
//! ```text
//! var (
//!     gitMajor   string = "1"
//!     gitMinor   string = "3.4+"
//!     gitVersion string = "v1.3.4-dev"
//! )
//! ```
//!
//! Fields are located by name, never by line position, and only the quoted
//! value is replaced, so applying the same version twice is a no-op.

use std::path::PathBuf;

use regex::Regex;

use crate::config::MetadataConfig;
use crate::domain::branch::release_branch_name;
use crate::domain::{RewriteMode, VersionSpec};
use crate::error::{GitReleaseError, Result};
use crate::git::Repository;
use crate::hooks::{HookContext, HookExecutor, HookType};

/// Names of the three version fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFields {
    pub major: String,
    pub minor: String,
    pub version: String,
}

/// Replace the quoted value of `field` in `contents`.
///
/// Matches `<field> [type] = "<value>"` at the start of a line (after
/// indentation and an optional `var`/`const`), also accepting `:=` and `:`.
/// Returns `None` if the field is absent.
pub fn replace_field(contents: &str, field: &str, value: &str) -> Option<String> {
    let pattern = format!(
        r#"(?m)^([ \t]*(?:(?:var|const)[ \t]+)?){}([ \t]+[A-Za-z_][\w.]*)?([ \t]*(?::=|=|:)[ \t]*)"([^"\n]*)""#,
        regex::escape(field)
    );
    let re = Regex::new(&pattern).ok()?;
    let quoted = re.captures(contents)?.get(4)?;

    let mut out = String::with_capacity(contents.len() + value.len());
    out.push_str(&contents[..quoted.start()]);
    out.push_str(value);
    out.push_str(&contents[quoted.end()..]);
    Some(out)
}

/// Rewrite all three fields for `version` in `mode`.
///
/// On a missing field, returns the name of the first field not found.
pub fn rewrite_contents(
    contents: &str,
    fields: &MetadataFields,
    version: &VersionSpec,
    mode: RewriteMode,
) -> std::result::Result<String, String> {
    let major = version.major.to_string();
    let minor = version.minor_field(mode);
    let full = version.version_field(mode);

    let updates = [
        (fields.major.as_str(), major.as_str()),
        (fields.minor.as_str(), minor.as_str()),
        (fields.version.as_str(), full.as_str()),
    ];

    let mut current = contents.to_string();
    for (field, value) in updates {
        current = replace_field(&current, field, value).ok_or_else(|| field.to_string())?;
    }
    Ok(current)
}

/// Rewrites the metadata file of a work tree and re-formats it.
#[derive(Debug, Clone)]
pub struct MetadataRewriter {
    path: PathBuf,
    fields: MetadataFields,
    format_command: Vec<String>,
}

impl MetadataRewriter {
    pub fn new(config: &MetadataConfig) -> Self {
        MetadataRewriter {
            path: config.path.clone(),
            fields: MetadataFields {
                major: config.major_field.clone(),
                minor: config.minor_field.clone(),
                version: config.version_field.clone(),
            },
            format_command: config.format_command.clone(),
        }
    }

    /// Program names this rewriter needs on the host
    pub fn required_tools(&self) -> Vec<String> {
        self.format_command.first().cloned().into_iter().collect()
    }

    /// Confirm that all three fields can be located without writing anything
    pub fn check<R: Repository + ?Sized>(&self, repo: &R, version: &VersionSpec) -> Result<()> {
        let contents = repo.read_worktree_file(&self.path)?;
        rewrite_contents(&contents, &self.fields, version, RewriteMode::Release)
            .map(|_| ())
            .map_err(|field| self.missing(field))
    }

    /// Rewrite the file in place for `version` and run the formatter.
    pub fn apply<R: Repository + ?Sized>(
        &self,
        repo: &R,
        version: &VersionSpec,
        mode: RewriteMode,
    ) -> Result<()> {
        let contents = repo.read_worktree_file(&self.path)?;
        let updated = rewrite_contents(&contents, &self.fields, version, mode)
            .map_err(|field| self.missing(field))?;

        if updated != contents {
            repo.write_worktree_file(&self.path, &updated)?;
        }

        if !self.format_command.is_empty() {
            let target = repo.workdir()?.join(&self.path);
            let mut command = self.format_command.clone();
            command.push(target.to_string_lossy().into_owned());
            let hook = HookContext::new(HookType::Format, *version, release_branch_name(version));
            HookExecutor::run_command(&command, &repo.workdir()?, &hook.to_env_vars())?;
        }

        Ok(())
    }

    fn missing(&self, field: String) -> GitReleaseError {
        GitReleaseError::MetadataRewrite {
            path: self.path.display().to_string(),
            field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_GO: &str = r#"package version

// Base version information.
var (
	gitMajor string = ""            // major version, always numeric
	gitMinor string = ""            // minor version, numeric possibly followed by "+"
	gitVersion   string = "v0.0.0-master+$Format:%h$"
	gitCommit    string = "$Format:%H$"
)
"#;

    fn fields() -> MetadataFields {
        MetadataFields {
            major: "gitMajor".to_string(),
            minor: "gitMinor".to_string(),
            version: "gitVersion".to_string(),
        }
    }

    #[test]
    fn test_release_then_dev() {
        let v = VersionSpec::new(1, 3, 4);

        let release = rewrite_contents(BASE_GO, &fields(), &v, RewriteMode::Release).unwrap();
        assert!(release.contains(r#"gitMajor string = "1""#));
        assert!(release.contains(r#"gitMinor string = "3.4""#));
        assert!(release.contains(r#"gitVersion   string = "v1.3.4""#));

        let dev = rewrite_contents(&release, &fields(), &v, RewriteMode::Dev).unwrap();
        assert!(dev.contains(r#"gitMajor string = "1""#));
        assert!(dev.contains(r#"gitMinor string = "3.4+""#));
        assert!(dev.contains(r#"gitVersion   string = "v1.3.4-dev""#));
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let v = VersionSpec::new(2, 0, 0);
        for mode in [RewriteMode::Release, RewriteMode::Dev] {
            let once = rewrite_contents(BASE_GO, &fields(), &v, mode).unwrap();
            let twice = rewrite_contents(&once, &fields(), &v, mode).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_untouched_lines_preserved() {
        let v = VersionSpec::new(1, 0, 0);
        let out = rewrite_contents(BASE_GO, &fields(), &v, RewriteMode::Release).unwrap();
        assert!(out.contains(r#"gitCommit    string = "$Format:%H$""#));
        assert!(out.contains("// major version, always numeric"));
        assert_eq!(out.lines().count(), BASE_GO.lines().count());
    }

    #[test]
    fn test_missing_field_reported() {
        let contents = "var gitMajor = \"1\"\nvar gitMinor = \"2\"\n";
        let err =
            rewrite_contents(contents, &fields(), &VersionSpec::new(1, 2, 3), RewriteMode::Release)
                .unwrap_err();
        assert_eq!(err, "gitVersion");
    }

    #[test]
    fn test_field_name_prefix_is_not_matched() {
        let contents = "gitMajorOld = \"9\"\n";
        assert!(replace_field(contents, "gitMajor", "1").is_none());
    }

    #[test]
    fn test_short_assignment_and_colon_forms() {
        assert_eq!(
            replace_field("version := \"old\"\n", "version", "v1.0.0").unwrap(),
            "version := \"v1.0.0\"\n"
        );
        assert_eq!(
            replace_field("  version: \"old\"\n", "version", "v1.0.0").unwrap(),
            "  version: \"v1.0.0\"\n"
        );
        assert_eq!(
            replace_field("const version = \"old\"\n", "version", "v1.0.0").unwrap(),
            "const version = \"v1.0.0\"\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_formatter_runs_with_format_hook_env() {
        use crate::config::MetadataConfig;
        use crate::git::Git2Repository;

        let dir = tempfile::TempDir::new().unwrap();
        git2::Repository::init(dir.path()).unwrap();
        std::fs::create_dir_all(dir.path().join("pkg/version")).unwrap();
        std::fs::write(dir.path().join("pkg/version/base.go"), BASE_GO).unwrap();
        let repo = Git2Repository::open(dir.path()).unwrap();

        let rewriter = MetadataRewriter::new(&MetadataConfig {
            format_command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "printf '%s %s %s' \"$GITRELEASE_HOOK\" \"$GITRELEASE_VERSION\" \"$GITRELEASE_RELEASE_BRANCH\" > hook.txt"
                    .to_string(),
                "fmt".to_string(),
            ],
            ..MetadataConfig::default()
        });
        rewriter
            .apply(&repo, &VersionSpec::new(1, 3, 4), RewriteMode::Release)
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("hook.txt")).unwrap(),
            "format v1.3.4 release-1.3"
        );
    }
}
