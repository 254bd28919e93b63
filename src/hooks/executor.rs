use crate::error::{GitReleaseError, Result};
use crate::hooks::{DocumentStamper, HookContext};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Executes external release commands
pub struct HookExecutor;

impl HookExecutor {
    /// Run `command` (program followed by arguments) inside `dir`.
    ///
    /// A program containing a path separator is resolved relative to `dir`;
    /// anything else is looked up on `PATH`.
    ///
    /// # Returns
    /// * `Ok(())` if the command exits with code 0
    /// * `Err` if the program cannot be started or exits non-zero
    pub fn run_command(
        command: &[String],
        dir: &Path,
        env: &HashMap<String, String>,
    ) -> Result<()> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| GitReleaseError::hook("empty command"))?;

        let mut cmd = Command::new(Self::program_path(program, dir));
        cmd.args(args).current_dir(dir).envs(env);

        let output = cmd
            .output()
            .map_err(|e| GitReleaseError::hook(format!("Failed to execute {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(GitReleaseError::hook(format!(
                "{} failed with exit code {}\nStdout: {}\nStderr: {}",
                command.join(" "),
                output.status.code().unwrap_or(-1),
                stdout,
                stderr
            )));
        }

        Ok(())
    }

    /// Locate `program` the same way [`HookExecutor::run_command`] would
    pub fn locate(program: &str, dir: &Path) -> Option<PathBuf> {
        if Self::has_separator(program) {
            let path = Self::program_path(program, dir);
            path.is_file().then_some(path)
        } else {
            which::which(program).ok()
        }
    }

    fn program_path(program: &str, dir: &Path) -> PathBuf {
        let path = Path::new(program);
        if Self::has_separator(program) && path.is_relative() {
            dir.join(path)
        } else {
            path.to_path_buf()
        }
    }

    fn has_separator(program: &str) -> bool {
        program.contains('/') || program.contains(std::path::MAIN_SEPARATOR)
    }
}

/// Document stamper backed by the configured `docs.stamp_commands`.
///
/// Each command runs in the work tree with the version appended as its last
/// argument and the hook context exported as `GITRELEASE_*` variables.
pub struct CommandStamper {
    commands: Vec<Vec<String>>,
    workdir: PathBuf,
}

impl CommandStamper {
    pub fn new(commands: Vec<Vec<String>>, workdir: impl Into<PathBuf>) -> Self {
        CommandStamper {
            commands,
            workdir: workdir.into(),
        }
    }
}

impl DocumentStamper for CommandStamper {
    fn stamp(&self, context: &HookContext) -> Result<()> {
        let env = context.to_env_vars();
        for command in &self.commands {
            let mut full = command.clone();
            full.push(context.version.to_string());
            HookExecutor::run_command(&full, &self.workdir, &env)?;
        }
        Ok(())
    }

    fn required_tools(&self) -> Vec<String> {
        self.commands
            .iter()
            .filter_map(|c| c.first().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VersionSpec;
    use crate::hooks::HookType;

    fn strings(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_command_fails() {
        let result = HookExecutor::run_command(&[], Path::new("."), &HashMap::new());
        assert!(result.unwrap_err().to_string().contains("empty command"));
    }

    #[test]
    fn test_missing_program_fails() {
        let result = HookExecutor::run_command(
            &strings(&["/nonexistent/path/to/stamp.sh"]),
            Path::new("."),
            &HashMap::new(),
        );
        assert!(result.unwrap_err().to_string().contains("Failed to execute"));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_reported() {
        let result = HookExecutor::run_command(
            &strings(&["sh", "-c", "echo broken >&2; exit 3"]),
            Path::new("."),
            &HashMap::new(),
        );
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("exit code 3"));
        assert!(msg.contains("broken"));
    }

    #[cfg(unix)]
    #[test]
    fn test_stamper_passes_version_and_env() {
        let dir = tempfile::TempDir::new().unwrap();
        let stamper = CommandStamper::new(
            vec![strings(&[
                "sh",
                "-c",
                "printf '%s %s' \"$1\" \"$GITRELEASE_RELEASE_BRANCH\" > stamped.txt",
                "stamp",
            ])],
            dir.path(),
        );
        let ctx = HookContext::new(HookType::DocStamp, VersionSpec::new(1, 2, 3), "release-1.2");

        stamper.stamp(&ctx).unwrap();

        let written = std::fs::read_to_string(dir.path().join("stamped.txt")).unwrap();
        assert_eq!(written, "v1.2.3 release-1.2");
    }

    #[test]
    fn test_locate_relative_script() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("hack")).unwrap();
        std::fs::write(dir.path().join("hack/stamp.sh"), "#!/bin/sh\n").unwrap();

        assert!(HookExecutor::locate("hack/stamp.sh", dir.path()).is_some());
        assert!(HookExecutor::locate("hack/missing.sh", dir.path()).is_none());
        assert!(HookExecutor::locate("definitely-not-a-real-tool-xyz", dir.path()).is_none());
    }

    #[test]
    fn test_required_tools() {
        let stamper = CommandStamper::new(
            vec![strings(&["hack/versionize-docs.sh"]), strings(&["make", "docs"])],
            ".",
        );
        assert_eq!(
            stamper.required_tools(),
            vec!["hack/versionize-docs.sh".to_string(), "make".to_string()]
        );
    }
}
