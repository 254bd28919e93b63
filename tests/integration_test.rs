// tests/integration_test.rs
use std::process::Command;

fn git_release() -> Command {
    Command::new(env!("CARGO_BIN_EXE_git-release"))
}

#[test]
fn test_git_release_help() {
    let output = git_release()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("git-release"));
    assert!(stdout.contains("backmerge"));
}

#[test]
fn test_git_release_version() {
    let output = git_release()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_version_argument() {
    let output = git_release().output().expect("Failed to execute command");
    assert!(!output.status.success());
}

#[test]
fn test_invalid_version_fails_before_opening_repository() {
    // Not a repository: a malformed version must be reported first
    let dir = tempfile::TempDir::new().unwrap();
    for bad in ["1.2.3", "v1.2", "v01.2.3", "v1.2.3-rc.1"] {
        let output = git_release()
            .arg(bad)
            .current_dir(dir.path())
            .output()
            .expect("Failed to execute command");

        assert_eq!(output.status.code(), Some(1), "version {}", bad);
        let stderr = String::from_utf8(output.stderr).unwrap();
        assert!(stderr.contains("Invalid version"), "stderr: {}", stderr);
    }
}

#[test]
fn test_valid_version_outside_repository() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = git_release()
        .arg("v1.2.3")
        .current_dir(dir.path())
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("ERROR"));
}
