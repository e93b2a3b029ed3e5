//! Thin helpers around the `git` binary.

use std::path::Path;
use std::process::{Command, Output};

use super::WorkspaceError;

/// Runs a git command in the given directory.
pub(crate) fn run_git(dir: &Path, args: &[&str]) -> Result<Output, WorkspaceError> {
    Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .map_err(|e| WorkspaceError::GitOperation(e.to_string()))
}

/// Runs a git command and fails on a non-zero exit status.
pub(crate) fn run_git_checked(dir: &Path, args: &[&str]) -> Result<Output, WorkspaceError> {
    let output = run_git(dir, args)?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(WorkspaceError::GitOperation(format_git_error(&output)))
    }
}

/// Formats a git error with both stdout and stderr for better debugging.
pub(crate) fn format_git_error(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

    match (stderr.is_empty(), stdout.is_empty()) {
        (true, true) => format!(
            "Command failed with exit code {}",
            output.status.code().unwrap_or(-1)
        ),
        (true, false) => stdout,
        (false, true) => stderr,
        (false, false) => format!("{}\n{}", stderr, stdout),
    }
}

/// Whether the working tree at `dir` has no pending changes.
pub(crate) fn is_clean(dir: &Path) -> Result<bool, WorkspaceError> {
    let output = run_git_checked(dir, &["status", "--porcelain"])?;
    Ok(output.stdout.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_run_git_checked_surfaces_stderr() {
        let dir = TempDir::new().unwrap();
        let err = run_git_checked(dir.path(), &["rev-parse", "HEAD"]).unwrap_err();
        assert!(matches!(err, WorkspaceError::GitOperation(_)));
    }

    #[test]
    fn test_is_clean_on_fresh_repo() {
        let dir = TempDir::new().unwrap();
        run_git_checked(dir.path(), &["init"]).unwrap();
        assert!(is_clean(dir.path()).unwrap());

        std::fs::write(dir.path().join("file.txt"), "x").unwrap();
        assert!(!is_clean(dir.path()).unwrap());
    }
}
