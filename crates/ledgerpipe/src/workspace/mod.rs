//! Isolation workspaces: disposable, branch-scoped working copies of the
//! ledger repository, created as git worktrees. A pipeline run stages all
//! of its mutations inside one workspace and only a non-fast-forward merge
//! back into the primary branch makes them permanent.

mod git;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use git::{format_git_error, is_clean, run_git, run_git_checked};

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("'{}' is not a git repository", .0.display())]
    NotARepository(PathBuf),

    #[error("Failed to create workspace: {0}")]
    CreateFailed(String),

    #[error("Git operation failed: {0}")]
    GitOperation(String),

    #[error("Merge failed: {0}")]
    MergeFailed(String),

    #[error("Failed to remove workspace '{}': {message}", .path.display())]
    RemoveFailed { path: PathBuf, message: String },
}

/// A live branch-scoped working copy. Never reused across runs.
#[derive(Debug, Clone)]
pub struct IsolationWorkspace {
    pub id: String,
    pub path: PathBuf,
    pub branch: String,
    pub main_repo: PathBuf,
}

/// Creates, merges and disposes of isolation workspaces.
#[derive(Debug, Default)]
pub struct WorkspaceManager {
    /// Where worktrees are placed; defaults to the system temp directory.
    base_dir: Option<PathBuf>,
}

impl WorkspaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    /// Adds a worktree on a fresh `import/<id>` branch off the current
    /// primary branch head.
    pub fn create(&self, repo: &Path) -> Result<IsolationWorkspace, WorkspaceError> {
        if !repo.join(".git").exists() {
            return Err(WorkspaceError::NotARepository(repo.to_path_buf()));
        }

        let id = Uuid::new_v4().simple().to_string()[..8].to_string();
        let branch = format!("import/{id}");
        let base = self
            .base_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let path = base.join(format!("ledgerpipe-{id}"));

        let path_str = path.to_string_lossy().to_string();
        let output = run_git(repo, &["worktree", "add", "-b", &branch, &path_str])?;
        if !output.status.success() {
            return Err(WorkspaceError::CreateFailed(format_git_error(&output)));
        }

        debug!(%id, %branch, path = %path.display(), "Created isolation workspace");

        Ok(IsolationWorkspace {
            id,
            path,
            branch,
            main_repo: repo.to_path_buf(),
        })
    }

    /// Stages everything in the workspace and commits. A clean tree is a
    /// no-op and returns `Ok(false)`.
    pub fn commit(
        &self,
        workspace: &IsolationWorkspace,
        message: &str,
    ) -> Result<bool, WorkspaceError> {
        run_git_checked(&workspace.path, &["add", "-A"])?;
        if is_clean(&workspace.path)? {
            return Ok(false);
        }
        run_git_checked(&workspace.path, &["commit", "-m", message])?;
        Ok(true)
    }

    /// Non-fast-forward merge of the workspace branch into `target_branch`,
    /// preserving the isolated change as one logical unit. The primary
    /// repository must have `target_branch` checked out; merging into
    /// whatever happens to be checked out would land the import on the
    /// wrong branch.
    pub fn merge(
        &self,
        workspace: &IsolationWorkspace,
        message: &str,
        target_branch: &str,
    ) -> Result<(), WorkspaceError> {
        let head = run_git_checked(&workspace.main_repo, &["branch", "--show-current"])?;
        let current = String::from_utf8_lossy(&head.stdout).trim().to_string();
        if current != target_branch {
            return Err(WorkspaceError::MergeFailed(format!(
                "primary repository has '{current}' checked out, expected '{target_branch}'"
            )));
        }
        let output = run_git(
            &workspace.main_repo,
            &["merge", "--no-ff", "-m", message, &workspace.branch],
        )?;
        if !output.status.success() {
            return Err(WorkspaceError::MergeFailed(format_git_error(&output)));
        }
        info!(branch = %workspace.branch, "Merged workspace into primary branch");
        Ok(())
    }

    /// Removes the worktree and deletes its branch.
    pub fn remove(&self, workspace: &IsolationWorkspace) -> Result<(), WorkspaceError> {
        let path_str = workspace.path.to_string_lossy().to_string();
        let output = run_git(
            &workspace.main_repo,
            &["worktree", "remove", "--force", &path_str],
        )?;
        if !output.status.success() {
            return Err(WorkspaceError::RemoveFailed {
                path: workspace.path.clone(),
                message: format_git_error(&output),
            });
        }

        // Branch deletion is cleanup only; a failure here leaves a stray
        // branch, not a stray working copy.
        let _ = run_git(&workspace.main_repo, &["branch", "-D", &workspace.branch]);
        Ok(())
    }

    /// Runs `f` against a freshly created workspace and disposes of it
    /// exactly once: discard after success (any merge already happened
    /// inside `f`), discard after failure when `keep_on_error` is off, and
    /// preserve otherwise. A failed merge always preserves the workspace —
    /// it holds the only copy of the staged work.
    pub fn run_isolated<T, E, F>(
        &self,
        repo: &Path,
        keep_on_error: bool,
        f: F,
    ) -> Result<T, E>
    where
        E: From<WorkspaceError>,
        F: FnOnce(&mut WorkspaceSession<'_>) -> Result<T, E>,
    {
        let workspace = self.create(repo)?;
        let mut session = WorkspaceSession {
            manager: self,
            workspace,
            merge_failed: false,
        };

        let result = f(&mut session);

        match &result {
            Ok(_) => self.dispose(&session.workspace),
            Err(_) if session.merge_failed || keep_on_error => {
                info!(
                    path = %session.workspace.path.display(),
                    branch = %session.workspace.branch,
                    "Preserving failed workspace for inspection"
                );
            }
            Err(_) => self.dispose(&session.workspace),
        }

        result
    }

    /// Removal failures are reported, never silently swallowed.
    fn dispose(&self, workspace: &IsolationWorkspace) {
        if let Err(e) = self.remove(workspace) {
            error!(
                path = %workspace.path.display(),
                error = %e,
                "Failed to remove isolation workspace"
            );
        }
    }
}

/// Handle given to the closure of [`WorkspaceManager::run_isolated`];
/// tracks whether a merge was attempted and failed so disposal can honor
/// the preserve-on-failed-merge rule.
pub struct WorkspaceSession<'a> {
    manager: &'a WorkspaceManager,
    pub workspace: IsolationWorkspace,
    merge_failed: bool,
}

impl WorkspaceSession<'_> {
    pub fn path(&self) -> &Path {
        &self.workspace.path
    }

    pub fn commit(&self, message: &str) -> Result<bool, WorkspaceError> {
        self.manager.commit(&self.workspace, message)
    }

    pub fn merge(&mut self, message: &str, target_branch: &str) -> Result<(), WorkspaceError> {
        match self.manager.merge(&self.workspace, message, target_branch) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.merge_failed = true;
                Err(e)
            }
        }
    }
}
