use std::fmt;

use crate::workspace::WorkspaceError;

/// The named steps of the import pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepName {
    Worktree,
    Sync,
    Classify,
    AccountDeclarations,
    DryRun,
    Import,
    Reconcile,
    Merge,
    Cleanup,
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepName::Worktree => "worktree",
            StepName::Sync => "sync",
            StepName::Classify => "classify",
            StepName::AccountDeclarations => "accountDeclarations",
            StepName::DryRun => "dryRun",
            StepName::Import => "import",
            StepName::Reconcile => "reconcile",
            StepName::Merge => "merge",
            StepName::Cleanup => "cleanup",
        };
        write!(f, "{name}")
    }
}

/// A step failure carrying everything the result boundary needs: which step
/// broke, a human-readable message, and an optional remediation hint.
#[derive(Debug)]
pub struct StepError {
    pub step: StepName,
    pub message: String,
    pub hint: Option<String>,
}

impl StepError {
    pub fn new(step: StepName, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} step failed: {}", self.step, self.message)
    }
}

impl std::error::Error for StepError {}

// Workspace creation happens before any step closure runs, so an unmapped
// workspace error is attributed to the worktree step.
impl From<WorkspaceError> for StepError {
    fn from(err: WorkspaceError) -> Self {
        StepError::new(StepName::Worktree, err.to_string())
    }
}
