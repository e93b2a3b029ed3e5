use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerpipeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Classification error: {0}")]
    Classify(#[from] crate::classify::ClassifyError),

    #[error("Rules index error: {0}")]
    Rules(#[from] crate::rules::RulesError),

    #[error("Account declaration error: {0}")]
    Accounts(#[from] crate::accounts::AccountsError),

    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] crate::reconcile::ReconcileError),

    #[error("Journal error: {0}")]
    Journal(#[from] crate::journal::JournalError),

    #[error("Ledger command error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] crate::workspace::WorkspaceError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid filename pattern '{pattern}' in provider '{provider}': {reason}")]
    InvalidPattern {
        provider: String,
        pattern: String,
        reason: String,
    },

    #[error("Invalid detection rule in provider '{provider}': {reason}")]
    InvalidRule { provider: String, reason: String },
}

/// Errors from invoking the external ledger binary.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Failed to run ledger command '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger command failed (exit code {exit_code}): {stderr}")]
    Failed { exit_code: i32, stderr: String },
}

pub type Result<T> = std::result::Result<T, LedgerpipeError>;
