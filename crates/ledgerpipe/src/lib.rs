//! ledgerpipe imports bank and broker CSV statement exports into a
//! git-backed plain-text ledger. Each run happens inside an isolated git
//! worktree and either merges back as one commit or leaves the primary
//! branch untouched.

pub mod accounts;
pub mod classify;
pub mod config;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod pipeline;
pub mod reconcile;
pub mod rules;
pub mod staging;
pub mod workspace;

pub use config::{Config, ConfigLoader, YamlConfigLoader};
pub use error::{LedgerpipeError, Result};
pub use ledger::{LedgerExecutor, SystemLedger};
pub use pipeline::{ImportPipeline, PipelineResult, RunOptions};
pub use workspace::WorkspaceManager;
