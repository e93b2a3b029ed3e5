use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::classify::ClassificationResult;
use crate::config::Config;
use crate::pipeline::result::PipelineResult;

/// Caller-supplied knobs for a single pipeline run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Restrict processing to statements of this provider.
    pub provider: Option<String>,
    /// Restrict processing to statements of this currency.
    pub currency: Option<String>,
    /// Reported closing balance to reconcile against, e.g. `"CHF 1234.50"`.
    /// Overrides any balance captured from statement metadata.
    pub statement_balance: Option<String>,
    /// Skip classification and renaming of staged statements.
    pub skip_classify: bool,
    /// Preserve the isolation workspace when a step fails.
    pub keep_on_error: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            provider: None,
            currency: None,
            statement_balance: None,
            skip_classify: false,
            keep_on_error: true,
        }
    }
}

/// A pending statement and where its staged copy currently lives inside the
/// workspace. The staged path moves when classification renames the file.
#[derive(Debug, Clone)]
pub struct StagedStatement {
    pub source: PathBuf,
    pub staged: PathBuf,
}

/// Mutable state threaded through the pipeline steps. Each step reads what
/// earlier steps produced and records its own outcome into `result`.
pub struct PipelineContext {
    pub directory: PathBuf,
    pub caller: String,
    pub options: RunOptions,
    pub config: Config,
    pub result: PipelineResult,

    pub staged: Vec<StagedStatement>,
    pub classifications: Vec<ClassificationResult>,
    /// Closing balance captured from statement metadata during classification.
    pub metadata_balance: Option<String>,
    /// `(csv, rules file)` pairs resolved by the rules index.
    pub pairs: Vec<(PathBuf, PathBuf)>,
    pub rule_files: Vec<PathBuf>,
    pub declared_year: Option<i32>,
    pub transaction_count: usize,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Source pending files whose staged copies were imported, scheduled for
    /// removal from the primary repository after a successful merge.
    pub imported_sources: Vec<PathBuf>,
}

impl PipelineContext {
    pub fn new(directory: &Path, caller: &str, options: RunOptions, config: Config) -> Self {
        Self {
            directory: directory.to_path_buf(),
            caller: caller.to_string(),
            options,
            config,
            result: PipelineResult::default(),
            staged: Vec::new(),
            classifications: Vec::new(),
            metadata_balance: None,
            pairs: Vec::new(),
            rule_files: Vec::new(),
            declared_year: None,
            transaction_count: 0,
            date_range: None,
            imported_sources: Vec::new(),
        }
    }

    /// The balance to reconcile against, caller-supplied value first.
    pub fn expected_balance(&self) -> Option<&str> {
        self.options
            .statement_balance
            .as_deref()
            .or(self.metadata_balance.as_deref())
    }
}
