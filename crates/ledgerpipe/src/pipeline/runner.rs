//! The import pipeline: stages pending statement exports into an isolation
//! workspace, classifies them, declares their accounts, dry-runs and imports
//! them with the ledger binary, reconciles against a reported balance, and
//! merges the workspace branch back into the primary branch.
//!
//! Every run produces a [`PipelineResult`]; step failures are converted into
//! a structured failure result at the boundary and never propagate out.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{info, info_span, warn};

use crate::classify::{Classifier, StatementFile};
use crate::config::ConfigLoader;
use crate::ledger::{
    count_transactions, extract_date_range, extract_years, unknown_accounts, LedgerExecutor,
};
use crate::pipeline::context::{PipelineContext, RunOptions, StagedStatement};
use crate::pipeline::error::{StepError, StepName};
use crate::pipeline::result::{
    AccountsDetails, ClassifiedFile, ClassifyDetails, CleanupDetails, DryRunDetails,
    ImportDetails, MergeDetails, PipelineResult, ReconcileDetails, StepResult, SyncDetails,
    WorktreeDetails,
};
use crate::reconcile;
use crate::rules;
use crate::staging;
use crate::workspace::{WorkspaceManager, WorkspaceSession};

/// Metadata key under which classification rules capture a reported
/// closing balance.
const BALANCE_METADATA_KEY: &str = "balance";

const HINT_UNKNOWN_ACCOUNTS: &str = "add rules to categorize unknown transactions";
const HINT_RECONCILE: &str = "check for missing transactions or rules";

pub struct ImportPipeline<'a> {
    config_loader: &'a dyn ConfigLoader,
    ledger: &'a dyn LedgerExecutor,
    workspaces: WorkspaceManager,
}

impl<'a> ImportPipeline<'a> {
    pub fn new(config_loader: &'a dyn ConfigLoader, ledger: &'a dyn LedgerExecutor) -> Self {
        Self {
            config_loader,
            ledger,
            workspaces: WorkspaceManager::new(),
        }
    }

    /// Place isolation worktrees under `base_dir` instead of the system
    /// temp directory.
    pub fn with_workspace_manager(mut self, workspaces: WorkspaceManager) -> Self {
        self.workspaces = workspaces;
        self
    }

    /// Runs the full pipeline against the ledger repository at `directory`.
    /// Never panics or returns an error: every failure mode ends up as a
    /// structured [`PipelineResult`].
    pub fn run(&self, directory: &Path, caller: &str, options: RunOptions) -> PipelineResult {
        let _span = info_span!("import_pipeline", directory = %directory.display(), caller).entered();

        let config = match self.config_loader.load(directory) {
            Ok(config) => config,
            Err(e) => {
                let mut result = PipelineResult::default();
                result.error = Some(format!("Configuration error: {e}"));
                return result;
            }
        };

        // Authorization happens before any side effect, including workspace
        // creation.
        if caller != config.import.allowed_caller {
            warn!(caller, "Rejected unauthorized pipeline caller");
            let mut result = PipelineResult::default();
            result.error = Some(format!(
                "Caller '{caller}' is not authorized to run the import pipeline"
            ));
            return result;
        }

        let mut ctx = PipelineContext::new(directory, caller, options, config);
        let keep_on_error = ctx.options.keep_on_error;

        let outcome: Result<(), StepError> =
            self.workspaces
                .run_isolated(directory, keep_on_error, |session| {
                    self.execute_steps(&mut ctx, session)
                });

        let mut result = ctx.result;
        match outcome {
            Ok(()) => {
                result.success = true;
                if result.summary.is_none() {
                    result.summary = Some(format!(
                        "Imported {} transactions",
                        ctx.transaction_count
                    ));
                }
            }
            Err(e) => {
                info!(step = %e.step, error = %e.message, "Pipeline run failed");
                record_failure(&mut result, &e);
                result.success = false;
                result.error = Some(e.message);
                result.hint = e.hint;
            }
        }
        result
    }

    fn execute_steps(
        &self,
        ctx: &mut PipelineContext,
        session: &mut WorkspaceSession<'_>,
    ) -> Result<(), StepError> {
        self.step_worktree(ctx, session);
        self.in_step(StepName::Sync, || self.step_sync(ctx, session))?;
        self.in_step(StepName::Classify, || self.step_classify(ctx, session))?;
        self.in_step(StepName::AccountDeclarations, || {
            self.step_declare_accounts(ctx, session)
        })?;
        let transactions = self.in_step(StepName::DryRun, || self.step_dry_run(ctx, session))?;
        if transactions == 0 {
            // Nothing to import: skip the remaining steps and let disposal
            // discard the workspace.
            short_circuit_empty(ctx);
            return Ok(());
        }
        self.in_step(StepName::Import, || self.step_import(ctx, session))?;
        self.in_step(StepName::Reconcile, || self.step_reconcile(ctx, session))?;
        self.step_cleanup_schedule(ctx);
        self.in_step(StepName::Merge, || self.step_merge(ctx, session))?;
        self.step_cleanup_amend(ctx);
        Ok(())
    }

    fn in_step<T>(
        &self,
        step: StepName,
        f: impl FnOnce() -> Result<T, StepError>,
    ) -> Result<T, StepError> {
        let _span = info_span!("pipeline_step", step = %step).entered();
        f()
    }

    fn step_worktree(&self, ctx: &mut PipelineContext, session: &WorkspaceSession<'_>) {
        let workspace = &session.workspace;
        ctx.result.worktree_id = Some(workspace.id.clone());
        ctx.result.steps.worktree = Some(StepResult::ok_with(
            format!("Created isolation workspace on branch '{}'", workspace.branch),
            WorktreeDetails {
                id: workspace.id.clone(),
                branch: workspace.branch.clone(),
                path: workspace.path.display().to_string(),
            },
        ));
    }

    /// Copies pending CSV exports into the workspace import directory. The
    /// primary repository is left untouched until cleanup.
    fn step_sync(
        &self,
        ctx: &mut PipelineContext,
        session: &WorkspaceSession<'_>,
    ) -> Result<(), StepError> {
        let source = ctx.directory.join(&ctx.config.paths.pending);
        let dest = session.path().join(&ctx.config.paths.import);
        let outcome = staging::sync_csv_files(&source, &dest);

        if outcome.succeeded.is_empty() && !outcome.errors.is_empty() {
            return Err(StepError::new(
                StepName::Sync,
                format!("Failed to copy any pending statements from '{}'", source.display()),
            ));
        }

        ctx.staged = outcome
            .succeeded
            .iter()
            .map(|src| {
                let name = src.file_name().unwrap_or_default();
                StagedStatement {
                    source: src.clone(),
                    staged: dest.join(name),
                }
            })
            .collect();

        let copied: Vec<String> = ctx
            .staged
            .iter()
            .filter_map(|s| s.staged.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect();
        let message = if copied.is_empty() {
            "No pending statements to copy".to_string()
        } else {
            format!("Copied {} pending statement(s)", copied.len())
        };
        ctx.result.steps.sync = Some(StepResult::ok_with(
            message,
            SyncDetails {
                copied,
                errors: outcome.errors,
            },
        ));
        Ok(())
    }

    /// Detects each staged statement's provider and currency and renames it
    /// to its canonical form. Unrecognized files are reported but do not
    /// abort the batch.
    fn step_classify(
        &self,
        ctx: &mut PipelineContext,
        session: &WorkspaceSession<'_>,
    ) -> Result<(), StepError> {
        if ctx.options.skip_classify {
            ctx.result.steps.classify = Some(StepResult::ok("Classification skipped"));
            return Ok(());
        }

        let mut inputs = Vec::with_capacity(ctx.staged.len());
        for statement in &ctx.staged {
            let content = std::fs::read_to_string(&statement.staged).map_err(|e| {
                StepError::new(
                    StepName::Classify,
                    format!("Failed to read '{}': {e}", statement.staged.display()),
                )
            })?;
            inputs.push(StatementFile {
                filename: statement
                    .staged
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
                content,
            });
        }

        let classifier = Classifier::new(&ctx.config.providers);
        let results = classifier.classify_all(&inputs);

        // Staged paths currently claimed by this batch. A rename may not
        // land on a path another statement still occupies; clobbering it
        // would orphan that statement's content before import.
        let mut claimed: HashSet<PathBuf> =
            ctx.staged.iter().map(|s| s.staged.clone()).collect();

        let mut files = Vec::with_capacity(results.len());
        for (i, classification) in results.iter().enumerate() {
            let mut entry = ClassifiedFile {
                filename: classification.filename.clone(),
                provider: None,
                currency: None,
                renamed: None,
                error: classification.error.clone(),
            };
            if let Some(detection) = &classification.detection {
                entry.provider = Some(detection.provider.clone());
                entry.currency = Some(detection.currency.clone());

                if ctx.metadata_balance.is_none() {
                    if let Some(balance) = detection.metadata.get(BALANCE_METADATA_KEY) {
                        ctx.metadata_balance = Some(balance.clone());
                    }
                }

                if let Some(renamed) = &detection.renamed {
                    let statement = &mut ctx.staged[i];
                    let target = statement
                        .staged
                        .parent()
                        .map(|p| p.join(renamed))
                        .unwrap_or_else(|| PathBuf::from(renamed));
                    if target == statement.staged {
                        entry.renamed = Some(renamed.clone());
                    } else if claimed.contains(&target) {
                        entry.error = Some(format!(
                            "Rename target '{renamed}' is already used by another \
                             statement in this batch; statement left as '{}'",
                            entry.filename
                        ));
                        warn!(
                            file = %entry.filename,
                            target = %renamed,
                            "rename collision, statement not renamed"
                        );
                    } else {
                        std::fs::rename(&statement.staged, &target).map_err(|e| {
                            StepError::new(
                                StepName::Classify,
                                format!(
                                    "Failed to rename '{}' to '{renamed}': {e}",
                                    statement.staged.display()
                                ),
                            )
                        })?;
                        claimed.remove(&statement.staged);
                        claimed.insert(target.clone());
                        statement.staged = target;
                        entry.renamed = Some(renamed.clone());
                    }
                }
            }
            files.push(entry);
        }

        ctx.classifications = results;
        let recognized = files.iter().filter(|f| f.provider.is_some()).count();
        ctx.result.steps.classify = Some(StepResult::ok_with(
            format!("Classified {recognized} of {} statement(s)", files.len()),
            ClassifyDetails { files },
        ));

        session_commit(session, "Stage pending statements", StepName::Classify)?;
        Ok(())
    }

    /// Resolves rules files for the staged statements, determines the
    /// transaction year, and declares any missing accounts in the year
    /// journal.
    fn step_declare_accounts(
        &self,
        ctx: &mut PipelineContext,
        session: &WorkspaceSession<'_>,
    ) -> Result<(), StepError> {
        let import_dir = session.path().join(&ctx.config.paths.import);
        let csvs = staging::list_pending_csvs(
            &import_dir,
            ctx.options.provider.as_deref(),
            ctx.options.currency.as_deref(),
        );

        if csvs.is_empty() {
            ctx.result.steps.account_declarations =
                Some(StepResult::ok("No statements to process"));
            return Ok(());
        }

        let rules_dir = session.path().join(&ctx.config.paths.rules);
        let mapping = rules::build_mapping(&rules_dir)
            .map_err(|e| StepError::new(StepName::AccountDeclarations, e.to_string()))?;

        let mut pairs = Vec::new();
        let mut rule_files: Vec<PathBuf> = Vec::new();
        for csv in &csvs {
            match rules::lookup(csv, &mapping) {
                Some(rule) => {
                    if !rule_files.iter().any(|r| r == rule) {
                        rule_files.push(rule.to_path_buf());
                    }
                    pairs.push((csv.clone(), rule.to_path_buf()));
                }
                None => {
                    warn!(csv = %csv.display(), "No rules file claims this statement");
                }
            }
        }

        if pairs.is_empty() {
            ctx.pairs = pairs;
            ctx.result.steps.account_declarations =
                Some(StepResult::ok("No statements matched a rules file"));
            return Ok(());
        }

        // The transaction year comes from the first rules file whose
        // generated entries carry a date.
        let mut year = None;
        for (csv, rule) in &pairs {
            let output =
                self.print_entries(session.path(), csv, rule, StepName::AccountDeclarations)?;
            let years = extract_years(&output);
            if let Some(first) = years.first() {
                year = Some(*first);
                break;
            }
        }
        let year = year.ok_or_else(|| {
            StepError::new(
                StepName::AccountDeclarations,
                "Unable to determine the transaction year from any statement",
            )
        })?;

        let accounts = crate::accounts::collect_accounts(&rule_files)
            .map_err(|e| StepError::new(StepName::AccountDeclarations, e.to_string()))?;
        let journal = ctx.config.ledger.year_journal_path(session.path(), year);
        let outcome = crate::accounts::ensure_declared(&journal, &accounts)
            .map_err(|e| StepError::new(StepName::AccountDeclarations, e.to_string()))?;

        let message = if outcome.added.is_empty() {
            format!("All accounts already declared for {year}")
        } else {
            format!("Declared {} account(s) for {year}", outcome.added.len())
        };
        ctx.result.steps.account_declarations = Some(StepResult::ok_with(
            message,
            AccountsDetails {
                year,
                added: outcome.added,
            },
        ));

        ctx.pairs = pairs;
        ctx.rule_files = rule_files;
        ctx.declared_year = Some(year);

        session_commit(session, "Declare imported accounts", StepName::AccountDeclarations)?;
        Ok(())
    }

    /// Generates entries for every statement without touching the journal.
    /// Unknown accounts fail the run before any import happens.
    fn step_dry_run(
        &self,
        ctx: &mut PipelineContext,
        session: &WorkspaceSession<'_>,
    ) -> Result<usize, StepError> {
        let mut transactions = 0;
        let mut unknown: Vec<String> = Vec::new();
        let mut range: Option<(chrono::NaiveDate, chrono::NaiveDate)> = None;

        let pairs = ctx.pairs.clone();
        for (csv, rule) in &pairs {
            let output = self.print_entries(session.path(), csv, rule, StepName::DryRun)?;
            transactions += count_transactions(&output);
            for account in unknown_accounts(&output) {
                if !unknown.contains(&account) {
                    unknown.push(account);
                }
            }
            if let Some((from, until)) = extract_date_range(&output) {
                range = Some(match range {
                    None => (from, until),
                    Some((lo, hi)) => (lo.min(from), hi.max(until)),
                });
            }
        }

        ctx.transaction_count = transactions;
        ctx.date_range = range;

        if !unknown.is_empty() {
            ctx.result.steps.dry_run = Some(StepResult {
                success: false,
                message: format!(
                    "Dry run found {} transaction(s) with unknown accounts",
                    transactions
                ),
                details: Some(DryRunDetails {
                    transactions,
                    unknown_accounts: unknown.clone(),
                }),
            });
            return Err(StepError::new(
                StepName::DryRun,
                format!(
                    "Dry run found transactions with unknown accounts: {}",
                    unknown.join(", ")
                ),
            )
            .with_hint(HINT_UNKNOWN_ACCOUNTS));
        }

        ctx.result.steps.dry_run = Some(StepResult::ok_with(
            format!("Dry run generated {transactions} transaction(s)"),
            DryRunDetails {
                transactions,
                unknown_accounts: Vec::new(),
            },
        ));
        Ok(transactions)
    }

    /// Imports the staged statements into the main journal inside the
    /// workspace.
    fn step_import(
        &self,
        ctx: &mut PipelineContext,
        session: &WorkspaceSession<'_>,
    ) -> Result<(), StepError> {
        let journal = ctx.config.ledger.journal.clone();
        let mut files = Vec::new();

        let pairs = ctx.pairs.clone();
        for (csv, rule) in &pairs {
            let csv_arg = csv.display().to_string();
            let rule_arg = rule.display().to_string();
            let output = self
                .ledger
                .execute(
                    session.path(),
                    &["import", "-f", &journal, "--rules-file", &rule_arg, &csv_arg],
                )
                .map_err(|e| StepError::new(StepName::Import, e.to_string()))?;
            if !output.success() {
                return Err(StepError::new(
                    StepName::Import,
                    format!(
                        "Import of '{}' failed: {}",
                        csv.display(),
                        output.stderr.trim()
                    ),
                ));
            }
            if let Some(name) = csv.file_name() {
                files.push(name.to_string_lossy().to_string());
            }
        }

        // Remember which primary-repository files fed the import; cleanup
        // removes them after the merge. Each imported workspace file maps
        // back to exactly one source so no unrelated pending file is
        // scheduled for removal.
        let mut imported: Vec<PathBuf> = Vec::new();
        for (csv, _) in &ctx.pairs {
            if let Some(statement) = ctx.staged.iter().find(|s| s.staged == *csv) {
                if !imported.contains(&statement.source) {
                    imported.push(statement.source.clone());
                }
            }
        }
        ctx.imported_sources = imported;

        let (from, until) = match ctx.date_range {
            Some((from, until)) => (Some(from), Some(until)),
            None => (None, None),
        };
        ctx.result.steps.import = Some(StepResult::ok_with(
            format!("Imported {} transaction(s)", ctx.transaction_count),
            ImportDetails {
                transactions: ctx.transaction_count,
                files,
                from,
                until,
            },
        ));

        session_commit(session, "Import transactions", StepName::Import)?;
        Ok(())
    }

    /// Compares the ledger's computed balance against the reported closing
    /// balance. Without a reported balance the step succeeds with a note.
    fn step_reconcile(
        &self,
        ctx: &mut PipelineContext,
        session: &WorkspaceSession<'_>,
    ) -> Result<(), StepError> {
        let (from, until) = match ctx.date_range {
            Some((from, until)) => (Some(from), Some(until)),
            None => (None, None),
        };

        let expected = match ctx.expected_balance() {
            Some(expected) => expected.to_string(),
            None => {
                ctx.result.steps.reconcile = Some(StepResult::ok_with(
                    "No reported balance to reconcile against",
                    ReconcileDetails {
                        expected: None,
                        actual: None,
                        from,
                        until,
                    },
                ));
                return Ok(());
            }
        };

        let account = self.reconcile_account(ctx)?;
        let journal = ctx.config.ledger.journal.clone();
        let output = self
            .ledger
            .execute(session.path(), &["balance", "-f", &journal, &account])
            .map_err(|e| StepError::new(StepName::Reconcile, e.to_string()))?;
        if !output.success() {
            return Err(StepError::new(
                StepName::Reconcile,
                format!("Balance query failed: {}", output.stderr.trim()),
            ));
        }

        // The default balance report ends with the total row.
        let actual = output
            .stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.chars().all(|c| c == '-'))
            .unwrap_or_default()
            .to_string();

        let matched = reconcile::matches(&expected, &actual)
            .map_err(|e| StepError::new(StepName::Reconcile, e.to_string()).with_hint(HINT_RECONCILE))?;

        let details = ReconcileDetails {
            expected: Some(expected.clone()),
            actual: Some(actual.clone()),
            from,
            until,
        };

        if !matched {
            let delta = reconcile::difference(&expected, &actual)
                .map_err(|e| StepError::new(StepName::Reconcile, e.to_string()))?;
            ctx.result.steps.reconcile = Some(StepResult {
                success: false,
                message: format!(
                    "Reconciliation failed: expected {expected}, actual {actual} ({delta})"
                ),
                details: Some(details),
            });
            return Err(StepError::new(
                StepName::Reconcile,
                format!(
                    "Reconciliation failed: expected {expected}, actual {actual} ({delta})"
                ),
            )
            .with_hint(HINT_RECONCILE));
        }

        ctx.result.steps.reconcile = Some(StepResult::ok_with(
            format!("Balance reconciled at {expected}"),
            details,
        ));
        Ok(())
    }

    /// Cleanup is announced before the merge so the step ordering is
    /// visible in the result even when the merge fails; the actual file
    /// removal only happens afterwards.
    fn step_cleanup_schedule(&self, ctx: &mut PipelineContext) {
        ctx.result.steps.cleanup = Some(StepResult::ok_with(
            format!(
                "Scheduled removal of {} imported statement(s) after merge",
                ctx.imported_sources.len()
            ),
            CleanupDetails::default(),
        ));
    }

    fn step_merge(
        &self,
        ctx: &mut PipelineContext,
        session: &mut WorkspaceSession<'_>,
    ) -> Result<(), StepError> {
        let message = merge_message(ctx);
        session
            .merge(&message, &ctx.config.import.main_branch)
            .map_err(|e| StepError::new(StepName::Merge, e.to_string()))?;
        ctx.result.steps.merge = Some(StepResult::ok_with(
            "Merged workspace into primary branch".to_string(),
            MergeDetails {
                commit_message: message,
            },
        ));
        Ok(())
    }

    /// Best-effort removal of the imported exports from the primary pending
    /// directory; failures are reported in the step details but never fail
    /// the run.
    fn step_cleanup_amend(&self, ctx: &mut PipelineContext) {
        let outcome = staging::delete_files(&ctx.imported_sources);
        let removed: Vec<String> = outcome
            .succeeded
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        ctx.result.steps.cleanup = Some(StepResult::ok_with(
            format!("Removed {} imported statement(s)", removed.len()),
            CleanupDetails {
                removed,
                errors: outcome.errors,
            },
        ));
    }

    fn print_entries(
        &self,
        workdir: &Path,
        csv: &Path,
        rule: &Path,
        step: StepName,
    ) -> Result<String, StepError> {
        let csv_arg = csv.display().to_string();
        let rule_arg = rule.display().to_string();
        let output = self
            .ledger
            .execute(workdir, &["print", "--rules-file", &rule_arg, "-f", &csv_arg])
            .map_err(|e| StepError::new(step, e.to_string()))?;
        if !output.success() {
            return Err(StepError::new(
                step,
                format!(
                    "Generating entries for '{}' failed: {}",
                    csv.display(),
                    output.stderr.trim()
                ),
            ));
        }
        Ok(output.stdout)
    }

    /// The account whose balance is reconciled: the first `account1`
    /// assignment of the first matched rules file.
    fn reconcile_account(&self, ctx: &PipelineContext) -> Result<String, StepError> {
        let rule = ctx.rule_files.first().ok_or_else(|| {
            StepError::new(StepName::Reconcile, "No rules file available to reconcile against")
        })?;
        let content = std::fs::read_to_string(rule).map_err(|e| {
            StepError::new(
                StepName::Reconcile,
                format!("Failed to read '{}': {e}", rule.display()),
            )
        })?;
        let assignment = Regex::new(r"(?m)^\s*account1\s+(\S.*?)\s*$").map_err(|e| {
            StepError::new(StepName::Reconcile, e.to_string())
        })?;
        assignment
            .captures(&content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                StepError::new(
                    StepName::Reconcile,
                    format!("No account1 assignment in '{}'", rule.display()),
                )
            })
    }
}

fn session_commit(
    session: &WorkspaceSession<'_>,
    message: &str,
    step: StepName,
) -> Result<(), StepError> {
    session
        .commit(message)
        .map(|_| ())
        .map_err(|e| StepError::new(step, e.to_string()))
}

/// Marks the remaining steps as skipped when the dry run generated no
/// transactions.
fn short_circuit_empty(ctx: &mut PipelineContext) {
    ctx.result.steps.import = Some(StepResult::ok("Skipped: no transactions to import"));
    ctx.result.steps.reconcile = Some(StepResult::ok("Skipped: no transactions to import"));
    ctx.result.steps.merge = Some(StepResult::ok("Skipped: no transactions to import"));
    ctx.result.summary = Some("No transactions found; nothing to import".to_string());
}

/// `Import: <PROVIDER>[ <CURRENCY>][ <FROM> to <UNTIL>][ (<N> transactions)]`
fn merge_message(ctx: &PipelineContext) -> String {
    let first_detection = ctx
        .classifications
        .iter()
        .find_map(|c| c.detection.as_ref());

    let provider = ctx
        .options
        .provider
        .clone()
        .or_else(|| first_detection.map(|d| d.provider.clone()))
        .unwrap_or_else(|| "statements".to_string())
        .to_uppercase();
    let currency = ctx
        .options
        .currency
        .clone()
        .or_else(|| first_detection.map(|d| d.currency.clone()))
        .map(|c| c.to_uppercase());

    let mut message = format!("Import: {provider}");
    if let Some(currency) = currency {
        message.push(' ');
        message.push_str(&currency);
    }
    if let Some((from, until)) = ctx.date_range {
        message.push_str(&format!(" {from} to {until}"));
    }
    if ctx.transaction_count > 0 {
        message.push_str(&format!(" ({} transactions)", ctx.transaction_count));
    }
    message
}

fn record_failure(result: &mut PipelineResult, error: &StepError) {
    let message = error.message.clone();
    let steps = &mut result.steps;
    match error.step {
        StepName::Worktree => fill_failed(&mut steps.worktree, message),
        StepName::Sync => fill_failed(&mut steps.sync, message),
        StepName::Classify => fill_failed(&mut steps.classify, message),
        StepName::AccountDeclarations => fill_failed(&mut steps.account_declarations, message),
        StepName::DryRun => fill_failed(&mut steps.dry_run, message),
        StepName::Import => fill_failed(&mut steps.import, message),
        StepName::Reconcile => fill_failed(&mut steps.reconcile, message),
        StepName::Merge => fill_failed(&mut steps.merge, message),
        StepName::Cleanup => fill_failed(&mut steps.cleanup, message),
    }
}

/// Records the failure into the step's slot unless the step already wrote
/// its own (richer) failure result.
fn fill_failed<D>(slot: &mut Option<StepResult<D>>, message: String) {
    match slot {
        Some(existing) if !existing.success => {}
        _ => *slot = Some(StepResult::failed(message)),
    }
}
