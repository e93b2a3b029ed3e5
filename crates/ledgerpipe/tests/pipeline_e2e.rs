//! End-to-end pipeline runs against real git repositories, with the ledger
//! binary replaced by a scripted executor.

mod common;

use common::{leftover_workspaces, FakeLedger, LedgerRepo, ACME_CSV};

use ledgerpipe::pipeline::PipelineResult;
use ledgerpipe::{ImportPipeline, RunOptions, WorkspaceManager, YamlConfigLoader};
use tempfile::TempDir;

const PRINT_OK: &str = "\
2026-01-05 Coffee
    expenses:food                    5.00 CHF
    assets:bank:acme                -5.00 CHF

2026-01-06 Salary
    assets:bank:acme               100.00 CHF
    income:salary                 -100.00 CHF
";

const PRINT_UNKNOWN: &str = "\
2026-01-05 Coffee
    expenses:unknown                 5.00 CHF
    assets:bank:acme                -5.00 CHF
";

const BALANCE_OK: &str = "\
           95.00 CHF  assets:bank:acme
--------------------
           95.00 CHF
";

const BALANCE_OFF: &str = "\
          105.50 CHF  assets:bank:acme
--------------------
          105.50 CHF
";

fn run_pipeline(
    repo: &LedgerRepo,
    ledger: &FakeLedger,
    workspaces: &TempDir,
    caller: &str,
    options: RunOptions,
) -> PipelineResult {
    let loader = YamlConfigLoader;
    let pipeline = ImportPipeline::new(&loader, ledger)
        .with_workspace_manager(WorkspaceManager::with_base_dir(workspaces.path()));
    pipeline.run(repo.path(), caller, options)
}

#[test]
fn test_successful_import_merges_and_cleans_up() {
    let repo = LedgerRepo::new();
    let pending = repo.add_pending("acme-export.csv", ACME_CSV);
    repo.commit_all("Add pending statement");

    let workspaces = TempDir::new().unwrap();
    let ledger = FakeLedger::new(PRINT_OK, BALANCE_OK);
    let result = run_pipeline(&repo, &ledger, &workspaces, "bookkeeper", RunOptions::default());

    assert!(result.success, "pipeline failed: {:?}", result.error);
    assert!(result.worktree_id.is_some());
    assert!(result.steps.merge.as_ref().unwrap().success);
    assert!(result.steps.reconcile.as_ref().unwrap().success);

    // The merge landed as one non-fast-forward commit on main.
    let subjects = repo.log_subjects();
    assert!(
        subjects
            .iter()
            .any(|s| s == "Import: ACME CHF 2026-01-05 to 2026-01-06 (2 transactions)"),
        "merge commit missing: {subjects:?}"
    );

    // The classified statement and the declared accounts reached main.
    assert!(repo.path().join("import/acme-chf.csv").exists());
    let year_journal = std::fs::read_to_string(repo.path().join("2026.journal")).unwrap();
    assert!(year_journal.contains("account assets:bank:acme"));
    assert!(year_journal.contains("account expenses:food"));

    // The imported export was removed from the pending directory and the
    // workspace was disposed of.
    assert!(!pending.exists());
    assert!(leftover_workspaces(workspaces.path()).is_empty());
    assert!(repo.import_branches().is_empty());
}

#[test]
fn test_unknown_accounts_fail_dry_run_and_preserve_workspace() {
    let repo = LedgerRepo::new();
    repo.add_pending("acme-export.csv", ACME_CSV);
    repo.commit_all("Add pending statement");

    let workspaces = TempDir::new().unwrap();
    let ledger = FakeLedger::new(PRINT_UNKNOWN, BALANCE_OK);
    let result = run_pipeline(&repo, &ledger, &workspaces, "bookkeeper", RunOptions::default());

    assert!(!result.success);
    let dry_run = result.steps.dry_run.as_ref().unwrap();
    assert!(!dry_run.success);
    assert!(result.error.as_ref().unwrap().contains("unknown accounts"));
    assert_eq!(
        result.hint.as_deref(),
        Some("add rules to categorize unknown transactions")
    );

    // Nothing was merged or imported; main only has the setup commits.
    assert!(result.steps.merge.is_none());
    assert!(!repo.log_subjects().iter().any(|s| s.starts_with("Import:")));

    // The workspace and its branch stay around for inspection.
    assert_eq!(leftover_workspaces(workspaces.path()).len(), 1);
    assert_eq!(repo.import_branches().len(), 1);
}

#[test]
fn test_rename_collision_keeps_unimported_statement_pending() {
    let repo = LedgerRepo::new();
    // Two monthly exports of the same account classify to the same
    // canonical filename. Only one can take that name; the other must
    // neither be imported nor removed from the pending directory.
    let january = repo.add_pending("acme-january.csv", ACME_CSV);
    let february = repo.add_pending("acme-february.csv", ACME_CSV);
    repo.commit_all("Add pending statements");

    let workspaces = TempDir::new().unwrap();
    let ledger = FakeLedger::new(PRINT_OK, BALANCE_OK);
    let result = run_pipeline(&repo, &ledger, &workspaces, "bookkeeper", RunOptions::default());

    assert!(result.success, "pipeline failed: {:?}", result.error);

    let classify = result.steps.classify.as_ref().unwrap();
    let files = &classify.details.as_ref().unwrap().files;
    assert_eq!(files.len(), 2);
    assert_eq!(
        files.iter().filter(|f| f.renamed.is_some()).count(),
        1,
        "exactly one statement may take the canonical name"
    );
    assert!(files
        .iter()
        .any(|f| f.error.as_deref().is_some_and(|e| e.contains("already used"))));

    let import = result.steps.import.as_ref().unwrap();
    assert_eq!(import.details.as_ref().unwrap().files.len(), 1);

    // Exactly the imported export was removed; the colliding one stays
    // in the pending directory for a later run.
    let survivors = [&january, &february]
        .iter()
        .filter(|p| p.exists())
        .count();
    assert_eq!(survivors, 1, "the unimported export must remain pending");
}

#[test]
fn test_merge_requires_main_branch_checked_out() {
    let repo = LedgerRepo::new();
    let pending = repo.add_pending("acme-export.csv", ACME_CSV);
    repo.commit_all("Add pending statement");
    let status = std::process::Command::new("git")
        .current_dir(repo.path())
        .args(["checkout", "-b", "feature"])
        .status()
        .unwrap();
    assert!(status.success());

    let workspaces = TempDir::new().unwrap();
    let ledger = FakeLedger::new(PRINT_OK, BALANCE_OK);
    let result = run_pipeline(&repo, &ledger, &workspaces, "bookkeeper", RunOptions::default());

    assert!(!result.success);
    let error = result.error.as_ref().unwrap();
    assert!(error.contains("'feature'"), "error: {error}");
    assert!(error.contains("'main'"), "error: {error}");
    assert!(!result.steps.merge.as_ref().unwrap().success);

    // Nothing landed anywhere, the export is untouched and the workspace
    // survives for inspection.
    assert!(!repo.log_subjects().iter().any(|s| s.starts_with("Import:")));
    assert!(pending.exists());
    assert_eq!(leftover_workspaces(workspaces.path()).len(), 1);
}

#[test]
fn test_no_pending_statements_short_circuits() {
    let repo = LedgerRepo::new();

    let workspaces = TempDir::new().unwrap();
    let ledger = FakeLedger::new(PRINT_OK, BALANCE_OK);
    let result = run_pipeline(&repo, &ledger, &workspaces, "bookkeeper", RunOptions::default());

    assert!(result.success);
    assert_eq!(
        result.summary.as_deref(),
        Some("No transactions found; nothing to import")
    );
    assert!(result.steps.merge.as_ref().unwrap().message.contains("Skipped"));
    assert!(result.steps.import.as_ref().unwrap().message.contains("Skipped"));

    assert_eq!(repo.log_subjects(), vec!["Initial ledger".to_string()]);
    assert!(leftover_workspaces(workspaces.path()).is_empty());
    assert!(repo.import_branches().is_empty());
}

#[test]
fn test_balance_mismatch_fails_reconciliation() {
    let repo = LedgerRepo::new();
    let pending = repo.add_pending("acme-export.csv", ACME_CSV);
    repo.commit_all("Add pending statement");

    let workspaces = TempDir::new().unwrap();
    let ledger = FakeLedger::new(PRINT_OK, BALANCE_OFF);
    let options = RunOptions {
        statement_balance: Some("CHF 100.00".to_string()),
        ..RunOptions::default()
    };
    let result = run_pipeline(&repo, &ledger, &workspaces, "bookkeeper", options);

    assert!(!result.success);
    let error = result.error.as_ref().unwrap();
    assert!(error.contains("Reconciliation failed"), "error: {error}");
    assert!(error.contains("CHF +5.50"), "error: {error}");
    assert_eq!(
        result.hint.as_deref(),
        Some("check for missing transactions or rules")
    );
    let reconcile = result.steps.reconcile.as_ref().unwrap();
    assert!(!reconcile.success);

    // The failed run never touched main or the pending directory.
    assert!(result.steps.merge.is_none());
    assert!(!repo.log_subjects().iter().any(|s| s.starts_with("Import:")));
    assert!(pending.exists());
}

#[test]
fn test_unauthorized_caller_has_no_side_effects() {
    let repo = LedgerRepo::new();
    repo.add_pending("acme-export.csv", ACME_CSV);
    repo.commit_all("Add pending statement");

    let workspaces = TempDir::new().unwrap();
    let ledger = FakeLedger::new(PRINT_OK, BALANCE_OK);
    let result = run_pipeline(&repo, &ledger, &workspaces, "intruder", RunOptions::default());

    assert!(!result.success);
    assert!(result.error.as_ref().unwrap().contains("not authorized"));
    assert!(result.worktree_id.is_none());
    assert!(leftover_workspaces(workspaces.path()).is_empty());
    assert!(repo.import_branches().is_empty());
}

#[test]
fn test_provider_filter_skips_other_statements() {
    let repo = LedgerRepo::new();
    repo.add_pending("acme-export.csv", ACME_CSV);
    repo.commit_all("Add pending statement");

    let workspaces = TempDir::new().unwrap();
    let ledger = FakeLedger::new(PRINT_OK, BALANCE_OK);
    let options = RunOptions {
        provider: Some("globex".to_string()),
        ..RunOptions::default()
    };
    let result = run_pipeline(&repo, &ledger, &workspaces, "bookkeeper", options);

    // The classified statement belongs to another provider, so nothing
    // matches the filter and the run short-circuits.
    assert!(result.success);
    assert_eq!(
        result.summary.as_deref(),
        Some("No transactions found; nothing to import")
    );
    assert!(!repo.log_subjects().iter().any(|s| s.starts_with("Import:")));
}
