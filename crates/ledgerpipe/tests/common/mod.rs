//! Shared fixture: a throwaway git-backed ledger repository with config,
//! rules and journals committed, plus a scripted ledger executor.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use ledgerpipe::error::LedgerError;
use ledgerpipe::ledger::{ExecOutput, LedgerExecutor};

pub const CONFIG_YAML: &str = r#"
version: "1"
paths:
  import: import
  pending: pending
  rules: rules
ledger:
  binary: hledger
  journal: all.journal
import:
  allowed_caller: bookkeeper
  main_branch: main
providers:
  - name: acme
    currency_codes:
      CHF: chf
    rules:
      - filename_pattern: "^acme"
        header: "Date,Description,Amount,Currency"
        currency_field: Currency
        rename: "acme-{currency}.csv"
"#;

pub const ACME_RULES: &str = "source ../import/acme-chf.csv\n\
fields date, description, amount, currency\n\
account1 assets:bank:acme\n\
account2 expenses:unclassified\n\
\n\
if Coffee\n\
    account2 expenses:food\n";

pub const ACME_CSV: &str = "Date,Description,Amount,Currency\n\
2026-01-05,Coffee,-5.00,CHF\n\
2026-01-06,Salary,100.00,CHF\n";

pub struct LedgerRepo {
    dir: TempDir,
}

impl LedgerRepo {
    /// A fresh repository with config, one rules file and an empty main
    /// journal, all committed on `main`.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp repo");
        let root = dir.path();

        git(root, &["init", "-b", "main"]);
        git(root, &["config", "user.email", "test@test.com"]);
        git(root, &["config", "user.name", "Test"]);

        std::fs::write(root.join("import.yaml"), CONFIG_YAML).unwrap();
        std::fs::write(root.join("all.journal"), "").unwrap();
        for sub in ["import", "pending", "rules"] {
            std::fs::create_dir_all(root.join(sub)).unwrap();
        }
        std::fs::write(root.join("rules/acme-chf.rules"), ACME_RULES).unwrap();

        let repo = Self { dir };
        repo.commit_all("Initial ledger");
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn add_pending(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join("pending").join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn commit_all(&self, message: &str) {
        git(self.path(), &["add", "-A"]);
        git(self.path(), &["commit", "-m", message]);
    }

    /// Commit subjects on `main`, newest first.
    pub fn log_subjects(&self) -> Vec<String> {
        let output = Command::new("git")
            .current_dir(self.path())
            .args(["log", "--format=%s", "main"])
            .output()
            .expect("git log");
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn import_branches(&self) -> Vec<String> {
        let output = Command::new("git")
            .current_dir(self.path())
            .args(["branch", "--list", "import/*", "--format=%(refname:short)"])
            .output()
            .expect("git branch");
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .current_dir(dir)
        .args(args)
        .status()
        .expect("spawn git");
    assert!(status.success(), "git {args:?} failed in {}", dir.display());
}

/// Ledger executor scripted with canned output per subcommand.
pub struct FakeLedger {
    pub print_output: String,
    pub balance_output: String,
}

impl FakeLedger {
    pub fn new(print_output: &str, balance_output: &str) -> Self {
        Self {
            print_output: print_output.to_string(),
            balance_output: balance_output.to_string(),
        }
    }
}

impl LedgerExecutor for FakeLedger {
    fn execute(&self, _workdir: &Path, args: &[&str]) -> Result<ExecOutput, LedgerError> {
        let stdout = match args.first().copied() {
            Some("print") => self.print_output.clone(),
            Some("balance") => self.balance_output.clone(),
            _ => String::new(),
        };
        Ok(ExecOutput {
            exit_code: 0,
            stdout,
            stderr: String::new(),
        })
    }
}

/// Directories left behind under `base`, i.e. preserved workspaces.
pub fn leftover_workspaces(base: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(base)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect()
        })
        .unwrap_or_default()
}
