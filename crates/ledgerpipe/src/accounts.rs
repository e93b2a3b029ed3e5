//! Account declaration synthesis: every account a rule file can assign must
//! be declared in the year-scoped journal before a dry run, so new accounts
//! do not surface as spurious unknown-account failures.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum AccountsError {
    #[error("Failed to read rule file '{}': {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read journal '{}': {source}", .path.display())]
    ReadJournal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write journal '{}': {source}", .path.display())]
    WriteJournal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Accounts that had to be appended to the journal.
#[derive(Debug, Clone, Default)]
pub struct DeclarationOutcome {
    pub added: Vec<String>,
}

/// Extracts every account name assigned by the given rule files
/// (`account1 <name>`, `account2 <name>`, … including inside if-blocks).
pub fn collect_accounts(rule_files: &[PathBuf]) -> Result<BTreeSet<String>, AccountsError> {
    let assignment = Regex::new(r"(?m)^\s*account\d+\s+(\S.*?)\s*$").expect("static pattern");
    let mut accounts = BTreeSet::new();

    for path in rule_files {
        let content = std::fs::read_to_string(path).map_err(|e| AccountsError::ReadFile {
            path: path.clone(),
            source: e,
        })?;

        for caps in assignment.captures_iter(&content) {
            let name = strip_comment(&caps[1]);
            if !name.is_empty() {
                accounts.insert(name.to_string());
            }
        }
    }

    Ok(accounts)
}

/// Appends `account <name>` declarations for accounts missing from the year
/// journal. Existing declarations are left untouched; the journal is created
/// when absent.
pub fn ensure_declared(
    year_journal: &Path,
    accounts: &BTreeSet<String>,
) -> Result<DeclarationOutcome, AccountsError> {
    let existing = match std::fs::read_to_string(year_journal) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(AccountsError::ReadJournal {
                path: year_journal.to_path_buf(),
                source: e,
            })
        }
    };

    let declaration = Regex::new(r"(?m)^account\s+(\S.*?)\s*$").expect("static pattern");
    let declared: BTreeSet<&str> = declaration
        .captures_iter(&existing)
        .map(|caps| caps.get(1).expect("capture group").as_str())
        .collect();

    let missing: Vec<String> = accounts
        .iter()
        .filter(|account| !declared.contains(account.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() {
        return Ok(DeclarationOutcome::default());
    }

    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    for account in &missing {
        updated.push_str("account ");
        updated.push_str(account);
        updated.push('\n');
    }

    std::fs::write(year_journal, updated).map_err(|e| AccountsError::WriteJournal {
        path: year_journal.to_path_buf(),
        source: e,
    })?;

    debug!(
        journal = %year_journal.display(),
        added = missing.len(),
        "Declared missing accounts"
    );

    Ok(DeclarationOutcome { added: missing })
}

fn strip_comment(value: &str) -> &str {
    value.split(';').next().unwrap_or("").trim()
}
