//! Ledger-command execution: a capability trait around the external ledger
//! binary plus scrapers for the `print` output the pipeline relies on.

use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::error::LedgerError;

/// Captured output of one ledger invocation.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Seam for invoking the ledger binary, substitutable in tests.
pub trait LedgerExecutor {
    fn execute(&self, workdir: &Path, args: &[&str]) -> Result<ExecOutput, LedgerError>;
}

/// Runs the configured ledger binary as a child process. There is no
/// timeout; a hanging binary hangs the calling step.
#[derive(Debug, Clone)]
pub struct SystemLedger {
    binary: String,
}

impl SystemLedger {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl LedgerExecutor for SystemLedger {
    fn execute(&self, workdir: &Path, args: &[&str]) -> Result<ExecOutput, LedgerError> {
        let output = Command::new(&self.binary)
            .current_dir(workdir)
            .args(args)
            .output()
            .map_err(|e| LedgerError::Spawn {
                binary: self.binary.clone(),
                source: e,
            })?;

        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

static DATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})[-/.](\d{2})[-/.](\d{2})\b").expect("static pattern"));

static TRANSACTION_OPENER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}[-/.]\d{2}[-/.]\d{2}\b").expect("static pattern"));

static UNKNOWN_POSTING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+(\S+:unknown)\b").expect("static pattern"));

fn parse_date(caps: &regex::Captures) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
}

/// Distinct years appearing in date tokens, in order of first appearance.
pub fn extract_years(stdout: &str) -> Vec<i32> {
    let mut years = Vec::new();
    for caps in DATE_TOKEN.captures_iter(stdout) {
        if let Some(date) = parse_date(&caps) {
            let year = date.year();
            if !years.contains(&year) {
                years.push(year);
            }
        }
    }
    years
}

/// Earliest and latest transaction dates found in printed entries.
pub fn extract_date_range(stdout: &str) -> Option<(NaiveDate, NaiveDate)> {
    let mut range: Option<(NaiveDate, NaiveDate)> = None;
    for caps in DATE_TOKEN.captures_iter(stdout) {
        if let Some(date) = parse_date(&caps) {
            range = Some(match range {
                None => (date, date),
                Some((from, until)) => (from.min(date), until.max(date)),
            });
        }
    }
    range
}

/// Counts transactions in `print` output: one per line opening with a date
/// token at column zero.
pub fn count_transactions(stdout: &str) -> usize {
    stdout
        .lines()
        .filter(|line| TRANSACTION_OPENER.is_match(line))
        .count()
}

/// Posting lines routed to an `unknown` account, meaning no rule assigned
/// them a real account.
pub fn unknown_accounts(stdout: &str) -> Vec<String> {
    let mut found = Vec::new();
    for line in stdout.lines() {
        if let Some(caps) = UNKNOWN_POSTING.captures(line) {
            let account = caps[1].to_string();
            if !found.contains(&account) {
                found.push(account);
            }
        }
    }
    found
}
