//! Price journal persistence: date-keyed merge of market-price lines into a
//! per-currency journal file. Merging is idempotent; the later-supplied line
//! wins for a date and output stays sorted ascending with one trailing
//! newline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Failed to read journal '{}': {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write journal '{}': {source}", .path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Line carries no date: '{0}'")]
    UndatedLine(String),
}

/// Merges `new_lines` into `existing` journal text. Undated lines already in
/// the journal (comments, headers) are preserved ahead of the dated block;
/// new lines must each carry a `YYYY-MM-DD` date.
pub fn merge_price_lines(existing: &str, new_lines: &[String]) -> Result<String, JournalError> {
    let mut preamble: Vec<&str> = Vec::new();
    let mut dated: BTreeMap<NaiveDate, String> = BTreeMap::new();

    for line in existing.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match extract_date(line) {
            Some(date) => {
                dated.insert(date, line.to_string());
            }
            None => preamble.push(line),
        }
    }

    for line in new_lines {
        let date = extract_date(line).ok_or_else(|| JournalError::UndatedLine(line.clone()))?;
        dated.insert(date, line.trim_end().to_string());
    }

    let mut output = String::new();
    for line in preamble {
        output.push_str(line);
        output.push('\n');
    }
    for line in dated.values() {
        output.push_str(line);
        output.push('\n');
    }
    Ok(output)
}

/// Applies [`merge_price_lines`] against the file at `path`, creating it
/// when absent.
pub fn append_prices(path: &Path, new_lines: &[String]) -> Result<(), JournalError> {
    let existing = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(JournalError::ReadFile {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let merged = merge_price_lines(&existing, new_lines)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| JournalError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, merged).map_err(|e| JournalError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

static DATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("static pattern"));

fn extract_date(line: &str) -> Option<NaiveDate> {
    let caps = DATE_TOKEN.captures(line)?;
    NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)
}
