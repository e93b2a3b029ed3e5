//! Statement classification: decides which provider and currency a CSV
//! export belongs to by matching it against the configured detection rules.

use std::collections::HashMap;

use csv::{ReaderBuilder, StringRecord};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::config::schema::{DetectionRule, MetadataSpec, ProviderConfig};

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Failed to parse '{filename}' as delimited text: {message}")]
    Parse { filename: String, message: String },

    #[error("Metadata field '{field}' not found at row {row}, column {column} in '{filename}'")]
    MissingMetadata {
        filename: String,
        field: String,
        row: usize,
        column: usize,
    },
}

/// Outcome of a successful detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub provider: String,
    pub currency: String,
    pub metadata: HashMap<String, String>,
    /// Canonical filename produced by the rule's rename template, if any.
    pub renamed: Option<String>,
}

/// One file handed to [`Classifier::classify_all`].
#[derive(Debug, Clone)]
pub struct StatementFile {
    pub filename: String,
    pub content: String,
}

/// Per-file batch result; a failed file carries an error instead of
/// aborting the batch.
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub filename: String,
    pub detection: Option<Detection>,
    pub error: Option<String>,
}

pub struct Classifier {
    providers: Vec<ProviderConfig>,
    /// Pre-compiled filename patterns, indexed by pattern string.
    compiled_patterns: HashMap<String, Regex>,
}

impl Classifier {
    pub fn new(providers: &[ProviderConfig]) -> Self {
        let mut compiled_patterns = HashMap::new();
        for provider in providers {
            for rule in &provider.rules {
                if let Some(pattern) = &rule.filename_pattern {
                    if !compiled_patterns.contains_key(pattern) {
                        if let Ok(regex) = Regex::new(pattern) {
                            compiled_patterns.insert(pattern.clone(), regex);
                        }
                    }
                }
            }
        }

        Self {
            providers: providers.to_vec(),
            compiled_patterns,
        }
    }

    /// Finds the first fully matching rule, scanning providers then rules in
    /// declared order. Matching is binary; overlapping rules must be ordered
    /// from most to least specific by the config author.
    pub fn detect(&self, filename: &str, content: &str) -> Result<Option<Detection>, ClassifyError> {
        for provider in &self.providers {
            for rule in &provider.rules {
                if let Some(pattern) = &rule.filename_pattern {
                    let matched = self
                        .compiled_patterns
                        .get(pattern)
                        .map(|regex| regex.is_match(filename))
                        .unwrap_or(false);
                    if !matched {
                        continue;
                    }
                }

                let records = parse_records(filename, content, rule.delimiter)?;

                if !header_matches(&records, rule) {
                    continue;
                }

                let Some(raw_currency) = first_row_currency(&records, rule) else {
                    continue;
                };

                let currency = provider
                    .currency_codes
                    .get(&raw_currency)
                    .cloned()
                    .unwrap_or_else(|| raw_currency.to_lowercase());

                let metadata = extract_metadata(filename, &records, &rule.metadata)?;
                let renamed = rule
                    .rename
                    .as_ref()
                    .map(|template| substitute_rename(template, &provider.name, &currency, &metadata));

                debug!(
                    filename,
                    provider = %provider.name,
                    %currency,
                    "Statement matched detection rule"
                );

                return Ok(Some(Detection {
                    provider: provider.name.clone(),
                    currency,
                    metadata,
                    renamed,
                }));
            }
        }

        Ok(None)
    }

    /// Classifies a batch, preserving input order. A failure for one file
    /// degrades that file's entry to an error; the batch continues.
    pub fn classify_all(&self, files: &[StatementFile]) -> Vec<ClassificationResult> {
        files
            .iter()
            .map(|file| match self.detect(&file.filename, &file.content) {
                Ok(detection) => ClassificationResult {
                    filename: file.filename.clone(),
                    detection,
                    error: None,
                },
                Err(e) => ClassificationResult {
                    filename: file.filename.clone(),
                    detection: None,
                    error: Some(e.to_string()),
                },
            })
            .collect()
    }
}

fn parse_records(
    filename: &str,
    content: &str,
    delimiter: char,
) -> Result<Vec<StringRecord>, ClassifyError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ClassifyError::Parse {
            filename: filename.to_string(),
            message: e.to_string(),
        })
}

/// Normalized header (trimmed fields joined by comma) must equal the rule's
/// expected header exactly. No fuzzy matching.
fn header_matches(records: &[StringRecord], rule: &DetectionRule) -> bool {
    let Some(header) = records.get(rule.skip_rows) else {
        return false;
    };
    let normalized = header
        .iter()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(",");
    normalized == rule.header
}

fn first_row_currency(records: &[StringRecord], rule: &DetectionRule) -> Option<String> {
    let header = records.get(rule.skip_rows)?;
    let index = header
        .iter()
        .position(|field| field.trim() == rule.currency_field)?;

    let first_row = records.get(rule.skip_rows + 1)?;
    let value = first_row.get(index)?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}

fn extract_metadata(
    filename: &str,
    records: &[StringRecord],
    specs: &[MetadataSpec],
) -> Result<HashMap<String, String>, ClassifyError> {
    let mut metadata = HashMap::new();
    for spec in specs {
        let value = records
            .get(spec.row)
            .and_then(|row| row.get(spec.column))
            .ok_or_else(|| ClassifyError::MissingMetadata {
                filename: filename.to_string(),
                field: spec.name.clone(),
                row: spec.row,
                column: spec.column,
            })?;

        let value = if spec.dashify {
            value.trim().split_whitespace().collect::<Vec<_>>().join("-")
        } else {
            value.trim().to_string()
        };

        metadata.insert(spec.name.clone(), value);
    }
    Ok(metadata)
}

/// Single-pass `{field}` substitution; substituted values are never
/// re-expanded. Unknown fields are left verbatim.
fn substitute_rename(
    template: &str,
    provider: &str,
    currency: &str,
    metadata: &HashMap<String, String>,
) -> String {
    let placeholder = Regex::new(r"\{([^{}]+)\}").expect("static pattern");
    placeholder
        .replace_all(template, |caps: &regex::Captures| {
            let field = &caps[1];
            match field {
                "provider" => provider.to_string(),
                "currency" => currency.to_string(),
                _ => metadata
                    .get(field)
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string()),
            }
        })
        .into_owned()
}
