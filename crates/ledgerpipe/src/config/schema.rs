use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    pub paths: PathsConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub currencies: BTreeMap<String, CurrencyConfig>,
}

fn default_version() -> String {
    "1".to_string()
}

/// Directory names, relative to the ledger repository root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Where classified statement CSVs live (referenced by rule `source` directives).
    pub import: String,
    /// Incoming statement exports waiting to be imported.
    pub pending: String,
    /// Directory holding `*.rules` files.
    pub rules: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_binary")]
    pub binary: String,
    #[serde(default = "default_journal")]
    pub journal: String,
    /// Filename template for the year-scoped journal; `{year}` is replaced.
    #[serde(default = "default_year_journal")]
    pub year_journal: String,
}

fn default_binary() -> String {
    "hledger".to_string()
}

fn default_journal() -> String {
    "all.journal".to_string()
}

fn default_year_journal() -> String {
    "{year}.journal".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            journal: default_journal(),
            year_journal: default_year_journal(),
        }
    }
}

impl LedgerConfig {
    /// Resolves the year-scoped journal path inside `root`.
    pub fn year_journal_path(&self, root: &Path, year: i32) -> PathBuf {
        root.join(self.year_journal.replace("{year}", &year.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_caller")]
    pub allowed_caller: String,
    #[serde(default = "default_branch")]
    pub main_branch: String,
}

fn default_caller() -> String {
    "bookkeeper".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            allowed_caller: default_caller(),
            main_branch: default_branch(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    /// Maps raw currency-field values to canonical currency codes.
    #[serde(default)]
    pub currency_codes: BTreeMap<String, String>,
    #[serde(default)]
    pub rules: Vec<DetectionRule>,
}

/// One declarative statement-detection rule. Rules are evaluated in
/// declaration order; the first fully matching rule wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRule {
    #[serde(default)]
    pub filename_pattern: Option<String>,
    /// Expected normalized header: trimmed fields joined by comma.
    pub header: String,
    /// Header field holding the statement currency in the first data row.
    pub currency_field: String,
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub metadata: Vec<MetadataSpec>,
    /// Canonical rename template with `{field}` placeholders.
    #[serde(default)]
    pub rename: Option<String>,
}

fn default_delimiter() -> char {
    ','
}

/// Reads one cell from the rows skipped ahead of the header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataSpec {
    pub name: String,
    pub row: usize,
    pub column: usize,
    /// Collapse internal whitespace runs to dashes.
    #[serde(default)]
    pub dashify: bool,
}

/// Pricing configuration for one tracked currency (see the price-history
/// collaborator interface). `source`, `pair` and `file` are required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    pub source: String,
    pub pair: String,
    pub file: String,
    #[serde(default)]
    pub fmt_base: Option<String>,
    #[serde(default)]
    pub backfill_date: Option<chrono::NaiveDate>,
}
