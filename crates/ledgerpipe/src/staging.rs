//! File staging: best-effort copy/delete helpers that collect per-file
//! outcomes instead of failing the whole batch.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;
use walkdir::WalkDir;

/// One failed file operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOpFailure {
    pub path: String,
    pub message: String,
}

/// Partial-failure outcome of a batch file operation.
#[derive(Debug, Clone, Default)]
pub struct FileOpOutcome {
    pub succeeded: Vec<PathBuf>,
    pub errors: Vec<FileOpFailure>,
}

impl FileOpOutcome {
    fn record_error(&mut self, path: &Path, message: impl ToString) {
        warn!(path = %path.display(), error = %message.to_string(), "File operation failed");
        self.errors.push(FileOpFailure {
            path: path.display().to_string(),
            message: message.to_string(),
        });
    }
}

/// Copies every `*.csv` from `source` into `dest` (created on demand).
pub fn sync_csv_files(source: &Path, dest: &Path) -> FileOpOutcome {
    let mut outcome = FileOpOutcome::default();

    if let Err(e) = std::fs::create_dir_all(dest) {
        outcome.record_error(dest, e);
        return outcome;
    }

    for csv in list_csv_files(source) {
        let Some(name) = csv.file_name() else {
            continue;
        };
        let target = dest.join(name);
        match std::fs::copy(&csv, &target) {
            Ok(_) => outcome.succeeded.push(csv),
            Err(e) => outcome.record_error(&csv, e),
        }
    }

    outcome
}

/// Deletes the given files, collecting per-file failures.
pub fn delete_files(paths: &[PathBuf]) -> FileOpOutcome {
    let mut outcome = FileOpOutcome::default();
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => outcome.succeeded.push(path.clone()),
            Err(e) => outcome.record_error(path, e),
        }
    }
    outcome
}

/// Lists `*.csv` files directly inside `dir`, sorted by file name.
pub fn list_csv_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

/// Pending CSVs whose file names carry the optional provider/currency
/// tokens. Token comparison is case-insensitive over `-`/`_`/`.` segments.
pub fn list_pending_csvs(
    dir: &Path,
    provider: Option<&str>,
    currency: Option<&str>,
) -> Vec<PathBuf> {
    list_csv_files(dir)
        .into_iter()
        .filter(|path| {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_lowercase();
            let tokens: Vec<&str> = name.split(['-', '_', '.']).collect();
            let has = |filter: Option<&str>| {
                filter
                    .map(|f| tokens.contains(&f.to_lowercase().as_str()))
                    .unwrap_or(true)
            };
            has(provider) && has(currency)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "data").unwrap();
        path
    }

    #[test]
    fn test_sync_copies_only_csvs() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        std::fs::create_dir_all(&src).unwrap();
        touch(&src, "a.csv");
        touch(&src, "notes.txt");

        let outcome = sync_csv_files(&src, &dst);
        assert_eq!(outcome.succeeded.len(), 1);
        assert!(outcome.errors.is_empty());
        assert!(dst.join("a.csv").exists());
        assert!(!dst.join("notes.txt").exists());
    }

    #[test]
    fn test_delete_collects_partial_failures() {
        let tmp = TempDir::new().unwrap();
        let existing = touch(tmp.path(), "a.csv");
        let missing = tmp.path().join("gone.csv");

        let outcome = delete_files(&[existing.clone(), missing]);
        assert_eq!(outcome.succeeded, vec![existing]);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].path.ends_with("gone.csv"));
    }

    #[test]
    fn test_pending_filters_by_provider_and_currency_tokens() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "ubs-chf-2026.csv");
        touch(tmp.path(), "ubs-eur-2026.csv");
        touch(tmp.path(), "revolut_chf.csv");

        let all = list_pending_csvs(tmp.path(), None, None);
        assert_eq!(all.len(), 3);

        let ubs = list_pending_csvs(tmp.path(), Some("ubs"), None);
        assert_eq!(ubs.len(), 2);

        let ubs_chf = list_pending_csvs(tmp.path(), Some("UBS"), Some("chf"));
        assert_eq!(ubs_chf.len(), 1);
        assert!(ubs_chf[0].ends_with("ubs-chf-2026.csv"));
    }

    #[test]
    fn test_list_csvs_sorted_and_nonrecursive() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "b.csv");
        touch(tmp.path(), "a.csv");
        let sub = tmp.path().join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        touch(&sub, "nested.csv");

        let files = list_csv_files(tmp.path());
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.csv"));
    }
}
