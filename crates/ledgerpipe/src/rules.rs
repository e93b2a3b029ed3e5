//! Rules index: maps source CSV paths to the rule files that consume them.
//!
//! Every `*.rules` file anchors itself to a CSV via a `source <path>`
//! directive; paths are resolved relative to the rule file's own directory.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum RulesError {
    #[error("Failed to read rules directory '{}': {source}", .path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to read rule file '{}': {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Mapping from resolved CSV path to the rule file declaring it.
pub type RulesMapping = HashMap<PathBuf, PathBuf>;

/// Scans `rules_dir` (non-recursive) for `*.rules` files and indexes their
/// `source` directives. A rule file without a directive contributes nothing.
pub fn build_mapping(rules_dir: &Path) -> Result<RulesMapping, RulesError> {
    let source_directive = Regex::new(r"^source\s+(.+)$").expect("static pattern");
    let mut mapping = RulesMapping::new();

    for entry in WalkDir::new(rules_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| RulesError::ReadDirectory {
            path: rules_dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("rules")
        {
            continue;
        }

        let content = std::fs::read_to_string(path).map_err(|e| RulesError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let Some(source) = content
            .lines()
            .find_map(|line| source_directive.captures(line))
            .map(|caps| caps[1].trim().to_string())
        else {
            continue;
        };

        let source_path = Path::new(&source);
        let resolved = if source_path.is_absolute() {
            source_path.to_path_buf()
        } else {
            // Relative to the rule file's own directory.
            path.parent().unwrap_or(rules_dir).join(source_path)
        };

        mapping.insert(normalize(&resolved), path.to_path_buf());
    }

    Ok(mapping)
}

/// Looks up the rule file for a CSV path: exact key match first, then a
/// component-normalized comparison tolerating `.`/`..` and separator noise.
pub fn lookup<'a>(csv_path: &Path, mapping: &'a RulesMapping) -> Option<&'a Path> {
    if let Some(rule) = mapping.get(csv_path) {
        return Some(rule.as_path());
    }

    let normalized = normalize(csv_path);
    mapping.get(&normalized).map(PathBuf::as_path)
}

/// Lexically normalizes a path: drops `.` components and folds `..` into the
/// preceding component where possible. No filesystem access.
fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}
