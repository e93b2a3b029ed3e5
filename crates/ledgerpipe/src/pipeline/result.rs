//! The pipeline's sole externally observable output: a structured,
//! append-only record with one result per named step, serialized verbatim
//! as JSON for the caller and any retry logic.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::staging::FileOpFailure;

/// Shared `{success, message}` shape with a per-step typed payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult<D> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<D>,
}

impl<D> StepResult<D> {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: None,
        }
    }

    pub fn ok_with(message: impl Into<String>, details: D) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeDetails {
    pub id: String,
    pub branch: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDetails {
    pub copied: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FileOpFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedFile {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renamed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyDetails {
    pub files: Vec<ClassifiedFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsDetails {
    pub year: i32,
    pub added: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunDetails {
    pub transactions: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_accounts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDetails {
    pub transactions: usize,
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeDetails {
    pub commit_message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupDetails {
    pub removed: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FileOpFailure>,
}

/// One optional result slot per named step. Once recorded, a slot is never
/// overwritten except for the designated cleanup amendment after merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worktree: Option<StepResult<WorktreeDetails>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<StepResult<SyncDetails>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classify: Option<StepResult<ClassifyDetails>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_declarations: Option<StepResult<AccountsDetails>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<StepResult<DryRunDetails>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import: Option<StepResult<ImportDetails>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconcile: Option<StepResult<ReconcileDetails>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<StepResult<MergeDetails>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<StepResult<CleanupDetails>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worktree_id: Option<String>,
    pub steps: StepResults,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case_step_names() {
        let mut result = PipelineResult::default();
        result.steps.account_declarations =
            Some(StepResult::ok_with("declared", AccountsDetails {
                year: 2026,
                added: vec!["assets:cash".to_string()],
            }));
        result.steps.dry_run = Some(StepResult::ok("0 transactions"));

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"accountDeclarations\""));
        assert!(json.contains("\"dryRun\""));
        assert!(json.contains("\"success\":false"));
    }

    #[test]
    fn test_absent_steps_and_fields_omitted() {
        let result = PipelineResult::default();
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, "{\"success\":false,\"steps\":{}}");
    }
}
