//! Ingestion results and per-file issues

use chrono::{DateTime, Utc};
use etdrs_common::IdAudit;
use serde::{Deserialize, Serialize};

/// Issue severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueSeverity {
    /// Skip: file read, but its identifier was rejected
    Skip,
    /// Failed: file could not be read; run continues
    Failed,
}

/// Issue details for one report file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestIssue {
    /// File that caused the issue
    pub file_path: String,

    /// Issue code (e.g., "REJECTED_ID", "READ_ERROR")
    pub code: String,

    /// Human-readable message
    pub message: String,

    pub severity: IssueSeverity,

    /// When the issue occurred
    pub occurred_at: DateTime<Utc>,
}

impl IngestIssue {
    pub fn skip(file_path: String, code: &str, message: String) -> Self {
        Self {
            file_path,
            code: code.to_string(),
            message,
            severity: IssueSeverity::Skip,
            occurred_at: Utc::now(),
        }
    }

    pub fn failed(file_path: String, code: &str, message: String) -> Self {
        Self {
            file_path,
            code: code.to_string(),
            message,
            severity: IssueSeverity::Failed,
            occurred_at: Utc::now(),
        }
    }
}

/// Run summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Total files discovered
    pub total_files: usize,

    /// Files whose row reached the aggregate
    pub files_processed: usize,

    /// Files that were skipped or failed
    pub files_skipped: usize,

    /// Distinct subjects in the aggregate
    pub subjects: usize,

    /// Files that named the same subject as an earlier file
    pub repeated_subjects: usize,

    pub issues: Vec<IngestIssue>,

    pub duration_ms: u64,
}

impl IngestSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_by_severity(&self, severity: IssueSeverity) -> usize {
        self.issues.iter().filter(|e| e.severity == severity).count()
    }

    /// Record an issue and count the file as skipped
    pub fn push_issue(&mut self, issue: IngestIssue) {
        self.files_skipped += 1;
        self.issues.push(issue);
    }
}

/// Machine-readable run report: summary plus identifier audit
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport<'a> {
    pub summary: &'a IngestSummary,
    pub audit: &'a IdAudit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_counting() {
        let mut summary = IngestSummary::new();
        summary.push_issue(IngestIssue::skip(
            "a.csv".to_string(),
            "REJECTED_ID",
            "9999".to_string(),
        ));
        summary.push_issue(IngestIssue::failed(
            "b.csv".to_string(),
            "READ_ERROR",
            "denied".to_string(),
        ));

        assert_eq!(summary.files_skipped, 2);
        assert_eq!(summary.count_by_severity(IssueSeverity::Skip), 1);
        assert_eq!(summary.count_by_severity(IssueSeverity::Failed), 1);
    }

    #[test]
    fn test_severity_serializes_uppercase() {
        let json = serde_json::to_string(&IssueSeverity::Failed).unwrap();
        assert_eq!(json, "\"FAILED\"");
    }
}
