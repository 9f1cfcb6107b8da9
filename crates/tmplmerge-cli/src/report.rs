//! JSON run report written by `--report`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use merge_engine::{BatchReport, BatchSummary, ConflictRecord, Format, MergeResult, Outcome, SkipReason};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub dry_run: bool,
    pub cancelled: bool,
    pub summary: BatchSummary,
    pub pairs: Vec<PairReport>,
}

#[derive(Debug, Serialize)]
pub struct PairReport {
    pub source: PathBuf,
    pub target: PathBuf,
    pub format: Option<Format>,
    pub outcome: Outcome,
    pub skip_reason: Option<SkipReason>,
    pub error: Option<String>,
    pub conflicts: Vec<ConflictReport>,
}

#[derive(Debug, Serialize)]
pub struct ConflictReport {
    pub path: String,
    pub template: Value,
    pub existing: Value,
    pub resolution: Option<String>,
    pub value: Option<Value>,
}

impl RunReport {
    pub fn new(report: &BatchReport, dry_run: bool) -> Self {
        Self {
            generated_at: Utc::now(),
            dry_run,
            cancelled: report.cancelled,
            summary: report.summary(),
            pairs: report.results.iter().map(PairReport::from).collect(),
        }
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl From<&MergeResult> for PairReport {
    fn from(result: &MergeResult) -> Self {
        Self {
            source: result.source.clone(),
            target: result.target.clone(),
            format: result.format,
            outcome: result.outcome,
            skip_reason: result.skip_reason,
            error: result.error.as_ref().map(|e| e.to_string()),
            conflicts: result.conflicts.iter().map(ConflictReport::from).collect(),
        }
    }
}

impl From<&ConflictRecord> for ConflictReport {
    fn from(conflict: &ConflictRecord) -> Self {
        Self {
            path: conflict.path_display(),
            template: conflict.source.to_json_value(),
            existing: conflict.target.to_json_value(),
            resolution: conflict.resolution.as_ref().map(|r| r.to_string()),
            value: conflict.resolved_value().map(|v| v.to_json_value()),
        }
    }
}
