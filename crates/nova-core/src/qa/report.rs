use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::error::Result;

use super::classify::Severity;

/// Immutable record of one monitoring stage's outcome: who ran, with what
/// parameters, the resulting status, and every computed metric
/// (stringified, so the record stays serialization-agnostic).
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub program: String,
    pub stage: String,
    pub params: BTreeMap<String, String>,
    pub status: Severity,
    pub metrics: BTreeMap<String, String>,
}

/// Persists monitoring reports in a stage-addressable location.
pub trait ReportSink: Send + Sync {
    fn persist(&self, report: &Report) -> Result<()>;
}

/// Writes each report as pretty-printed JSON to `<dir>/<stage>.json`.
pub struct JsonReportSink {
    dir: PathBuf,
}

impl JsonReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn report_path(&self, stage: &str) -> PathBuf {
        self.dir.join(format!("{stage}.json"))
    }
}

impl ReportSink for JsonReportSink {
    fn persist(&self, report: &Report) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.report_path(&report.stage);
        fs::write(&path, serde_json::to_string_pretty(report)?)?;
        info!(
            stage = %report.stage,
            status = %report.status,
            path = %path.display(),
            "wrote QA report"
        );
        Ok(())
    }
}
