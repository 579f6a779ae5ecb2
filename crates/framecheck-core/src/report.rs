use crate::batch::BatchReport;
use crate::domain::CheckError;
use crate::table::TableRunReport;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

pub fn render_human_summary(title: &str, report: &BatchReport) -> String {
    let mut lines = Vec::new();
    let status = if report.passed { "PASS" } else { "FAIL" };
    lines.push(format!("{} status: {}", title, status));
    lines.push(format!(
        "Frames: failed {} out of {} ({} passed)",
        report.failed,
        report.total,
        report.passed_count()
    ));
    if !report.unmatched_ground_truth.is_empty() {
        lines.push(format!(
            "Ground-truth frames without result: {}",
            report.unmatched_ground_truth.len()
        ));
    }

    if let Some(first_failure) = report.first_failure() {
        let reason = first_failure
            .reason
            .as_deref()
            .unwrap_or("frame comparison failed without a reason");
        lines.push(format!(
            "  first failure: frame {} ({})",
            first_failure.frame, reason
        ));
    }

    lines.join("\n")
}

pub fn render_table_summary(report: &TableRunReport) -> String {
    let mut lines = Vec::new();
    let status = if report.passed { "PASS" } else { "FAIL" };
    lines.push(format!("Table status: {}", status));
    for check in &report.checks {
        lines.push(format!("Columns {}:", check.check.label()));
        for line in render_human_summary("Check", &check.report).lines() {
            lines.push(format!("  {}", line.trim_start()));
        }
    }
    lines.join("\n")
}

pub fn write_report_file(report_path: &Path, report: &impl Serialize) -> Result<(), ReportError> {
    if let Some(parent_dir) = report_path.parent() {
        if !parent_dir.as_os_str().is_empty() {
            fs::create_dir_all(parent_dir).map_err(|source| ReportError::ReportDirectory {
                path: parent_dir.to_path_buf(),
                source,
            })?;
        }
    }

    let report_json =
        serde_json::to_string_pretty(report).map_err(|source| ReportError::SerializeReport {
            path: report_path.to_path_buf(),
            source,
        })?;
    fs::write(report_path, report_json).map_err(|source| ReportError::WriteReport {
        path: report_path.to_path_buf(),
        source,
    })
}

#[derive(Debug)]
pub enum ReportError {
    ReportDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    SerializeReport {
        path: PathBuf,
        source: serde_json::Error,
    },
    WriteReport {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for ReportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReportDirectory { path, source } => write!(
                f,
                "failed to create report directory '{}': {}",
                path.display(),
                source
            ),
            Self::SerializeReport { path, source } => write!(
                f,
                "failed to serialize report '{}': {}",
                path.display(),
                source
            ),
            Self::WriteReport { path, source } => {
                write!(f, "failed to write report '{}': {}", path.display(), source)
            }
        }
    }
}

impl Error for ReportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ReportDirectory { source, .. } => Some(source),
            Self::SerializeReport { source, .. } => Some(source),
            Self::WriteReport { source, .. } => Some(source),
        }
    }
}

impl From<ReportError> for CheckError {
    fn from(error: ReportError) -> Self {
        let message = error.to_string();
        match error {
            ReportError::ReportDirectory { .. } | ReportError::WriteReport { .. } => {
                CheckError::io("IO.REPORT_WRITE", message)
            }
            ReportError::SerializeReport { .. } => {
                CheckError::internal("SYS.REPORT_SERIALIZE", message)
            }
        }
    }
}
