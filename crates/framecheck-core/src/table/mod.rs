//! Frame-aligned comparison of two CSV tables.

pub mod column;
pub mod dataset;

pub use column::{Cell, CellParseError, ColumnType, values_match};
pub use dataset::{Dataset, Row, RowLocator, RowRef, TableError};

use crate::batch::{BatchReport, run_batch};
use crate::domain::{ComparisonOutcome, FailureKind, FrameNumber, ReportingMode, Reporter};
use crate::indexer::DuplicatePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ground-truth and result datasets parsed together for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePair {
    pub ground_truth: Dataset,
    pub result: Dataset,
}

impl TablePair {
    pub fn read_csv_data(
        ground_truth_path: &Path,
        result_path: &Path,
        frame_column_ground_truth: &str,
        frame_column_result: &str,
        policy: DuplicatePolicy,
    ) -> Result<Self, TableError> {
        Ok(Self {
            ground_truth: Dataset::from_path(ground_truth_path, frame_column_ground_truth, policy)?,
            result: Dataset::from_path(result_path, frame_column_result, policy)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnCheck {
    pub ground_truth_column: String,
    pub result_column: String,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub column_type: ColumnType,
}

impl ColumnCheck {
    pub fn new(
        ground_truth_column: impl Into<String>,
        result_column: impl Into<String>,
        threshold: f64,
        column_type: ColumnType,
    ) -> Self {
        Self {
            ground_truth_column: ground_truth_column.into(),
            result_column: result_column.into(),
            threshold,
            column_type,
        }
    }

    pub fn label(&self) -> String {
        format!(
            "{} vs {} ({}, threshold={})",
            self.ground_truth_column, self.result_column, self.column_type, self.threshold
        )
    }
}

/// Called after each failing row in debug mode, before the run continues.
pub trait AcknowledgeHook {
    fn acknowledge(&mut self, frame: FrameNumber, message: &str);
}

impl<F> AcknowledgeHook for F
where
    F: FnMut(FrameNumber, &str),
{
    fn acknowledge(&mut self, frame: FrameNumber, message: &str) {
        self(frame, message)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoAcknowledge;

impl AcknowledgeHook for NoAcknowledge {
    fn acknowledge(&mut self, _frame: FrameNumber, _message: &str) {}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnCheckReport {
    pub check: ColumnCheck,
    pub report: BatchReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRunReport {
    pub passed: bool,
    pub checks: Vec<ColumnCheckReport>,
}

pub struct TableComparator {
    mode: ReportingMode,
    hook: Box<dyn AcknowledgeHook>,
}

impl TableComparator {
    pub fn new(mode: ReportingMode) -> Self {
        Self {
            mode,
            hook: Box::new(NoAcknowledge),
        }
    }

    #[must_use]
    pub fn with_acknowledge_hook(mut self, hook: impl AcknowledgeHook + 'static) -> Self {
        self.hook = Box::new(hook);
        self
    }

    pub fn mode(&self) -> ReportingMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ReportingMode) {
        self.mode = mode;
    }

    /// Lookup misses are failed outcomes; only malformed numeric cells are
    /// errors.
    pub fn compare_rows(
        &mut self,
        tables: &TablePair,
        frame: FrameNumber,
        check: &ColumnCheck,
    ) -> Result<ComparisonOutcome, CellParseError> {
        let reporter = Reporter::new(self.mode);
        let (Some(truth_row), Some(result_row)) =
            (tables.ground_truth.row(frame), tables.result.row(frame))
        else {
            return Ok(ComparisonOutcome::fail(
                FailureKind::LookupMiss,
                format!("Frame {} not found in one of the tables", frame),
            ));
        };

        let (Some(truth_cell), Some(result_cell)) = (
            truth_row.cell(&check.ground_truth_column),
            result_row.cell(&check.result_column),
        ) else {
            let reason = format!("Column not found in one of the tables for frame {}", frame);
            reporter.fail(&reason);
            return Ok(ComparisonOutcome::fail(FailureKind::LookupMiss, reason));
        };

        if values_match(check.column_type, truth_cell, result_cell, check.threshold)? {
            return Ok(ComparisonOutcome::pass());
        }

        let reason = format!(
            "Frame {} | {}: {} vs {}: {}",
            frame,
            check.ground_truth_column,
            truth_cell.as_str(),
            check.result_column,
            result_cell.as_str()
        );
        reporter.fail(&reason);
        if self.mode.is_debug() {
            self.hook.acknowledge(frame, &reason);
        }
        Ok(ComparisonOutcome::fail(FailureKind::ThresholdViolation, reason))
    }

    /// Checks every frame of the result table. Frames only present in the
    /// ground truth are listed in the report but never checked.
    pub fn compare_all_rows(&mut self, tables: &TablePair, check: &ColumnCheck) -> BatchReport {
        let reporter = Reporter::new(self.mode);
        run_batch(
            tables.ground_truth.index(),
            tables.result.index(),
            reporter,
            |frame, _, _| match self.compare_rows(tables, frame, check) {
                Ok(outcome) => outcome,
                Err(error) => {
                    let reason = format!("Parse error: {}", error);
                    reporter.fail(&reason);
                    ComparisonOutcome::fail(FailureKind::ParseError, reason)
                }
            },
        )
    }

    pub fn compare_columns(&mut self, tables: &TablePair, checks: &[ColumnCheck]) -> TableRunReport {
        let reporter = Reporter::new(self.mode);
        let mut reports = Vec::with_capacity(checks.len());
        for check in checks {
            reporter.info(format!("Checking columns {}", check.label()));
            let report = self.compare_all_rows(tables, check);
            reporter.info(if report.passed {
                "All rows match."
            } else {
                "Discrepancies found."
            });
            reports.push(ColumnCheckReport {
                check: check.clone(),
                report,
            });
        }

        TableRunReport {
            passed: reports.iter().all(|check| check.report.passed),
            checks: reports,
        }
    }
}
