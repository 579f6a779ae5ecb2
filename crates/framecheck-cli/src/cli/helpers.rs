use super::CliError;
use super::commands::{PolicyFlags, ThresholdFlags};
use anyhow::Context;
use framecheck_core::domain::{CheckError, FrameNumber, ReportingMode};
use framecheck_core::imaging::PanelFileSink;
use framecheck_core::policy::ComparePolicy;
use framecheck_core::report::write_report_file;
use framecheck_core::table::{AcknowledgeHook, ColumnCheck, ColumnType, TablePair};
use serde::Serialize;
use std::io::{BufRead, IsTerminal, Write};
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt};

pub(super) fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(false)
        .without_time()
        .with_ansi(std::io::stdout().is_terminal())
        .with_writer(std::io::stdout)
        .try_init();
}

/// Reads the policy file when given, then applies command-line overrides.
pub(super) fn load_policy(
    flags: &PolicyFlags,
    thresholds: &ThresholdFlags,
) -> Result<ComparePolicy, CliError> {
    let mut policy = match &flags.policy {
        Some(path) => ComparePolicy::from_policy_path(path).map_err(CheckError::from)?,
        None => ComparePolicy::default(),
    };

    if let Some(mode) = flags.mode {
        policy.mode = mode.into();
    }
    if let Some(duplicates) = flags.duplicates {
        policy.duplicate_policy = duplicates.into();
    }

    let image = &mut policy.image;
    image.thr_min = thresholds.thr_min.unwrap_or(image.thr_min);
    image.thr_max = thresholds.thr_max.unwrap_or(image.thr_max);
    image.thr_mean = thresholds.thr_mean.unwrap_or(image.thr_mean);
    image.thr_median = thresholds.thr_median.unwrap_or(image.thr_median);
    image.min_bad_pixels = thresholds.min_bad_pixels.unwrap_or(image.min_bad_pixels);
    image.max_abs_diff = thresholds.max_abs_diff.unwrap_or(image.max_abs_diff);
    image.convert_to_gray |= thresholds.gray;

    policy.validate().map_err(CheckError::from)?;
    Ok(policy)
}

pub(super) fn panel_file_sink(dir: &Path) -> Result<PanelFileSink, CliError> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create debug directory '{}'", dir.display()))?;
    Ok(PanelFileSink::new(dir))
}

pub(super) fn write_command_report(path: &Path, report: &impl Serialize) -> Result<(), CliError> {
    write_report_file(path, report).map_err(CheckError::from)?;
    println!("JSON report: {}", path.display());
    Ok(())
}

pub(super) fn warn_dropped_rows(mode: ReportingMode, tables: &TablePair) {
    if mode.is_silent() {
        return;
    }
    for dataset in [&tables.ground_truth, &tables.result] {
        if !dataset.dropped_lines().is_empty() {
            tracing::warn!(
                "Skipped {} malformed row(s) in '{}' (lines {:?})",
                dataset.dropped_lines().len(),
                dataset.source().display(),
                dataset.dropped_lines()
            );
        }
    }
}

/// Parses `GT_COLUMN:RESULT_COLUMN[:THRESHOLD[:TYPE]]`.
pub(super) fn parse_column_check(value: &str) -> Result<ColumnCheck, String> {
    let parts = value.split(':').collect::<Vec<_>>();
    if !(2..=4).contains(&parts.len()) {
        return Err(format!(
            "expected GT_COLUMN:RESULT_COLUMN[:THRESHOLD[:TYPE]], got '{}'",
            value
        ));
    }
    if parts[0].is_empty() || parts[1].is_empty() {
        return Err("column names must not be empty".to_string());
    }

    let threshold = match parts.get(2) {
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|_| format!("invalid threshold '{}'", raw))?,
        None => 0.0,
    };
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(format!("threshold must be finite and non-negative, got {}", threshold));
    }
    let column_type = parts
        .get(3)
        .map(|tag| ColumnType::from_tag(tag))
        .unwrap_or_default();

    Ok(ColumnCheck::new(parts[0], parts[1], threshold, column_type))
}

/// Blocks on stdin after each failing row; end of input continues at once.
pub(super) struct PromptAcknowledge;

impl AcknowledgeHook for PromptAcknowledge {
    fn acknowledge(&mut self, frame: FrameNumber, _message: &str) {
        print!("Frame {} failed. Press Enter to continue...", frame);
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
    }
}
