use super::CliError;
use super::helpers::*;
use framecheck_core::domain::{
    CheckError, ComparisonOutcome, FAILED_VERDICT_EXIT_CODE, ReportingMode,
};
use framecheck_core::imaging::PanelFileSink;
use framecheck_core::indexer::{DuplicatePolicy, FramePattern};
use framecheck_core::report::{render_human_summary, render_table_summary};
use framecheck_core::table::{ColumnCheck, TablePair};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, clap::ValueEnum)]
pub(super) enum ModeArg {
    Silent,
    Informative,
    Debug,
}

impl From<ModeArg> for ReportingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Silent => Self::Silent,
            ModeArg::Informative => Self::Informative,
            ModeArg::Debug => Self::Debug,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub(super) enum DuplicateArg {
    FirstWins,
    LastWins,
    Reject,
}

impl From<DuplicateArg> for DuplicatePolicy {
    fn from(policy: DuplicateArg) -> Self {
        match policy {
            DuplicateArg::FirstWins => Self::FirstWins,
            DuplicateArg::LastWins => Self::LastWins,
            DuplicateArg::Reject => Self::Reject,
        }
    }
}

#[derive(clap::Args)]
pub(super) struct PolicyFlags {
    /// JSON comparison policy path
    #[arg(long)]
    pub(super) policy: Option<PathBuf>,

    /// Reporting mode (overrides the policy)
    #[arg(long, value_enum)]
    pub(super) mode: Option<ModeArg>,

    /// Duplicate frame handling (overrides the policy)
    #[arg(long, value_enum)]
    pub(super) duplicates: Option<DuplicateArg>,

    /// JSON report output path
    #[arg(long)]
    pub(super) report: Option<PathBuf>,
}

#[derive(clap::Args, Default)]
pub(super) struct ThresholdFlags {
    /// Allowed difference of the minimum intensity
    #[arg(long)]
    pub(super) thr_min: Option<f64>,

    /// Allowed difference of the maximum intensity
    #[arg(long)]
    pub(super) thr_max: Option<f64>,

    /// Allowed difference of the mean intensity
    #[arg(long)]
    pub(super) thr_mean: Option<f64>,

    /// Allowed difference of the median intensity
    #[arg(long)]
    pub(super) thr_median: Option<f64>,

    /// Fail once this many pixels differ
    #[arg(long)]
    pub(super) min_bad_pixels: Option<u64>,

    /// Per-pixel difference tolerated before a pixel counts as bad
    #[arg(long)]
    pub(super) max_abs_diff: Option<u32>,

    /// Convert color inputs to luminance before comparing
    #[arg(long)]
    pub(super) gray: bool,

    /// Directory for debug panel images (debug mode only)
    #[arg(long)]
    pub(super) debug_dir: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct ImageArgs {
    /// Ground-truth image
    ground_truth: PathBuf,

    /// Result image
    result: PathBuf,

    #[command(flatten)]
    thresholds: ThresholdFlags,

    #[command(flatten)]
    policy: PolicyFlags,
}

#[derive(clap::Args)]
pub(super) struct FoldersArgs {
    /// Ground-truth image directory
    #[arg(long)]
    ground_truth_dir: PathBuf,

    /// Result image directory
    #[arg(long)]
    results_dir: PathBuf,

    /// File-name prefix before the frame number in ground-truth files
    #[arg(long, default_value = "frame_")]
    gt_token: String,

    /// Ground-truth file extension
    #[arg(long, default_value = "png")]
    gt_ext: String,

    /// File-name prefix before the frame number in result files
    #[arg(long, default_value = "frame_")]
    res_token: String,

    /// Result file extension
    #[arg(long, default_value = "png")]
    res_ext: String,

    #[command(flatten)]
    thresholds: ThresholdFlags,

    #[command(flatten)]
    policy: PolicyFlags,
}

#[derive(clap::Args)]
pub(super) struct TableArgs {
    /// Ground-truth CSV file
    #[arg(long)]
    ground_truth: PathBuf,

    /// Result CSV file
    #[arg(long)]
    result: PathBuf,

    /// Frame column of the ground-truth table
    #[arg(long)]
    gt_frame_column: String,

    /// Frame column of the result table
    #[arg(long)]
    res_frame_column: String,

    /// Column check as GT_COLUMN:RESULT_COLUMN[:THRESHOLD[:TYPE]]; replaces policy columns
    #[arg(long = "column", value_name = "CHECK", value_parser = parse_column_check)]
    columns: Vec<ColumnCheck>,

    #[command(flatten)]
    policy: PolicyFlags,
}

#[derive(Serialize)]
struct ImageCommandReport<'a> {
    ground_truth: String,
    result: String,
    #[serde(flatten)]
    outcome: &'a ComparisonOutcome,
}

pub(super) fn run_image_command(args: ImageArgs) -> Result<i32, CliError> {
    let policy = load_policy(&args.policy, &args.thresholds)?;
    let mut comparator = policy.image_comparator();
    if let Some(sink) = debug_sink(policy.mode, &args.thresholds)? {
        comparator = comparator.with_debug_sink(sink);
    }

    let outcome = comparator.compare(&args.ground_truth, &args.result);
    if outcome.passed {
        println!("Image status: PASS");
    } else {
        println!("Image status: FAIL");
        println!("  reason: {}", outcome.reason_or_default());
    }

    if let Some(report_path) = &args.policy.report {
        let report = ImageCommandReport {
            ground_truth: display_path(&args.ground_truth),
            result: display_path(&args.result),
            outcome: &outcome,
        };
        write_command_report(report_path, &report)?;
    }

    if outcome.passed { Ok(0) } else { Ok(FAILED_VERDICT_EXIT_CODE) }
}

pub(super) fn run_folders_command(args: FoldersArgs) -> Result<i32, CliError> {
    let policy = load_policy(&args.policy, &args.thresholds)?;
    let mut comparator = policy.image_comparator();
    if let Some(sink) = debug_sink(policy.mode, &args.thresholds)? {
        comparator = comparator.with_debug_sink(sink);
    }

    let report = comparator
        .compare_folders(
            &args.ground_truth_dir,
            &args.results_dir,
            &FramePattern::new(args.gt_token, args.gt_ext),
            &FramePattern::new(args.res_token, args.res_ext),
        )
        .map_err(CheckError::from)?;
    println!("{}", render_human_summary("Folder", &report));

    if let Some(report_path) = &args.policy.report {
        write_command_report(report_path, &report)?;
    }

    if report.passed { Ok(0) } else { Ok(FAILED_VERDICT_EXIT_CODE) }
}

pub(super) fn run_table_command(args: TableArgs) -> Result<i32, CliError> {
    let policy = load_policy(&args.policy, &ThresholdFlags::default())?;
    let checks = if args.columns.is_empty() {
        policy.columns.clone()
    } else {
        args.columns
    };
    if checks.is_empty() {
        return Err(CliError::Usage(
            "no column checks given; pass --column or list columns in the policy".to_string(),
        ));
    }

    let tables = TablePair::read_csv_data(
        &args.ground_truth,
        &args.result,
        &args.gt_frame_column,
        &args.res_frame_column,
        policy.duplicate_policy,
    )
    .map_err(CheckError::from)?;
    warn_dropped_rows(policy.mode, &tables);

    let mut comparator = policy.table_comparator();
    if policy.mode.is_debug() {
        comparator = comparator.with_acknowledge_hook(PromptAcknowledge);
    }

    let report = comparator.compare_columns(&tables, &checks);
    println!("{}", render_table_summary(&report));

    if let Some(report_path) = &args.policy.report {
        write_command_report(report_path, &report)?;
    }

    if report.passed { Ok(0) } else { Ok(FAILED_VERDICT_EXIT_CODE) }
}

fn debug_sink(
    mode: ReportingMode,
    thresholds: &ThresholdFlags,
) -> Result<Option<PanelFileSink>, CliError> {
    match (&thresholds.debug_dir, mode.is_debug()) {
        (Some(dir), true) => Ok(Some(panel_file_sink(dir)?)),
        _ => Ok(None),
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
