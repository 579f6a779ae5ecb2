//! Statistical and pixelwise image comparison.
//!
//! [`ImageComparator::compare`] applies its checks in a fixed order and stops
//! at the first failure: existence, decoding, channel normalization, shape,
//! the four summary statistics, then the bad-pixel count.

pub mod debug;
pub mod raster;
pub mod stats;

pub use debug::{DebugSink, DebugView, NoopDebugSink, PanelFileSink};
pub use raster::{ImageCodec, ImageCrateCodec, ImageLoadError, Raster};
pub use stats::ImageStatistics;

use crate::batch::{BatchReport, run_batch};
use crate::domain::{ComparisonOutcome, FailureKind, ReportingMode, Reporter};
use crate::indexer::{DuplicatePolicy, FramePattern, IndexError, index_directory};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageThresholds {
    pub thr_min: f64,
    pub thr_max: f64,
    pub thr_mean: f64,
    pub thr_median: f64,
    /// Failure once the bad-pixel count reaches this value (inclusive).
    pub min_bad_pixels: u64,
    /// A pixel is bad when its absolute difference exceeds this (exclusive).
    pub max_abs_diff: u32,
    pub convert_to_gray: bool,
}

impl Default for ImageThresholds {
    fn default() -> Self {
        Self {
            thr_min: 0.0,
            thr_max: 0.0,
            thr_mean: 0.0,
            thr_median: 0.0,
            min_bad_pixels: 1,
            max_abs_diff: 0,
            convert_to_gray: false,
        }
    }
}

impl ImageThresholds {
    pub fn new(
        thr_min: f64,
        thr_max: f64,
        thr_mean: f64,
        thr_median: f64,
        min_bad_pixels: u64,
        max_abs_diff: u32,
    ) -> Self {
        Self {
            thr_min,
            thr_max,
            thr_mean,
            thr_median,
            min_bad_pixels,
            max_abs_diff,
            convert_to_gray: false,
        }
    }

    fn statistic_checks(
        &self,
        first: &ImageStatistics,
        second: &ImageStatistics,
    ) -> [(f64, f64, &'static str); 4] {
        [
            (
                f64::from(first.min) - f64::from(second.min),
                self.thr_min,
                "Min values differ too much.",
            ),
            (
                f64::from(first.max) - f64::from(second.max),
                self.thr_max,
                "Max values differ too much.",
            ),
            (first.mean - second.mean, self.thr_mean, "Mean values differ too much."),
            (
                f64::from(first.median) - f64::from(second.median),
                self.thr_median,
                "Median values differ too much.",
            ),
        ]
    }
}

pub struct ImageComparator {
    thresholds: ImageThresholds,
    mode: ReportingMode,
    duplicate_policy: DuplicatePolicy,
    codec: Box<dyn ImageCodec>,
    sink: Box<dyn DebugSink>,
}

impl ImageComparator {
    pub fn new(thresholds: ImageThresholds, mode: ReportingMode) -> Self {
        Self {
            thresholds,
            mode,
            duplicate_policy: DuplicatePolicy::default(),
            codec: Box::new(ImageCrateCodec),
            sink: Box::new(NoopDebugSink),
        }
    }

    #[must_use]
    pub fn with_codec(mut self, codec: impl ImageCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    #[must_use]
    pub fn with_debug_sink(mut self, sink: impl DebugSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn thresholds(&self) -> &ImageThresholds {
        &self.thresholds
    }

    pub fn mode(&self) -> ReportingMode {
        self.mode
    }

    pub fn set_threshold_min(&mut self, value: f64) {
        self.thresholds.thr_min = value;
    }

    pub fn set_threshold_max(&mut self, value: f64) {
        self.thresholds.thr_max = value;
    }

    pub fn set_threshold_mean(&mut self, value: f64) {
        self.thresholds.thr_mean = value;
    }

    pub fn set_threshold_median(&mut self, value: f64) {
        self.thresholds.thr_median = value;
    }

    pub fn set_min_bad_pixels(&mut self, value: u64) {
        self.thresholds.min_bad_pixels = value;
    }

    pub fn set_max_abs_diff(&mut self, value: u32) {
        self.thresholds.max_abs_diff = value;
    }

    pub fn set_convert_to_gray(&mut self, value: bool) {
        self.thresholds.convert_to_gray = value;
    }

    pub fn set_mode(&mut self, mode: ReportingMode) {
        self.mode = mode;
    }

    pub fn set_duplicate_policy(&mut self, policy: DuplicatePolicy) {
        self.duplicate_policy = policy;
    }

    pub fn compare(&mut self, first_path: &Path, second_path: &Path) -> ComparisonOutcome {
        let reporter = Reporter::new(self.mode);

        if !first_path.exists() || !second_path.exists() {
            return self.fail(
                reporter,
                FailureKind::InputMissing,
                "One or both image files do not exist.".to_string(),
                None,
            );
        }

        let (raw_first, raw_second) = match (
            self.codec.decode(first_path),
            self.codec.decode(second_path),
        ) {
            (Ok(first), Ok(second)) => (first, second),
            (Err(error), _) | (_, Err(error)) => {
                return self.fail(
                    reporter,
                    FailureKind::LoadError,
                    format!("Failed to load one or both images. {}", error),
                    None,
                );
            }
        };

        let first = match normalize(&raw_first, 1, self.thresholds.convert_to_gray, reporter) {
            Ok(raster) => raster,
            Err(reason) => {
                let view = (&raw_first, &raw_second, None);
                return self.fail(reporter, FailureKind::FormatError, reason, Some(view));
            }
        };
        let second = match normalize(&raw_second, 2, self.thresholds.convert_to_gray, reporter) {
            Ok(raster) => raster,
            Err(reason) => {
                let view = (&raw_first, &raw_second, None);
                return self.fail(reporter, FailureKind::FormatError, reason, Some(view));
            }
        };

        reporter.info(format!("Image 1 size: {}x{}", first.width, first.height));
        reporter.info(format!("Image 2 size: {}x{}", second.width, second.height));

        if !first.same_dimensions(&second) {
            return self.fail(
                reporter,
                FailureKind::ShapeError,
                "Images have different sizes.".to_string(),
                Some((&first, &second, None)),
            );
        }

        let (Some(first_stats), Some(second_stats)) = (
            ImageStatistics::compute(&first.samples),
            ImageStatistics::compute(&second.samples),
        ) else {
            return self.fail(
                reporter,
                FailureKind::FormatError,
                "Images have no samples.".to_string(),
                None,
            );
        };
        reporter.info(format!("Image 1: {}", first_stats));
        reporter.info(format!("Image 2: {}", second_stats));

        for (delta, threshold, reason) in self
            .thresholds
            .statistic_checks(&first_stats, &second_stats)
        {
            if delta.abs() > threshold {
                return self.fail(
                    reporter,
                    FailureKind::ThresholdViolation,
                    reason.to_string(),
                    Some((&first, &second, None)),
                );
            }
        }

        let difference = first.abs_diff(&second);
        let bad_pixels = count_bad_pixels(&difference, self.thresholds.max_abs_diff);
        reporter.info(format!("Bad pixels count = {}", bad_pixels));

        if bad_pixels >= self.thresholds.min_bad_pixels {
            return self.fail(
                reporter,
                FailureKind::PixelCount,
                format!("Too many differing pixels. ({} bad pixels)", bad_pixels),
                Some((&first, &second, Some(&difference))),
            );
        }

        ComparisonOutcome::pass()
    }

    /// Indexes both directories and compares every result frame against its
    /// ground truth. Indices are rebuilt on every call.
    pub fn compare_folders(
        &mut self,
        ground_truth_dir: &Path,
        results_dir: &Path,
        ground_truth_pattern: &FramePattern,
        results_pattern: &FramePattern,
    ) -> Result<BatchReport, IndexError> {
        let ground_truth =
            index_directory(ground_truth_dir, ground_truth_pattern, self.duplicate_policy)?;
        let results = index_directory(results_dir, results_pattern, self.duplicate_policy)?;
        let reporter = Reporter::new(self.mode);

        Ok(run_batch(
            &ground_truth,
            &results,
            reporter,
            |_, truth_path, result_path| self.compare(truth_path, result_path),
        ))
    }

    fn fail(
        &mut self,
        reporter: Reporter,
        kind: FailureKind,
        reason: String,
        view: Option<(&Raster, &Raster, Option<&Raster>)>,
    ) -> ComparisonOutcome {
        reporter.fail(&reason);
        if self.mode.is_debug() {
            if let Some((first, second, difference)) = view {
                self.sink.present(&DebugView {
                    first,
                    second,
                    difference,
                    reason: &reason,
                });
            }
        }
        ComparisonOutcome::fail(kind, reason)
    }
}

fn normalize(
    raw: &Raster,
    position: u8,
    convert_to_gray: bool,
    reporter: Reporter,
) -> Result<Raster, String> {
    match raw.channels {
        1 => Ok(raw.clone()),
        3 if convert_to_gray => {
            reporter.info(format!("Converted image {} to grayscale.", position));
            Ok(raw.to_luminance())
        }
        3 => Err(format!(
            "Image {} is not grayscale and conversion is disabled.",
            position
        )),
        channels => Err(format!(
            "Image {} has {} channels; only 1 or 3 are supported.",
            position, channels
        )),
    }
}

fn count_bad_pixels(difference: &Raster, max_abs_diff: u32) -> u64 {
    difference
        .samples
        .iter()
        .filter(|sample| u32::from(**sample) > max_abs_diff)
        .count() as u64
}

#[cfg(test)]
mod tests {
    use super::{DebugView, ImageCodec, ImageComparator, ImageLoadError, ImageThresholds, Raster};
    use crate::domain::{FailureKind, ReportingMode};
    use crate::indexer::FramePattern;
    use image::{GrayImage, Luma, RgbImage, RgbaImage};
    use std::cell::RefCell;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;
    use tempfile::TempDir;

    fn write_gray(dir: &Path, name: &str, width: u32, height: u32, pixels: &[u8]) -> PathBuf {
        let path = dir.join(name);
        GrayImage::from_raw(width, height, pixels.to_vec())
            .expect("pixel buffer should match dimensions")
            .save(&path)
            .expect("image should be saved");
        path
    }

    fn write_uniform_gray(dir: &Path, name: &str, size: u32, value: u8) -> PathBuf {
        let path = dir.join(name);
        GrayImage::from_pixel(size, size, Luma([value]))
            .save(&path)
            .expect("image should be saved");
        path
    }

    fn write_uniform_rgb(dir: &Path, name: &str, size: u32, rgb: [u8; 3]) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(size, size, image::Rgb(rgb))
            .save(&path)
            .expect("image should be saved");
        path
    }

    /// Decodes every path to the same raster.
    struct FixedCodec(Raster);

    impl ImageCodec for FixedCodec {
        fn decode(&self, _path: &Path) -> Result<Raster, ImageLoadError> {
            Ok(self.0.clone())
        }
    }

    fn lenient() -> ImageThresholds {
        ImageThresholds::new(5.0, 5.0, 2.0, 2.0, 100, 15)
    }

    #[test]
    fn identical_images_pass() {
        let temp = TempDir::new().expect("tempdir should be created");
        let pixels = [0, 17, 34, 255, 128, 64, 1, 2, 3];
        let first = write_gray(temp.path(), "a.png", 3, 3, &pixels);
        let second = write_gray(temp.path(), "b.png", 3, 3, &pixels);

        let mut strict = ImageComparator::new(ImageThresholds::default(), ReportingMode::Silent);
        assert!(strict.compare(&first, &second).passed);

        strict.set_convert_to_gray(true);
        assert!(strict.compare(&first, &first).passed);
    }

    #[test]
    fn missing_file_is_input_missing() {
        let temp = TempDir::new().expect("tempdir should be created");
        let first = write_uniform_gray(temp.path(), "a.png", 2, 0);
        let mut comparator = ImageComparator::new(lenient(), ReportingMode::Silent);

        let outcome = comparator.compare(&first, &temp.path().join("missing.png"));
        assert_eq!(outcome.kind, Some(FailureKind::InputMissing));
    }

    #[test]
    fn undecodable_file_is_load_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let first = write_uniform_gray(temp.path(), "a.png", 2, 0);
        let broken = temp.path().join("broken.png");
        fs::write(&broken, b"garbage").expect("file should be written");
        let mut comparator = ImageComparator::new(lenient(), ReportingMode::Silent);

        let outcome = comparator.compare(&first, &broken);
        assert_eq!(outcome.kind, Some(FailureKind::LoadError));
    }

    #[test]
    fn color_image_requires_gray_conversion() {
        let temp = TempDir::new().expect("tempdir should be created");
        let color = write_uniform_rgb(temp.path(), "color.png", 4, [100, 150, 200]);
        // 0.299*100 + 0.587*150 + 0.114*200 = 140.75
        let gray = write_uniform_gray(temp.path(), "gray.png", 4, 141);

        let mut comparator = ImageComparator::new(lenient(), ReportingMode::Silent);
        let rejected = comparator.compare(&color, &gray);
        assert!(!rejected.passed);
        assert_eq!(rejected.kind, Some(FailureKind::FormatError));
        assert_eq!(
            rejected.reason.as_deref(),
            Some("Image 1 is not grayscale and conversion is disabled.")
        );

        comparator.set_convert_to_gray(true);
        let accepted = comparator.compare(&color, &gray);
        assert!(accepted.passed, "unexpected failure: {:?}", accepted.reason);
    }

    #[test]
    fn shape_mismatch_is_detected_before_statistics() {
        let temp = TempDir::new().expect("tempdir should be created");
        let small = write_uniform_gray(temp.path(), "small.png", 4, 9);
        let large = write_uniform_gray(temp.path(), "large.png", 5, 9);
        let mut comparator = ImageComparator::new(lenient(), ReportingMode::Silent);

        let outcome = comparator.compare(&small, &large);
        assert_eq!(outcome.kind, Some(FailureKind::ShapeError));
    }

    #[test]
    fn mean_violation_stops_before_pixel_counting() {
        let temp = TempDir::new().expect("tempdir should be created");
        let black = write_uniform_gray(temp.path(), "black.png", 4, 0);
        let white = write_uniform_gray(temp.path(), "white.png", 4, 255);
        let thresholds = ImageThresholds::new(255.0, 255.0, 2.0, 255.0, 1000, 0);
        let mut comparator = ImageComparator::new(thresholds, ReportingMode::Silent);

        let outcome = comparator.compare(&black, &white);
        assert_eq!(outcome.kind, Some(FailureKind::ThresholdViolation));
        assert_eq!(outcome.reason.as_deref(), Some("Mean values differ too much."));
    }

    #[test]
    fn min_is_checked_before_mean() {
        let temp = TempDir::new().expect("tempdir should be created");
        let black = write_uniform_gray(temp.path(), "black.png", 4, 0);
        let white = write_uniform_gray(temp.path(), "white.png", 4, 255);
        let mut comparator = ImageComparator::new(lenient(), ReportingMode::Silent);

        let outcome = comparator.compare(&black, &white);
        assert_eq!(outcome.reason.as_deref(), Some("Min values differ too much."));
    }

    #[test]
    fn bad_pixel_count_is_inclusive() {
        let temp = TempDir::new().expect("tempdir should be created");
        let base = [10u8; 9];
        let mut changed = base;
        changed[0] = 40;
        changed[4] = 40;
        let first = write_gray(temp.path(), "a.png", 3, 3, &base);
        let second = write_gray(temp.path(), "b.png", 3, 3, &changed);

        let thresholds = ImageThresholds::new(255.0, 255.0, 255.0, 255.0, 1, 15);
        let mut comparator = ImageComparator::new(thresholds, ReportingMode::Silent);
        let outcome = comparator.compare(&first, &second);
        assert_eq!(outcome.kind, Some(FailureKind::PixelCount));

        comparator.set_min_bad_pixels(2);
        assert_eq!(
            comparator.compare(&first, &second).kind,
            Some(FailureKind::PixelCount)
        );

        comparator.set_min_bad_pixels(3);
        assert!(comparator.compare(&first, &second).passed);

        // a difference equal to the cutoff is not bad
        comparator.set_min_bad_pixels(1);
        comparator.set_max_abs_diff(30);
        assert!(comparator.compare(&first, &second).passed);
    }

    #[test]
    fn debug_mode_presents_failures_to_sink() {
        let temp = TempDir::new().expect("tempdir should be created");
        let black = write_uniform_gray(temp.path(), "black.png", 2, 0);
        let gray = write_uniform_gray(temp.path(), "gray.png", 2, 50);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let recorder = Rc::clone(&seen);

        let thresholds = ImageThresholds::new(255.0, 255.0, 255.0, 255.0, 1, 0);
        let mut comparator = ImageComparator::new(thresholds, ReportingMode::Debug)
            .with_debug_sink(move |view: &DebugView<'_>| {
                recorder
                    .borrow_mut()
                    .push((view.difference.is_some(), view.reason.to_string()));
            });

        assert!(!comparator.compare(&black, &gray).passed);
        comparator.set_mode(ReportingMode::Informative);
        assert!(!comparator.compare(&black, &gray).passed);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0);
        assert!(seen[0].1.starts_with("Too many differing pixels."));
    }

    #[test]
    fn compare_folders_aggregates_failures() {
        let temp = TempDir::new().expect("tempdir should be created");
        let gt_dir = temp.path().join("gt");
        let res_dir = temp.path().join("res");
        fs::create_dir_all(&gt_dir).expect("gt dir should be created");
        fs::create_dir_all(&res_dir).expect("res dir should be created");

        write_uniform_gray(&gt_dir, "gt_001.png", 3, 10);
        write_uniform_gray(&gt_dir, "gt_002.png", 3, 10);
        write_uniform_gray(&gt_dir, "gt_005.png", 3, 10);
        write_uniform_gray(&res_dir, "res_1.png", 3, 10);
        write_uniform_gray(&res_dir, "res_2.png", 4, 10);
        write_uniform_gray(&res_dir, "res_3.png", 3, 10);
        fs::write(res_dir.join("notes.txt"), "ignored").expect("file should be written");

        let mut comparator = ImageComparator::new(lenient(), ReportingMode::Silent);
        let report = comparator
            .compare_folders(
                &gt_dir,
                &res_dir,
                &FramePattern::new("gt_", "png"),
                &FramePattern::new("res_", "png"),
            )
            .expect("folders should be indexed");

        assert!(!report.passed);
        assert_eq!(report.total, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(report.items[1].kind, Some(FailureKind::ShapeError));
        assert_eq!(report.items[2].kind, Some(FailureKind::LookupMiss));
        assert_eq!(report.unmatched_ground_truth, vec![5]);
    }

    #[test]
    fn unsupported_channel_counts_are_format_errors_even_with_conversion() {
        let temp = TempDir::new().expect("tempdir should be created");
        let rgba = temp.path().join("rgba.png");
        RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 255]))
            .save(&rgba)
            .expect("image should be saved");
        let gray = write_uniform_gray(temp.path(), "gray.png", 2, 2);

        let mut comparator = ImageComparator::new(lenient(), ReportingMode::Silent);
        comparator.set_convert_to_gray(true);
        let outcome = comparator.compare(&rgba, &gray);
        assert_eq!(outcome.kind, Some(FailureKind::FormatError));
        assert_eq!(
            outcome.reason.as_deref(),
            Some("Image 1 has 4 channels; only 1 or 3 are supported.")
        );

        let two_channel = Raster {
            width: 2,
            height: 2,
            channels: 2,
            bit_depth: 8,
            samples: vec![7; 8],
        };
        let mut comparator = ImageComparator::new(lenient(), ReportingMode::Silent)
            .with_codec(FixedCodec(two_channel));
        comparator.set_convert_to_gray(true);
        let outcome = comparator.compare(&gray, &gray);
        assert_eq!(outcome.kind, Some(FailureKind::FormatError));
        assert_eq!(
            outcome.reason.as_deref(),
            Some("Image 1 has 2 channels; only 1 or 3 are supported.")
        );
    }

    #[test]
    fn empty_rasters_have_no_samples() {
        let temp = TempDir::new().expect("tempdir should be created");
        let placeholder = write_uniform_gray(temp.path(), "a.png", 1, 0);
        let mut comparator = ImageComparator::new(lenient(), ReportingMode::Silent)
            .with_codec(FixedCodec(Raster::gray(0, 0, Vec::new())));

        let outcome = comparator.compare(&placeholder, &placeholder);
        assert_eq!(outcome.kind, Some(FailureKind::FormatError));
        assert_eq!(outcome.reason.as_deref(), Some("Images have no samples."));
    }

    #[test]
    fn zero_min_bad_pixels_fails_identical_images() {
        let temp = TempDir::new().expect("tempdir should be created");
        let first = write_uniform_gray(temp.path(), "a.png", 3, 80);
        let second = write_uniform_gray(temp.path(), "b.png", 3, 80);
        let mut comparator = ImageComparator::new(lenient(), ReportingMode::Silent);
        assert!(comparator.compare(&first, &second).passed);

        comparator.set_min_bad_pixels(0);
        let outcome = comparator.compare(&first, &second);
        assert_eq!(outcome.kind, Some(FailureKind::PixelCount));
        assert_eq!(
            outcome.reason.as_deref(),
            Some("Too many differing pixels. (0 bad pixels)")
        );
    }

    #[test]
    fn statistic_setters_change_later_comparisons() {
        let temp = TempDir::new().expect("tempdir should be created");
        let dark = write_uniform_gray(temp.path(), "dark.png", 2, 10);
        let light = write_uniform_gray(temp.path(), "light.png", 2, 14);
        let mut comparator = ImageComparator::new(ImageThresholds::default(), ReportingMode::Silent);
        comparator.set_max_abs_diff(4);

        let expected = [
            "Min values differ too much.",
            "Max values differ too much.",
            "Mean values differ too much.",
            "Median values differ too much.",
        ];
        for (step, reason) in expected.iter().enumerate() {
            assert_eq!(comparator.compare(&dark, &light).reason.as_deref(), Some(*reason));
            match step {
                0 => comparator.set_threshold_min(4.0),
                1 => comparator.set_threshold_max(4.0),
                2 => comparator.set_threshold_mean(4.0),
                _ => comparator.set_threshold_median(4.0),
            }
        }
        assert!(comparator.compare(&dark, &light).passed);
        assert_eq!(comparator.mode(), ReportingMode::Silent);
    }
}
