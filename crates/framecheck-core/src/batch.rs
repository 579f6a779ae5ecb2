use crate::domain::{ComparisonOutcome, FailureKind, FrameNumber, Reporter};
use crate::indexer::FrameIndex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame: FrameNumber,
    pub passed: bool,
    pub kind: Option<FailureKind>,
    pub reason: Option<String>,
    pub ground_truth: Option<String>,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub passed: bool,
    pub total: usize,
    pub failed: usize,
    pub items: Vec<FrameReport>,
    /// Frames present only on the ground-truth side. Listed, never counted.
    pub unmatched_ground_truth: Vec<FrameNumber>,
}

impl BatchReport {
    pub fn passed_count(&self) -> usize {
        self.total.saturating_sub(self.failed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FrameReport> {
        self.items.iter().filter(|item| !item.passed)
    }

    pub fn first_failure(&self) -> Option<&FrameReport> {
        self.failures().next()
    }
}

/// Labels a locator for reports and log lines.
pub trait Locator {
    fn describe(&self) -> String;
}

impl Locator for std::path::PathBuf {
    fn describe(&self) -> String {
        self.to_string_lossy().replace('\\', "/")
    }
}

/// Walks the result side in ascending frame order.
///
/// A result frame without ground truth fails as a lookup miss and `compare`
/// is not invoked for it. Ground-truth-only frames are reported in
/// `unmatched_ground_truth` but never counted.
pub fn run_batch<G, R, F>(
    ground_truth: &FrameIndex<G>,
    results: &FrameIndex<R>,
    reporter: Reporter,
    mut compare: F,
) -> BatchReport
where
    G: Locator,
    R: Locator,
    F: FnMut(FrameNumber, &G, &R) -> ComparisonOutcome,
{
    let mut items = Vec::with_capacity(results.len());
    for (frame, result) in results.iter() {
        let Some(truth) = ground_truth.get(frame) else {
            reporter.warn(format!("Warning: No ground truth found for frame {}", frame));
            items.push(FrameReport {
                frame,
                passed: false,
                kind: Some(FailureKind::LookupMiss),
                reason: Some(format!("No ground truth found for frame {}", frame)),
                ground_truth: None,
                result: result.describe(),
            });
            continue;
        };

        reporter.info(format!(
            "Comparing frame {}: {} <-> {}",
            frame,
            truth.describe(),
            result.describe()
        ));
        let outcome = compare(frame, truth, result);
        reporter.info(format!(
            "Result: {}",
            if outcome.passed { "PASS" } else { "FAIL" }
        ));
        items.push(FrameReport {
            frame,
            passed: outcome.passed,
            kind: outcome.kind,
            reason: outcome.reason,
            ground_truth: Some(truth.describe()),
            result: result.describe(),
        });
    }

    let unmatched_ground_truth = ground_truth
        .frames()
        .filter(|frame| !results.contains(*frame))
        .collect::<Vec<_>>();
    for frame in &unmatched_ground_truth {
        reporter.warn(format!("Warning: No result found for ground truth frame {}", frame));
    }

    let total = items.len();
    let failed = items.iter().filter(|item| !item.passed).count();
    reporter.info(format!(
        "Total failed frames count is {} out of {}",
        failed, total
    ));

    BatchReport {
        passed: failed == 0,
        total,
        failed,
        items,
        unmatched_ground_truth,
    }
}
