pub mod errors;

pub use errors::{CheckError, CheckErrorCategory, FAILED_VERDICT_EXIT_CODE};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type FrameNumber = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportingMode {
    #[default]
    Silent,
    Informative,
    Debug,
}

impl ReportingMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Silent => "silent",
            Self::Informative => "informative",
            Self::Debug => "debug",
        }
    }

    pub const fn is_silent(self) -> bool {
        matches!(self, Self::Silent)
    }

    pub const fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

impl Display for ReportingMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InputMissing,
    LoadError,
    FormatError,
    ShapeError,
    ThresholdViolation,
    PixelCount,
    ParseError,
    LookupMiss,
}

impl FailureKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputMissing => "input_missing",
            Self::LoadError => "load_error",
            Self::FormatError => "format_error",
            Self::ShapeError => "shape_error",
            Self::ThresholdViolation => "threshold_violation",
            Self::PixelCount => "pixel_count",
            Self::ParseError => "parse_error",
            Self::LookupMiss => "lookup_miss",
        }
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonOutcome {
    pub passed: bool,
    pub kind: Option<FailureKind>,
    pub reason: Option<String>,
}

impl ComparisonOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            kind: None,
            reason: None,
        }
    }

    pub fn fail(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            kind: Some(kind),
            reason: Some(reason.into()),
        }
    }

    pub fn reason_or_default(&self) -> &str {
        self.reason.as_deref().unwrap_or("comparison failed without a reason")
    }
}

/// Emits log lines only when the reporting mode asks for them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    mode: ReportingMode,
}

impl Reporter {
    pub const fn new(mode: ReportingMode) -> Self {
        Self { mode }
    }

    pub const fn mode(&self) -> ReportingMode {
        self.mode
    }

    pub fn info(&self, message: impl AsRef<str>) {
        if !self.mode.is_silent() {
            tracing::info!("{}", message.as_ref());
        }
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        if !self.mode.is_silent() {
            tracing::warn!("{}", message.as_ref());
        }
    }

    pub fn fail(&self, reason: impl AsRef<str>) {
        if !self.mode.is_silent() {
            tracing::info!("FAIL: {}", reason.as_ref());
        }
    }
}
