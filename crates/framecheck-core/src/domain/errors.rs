use std::fmt::{Display, Formatter};

/// Exit code for a completed run whose verdict is a failure.
pub const FAILED_VERDICT_EXIT_CODE: i32 = 1;

/// Why a run could not produce a verdict. Each class owns one process exit
/// code above [`FAILED_VERDICT_EXIT_CODE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckErrorCategory {
    /// Bad flags, policy or table header; retrying with the same input fails again.
    InvalidInput,
    /// A directory, table, policy or report path could not be accessed.
    Io,
    Internal,
}

impl CheckErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InvalidInput => 2,
            Self::Io => 3,
            Self::Internal => 4,
        }
    }
}

impl Display for CheckErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::InvalidInput => "invalid input",
            Self::Io => "i/o",
            Self::Internal => "internal",
        })
    }
}

/// Run-level failure: something prevented a comparison from producing a verdict.
///
/// Per-frame mismatches are never reported through this type; they are
/// [`ComparisonOutcome`](super::ComparisonOutcome) values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{category} error [{placeholder}] {message}")]
pub struct CheckError {
    category: CheckErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl CheckError {
    pub fn invalid_input(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::with_category(CheckErrorCategory::InvalidInput, placeholder, message)
    }

    pub fn io(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::with_category(CheckErrorCategory::Io, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::with_category(CheckErrorCategory::Internal, placeholder, message)
    }

    fn with_category(
        category: CheckErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub const fn category(&self) -> CheckErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    /// The two stderr lines printed before the process exits with
    /// [`exit_code`](Self::exit_code).
    pub fn diagnostic_lines(&self) -> [String; 2] {
        [
            format!("ERROR: [{}] {}", self.placeholder, self.message),
            format!("FATAL EXIT CODE: {}", self.exit_code()),
        ]
    }
}
