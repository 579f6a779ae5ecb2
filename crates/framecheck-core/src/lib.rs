//! Regression checks for frame-indexed image and table outputs.

pub mod batch;
pub mod domain;
pub mod imaging;
pub mod indexer;
pub mod policy;
pub mod report;
pub mod table;

pub use batch::{BatchReport, FrameReport};
pub use domain::{
    CheckError, CheckErrorCategory, ComparisonOutcome, FailureKind, FrameNumber,
    ReportingMode,
};
pub use imaging::{ImageComparator, ImageThresholds};
pub use indexer::{DuplicatePolicy, FramePattern};
pub use policy::ComparePolicy;
pub use table::{ColumnCheck, ColumnType, TableComparator, TablePair};
