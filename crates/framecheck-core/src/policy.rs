use crate::domain::{CheckError, ReportingMode};
use crate::imaging::{ImageComparator, ImageThresholds};
use crate::indexer::DuplicatePolicy;
use crate::table::{ColumnCheck, TableComparator};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

/// Comparison settings shared by the image and table engines.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComparePolicy {
    pub mode: ReportingMode,
    pub duplicate_policy: DuplicatePolicy,
    pub image: ImageThresholds,
    pub columns: Vec<ColumnCheck>,
}

impl ComparePolicy {
    pub fn from_policy_path(policy_path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let policy_path = policy_path.as_ref();
        let content = fs::read_to_string(policy_path).map_err(|source| PolicyError::ReadPolicy {
            path: policy_path.to_path_buf(),
            source,
        })?;
        let policy: Self =
            serde_json::from_str(&content).map_err(|source| PolicyError::ParsePolicy {
                path: policy_path.to_path_buf(),
                source,
            })?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_policy_json(policy_json: &str) -> Result<Self, PolicyError> {
        let policy: Self =
            serde_json::from_str(policy_json).map_err(|source| PolicyError::ParsePolicy {
                path: PathBuf::from("<inline-policy>"),
                source,
            })?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        let image = &self.image;
        for (name, value) in [
            ("image.thrMin", image.thr_min),
            ("image.thrMax", image.thr_max),
            ("image.thrMean", image.thr_mean),
            ("image.thrMedian", image.thr_median),
        ] {
            validate_threshold(name, value)?;
        }

        for (position, check) in self.columns.iter().enumerate() {
            if check.ground_truth_column.trim().is_empty() || check.result_column.trim().is_empty()
            {
                return Err(PolicyError::InvalidPolicy(format!(
                    "columns[{}] must name both the ground-truth and result column",
                    position
                )));
            }
            validate_threshold(&format!("columns[{}].threshold", position), check.threshold)?;
        }
        Ok(())
    }

    pub fn image_comparator(&self) -> ImageComparator {
        let mut comparator = ImageComparator::new(self.image, self.mode);
        comparator.set_duplicate_policy(self.duplicate_policy);
        comparator
    }

    pub fn table_comparator(&self) -> TableComparator {
        TableComparator::new(self.mode)
    }
}

fn validate_threshold(name: &str, value: f64) -> Result<(), PolicyError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PolicyError::InvalidPolicy(format!(
            "{} must be a finite non-negative number, got {}",
            name, value
        )));
    }
    Ok(())
}

#[derive(Debug)]
pub enum PolicyError {
    ReadPolicy {
        path: PathBuf,
        source: std::io::Error,
    },
    ParsePolicy {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidPolicy(String),
}

impl Display for PolicyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadPolicy { path, source } => {
                write!(f, "failed to read policy '{}': {}", path.display(), source)
            }
            Self::ParsePolicy { path, source } => {
                write!(f, "failed to parse policy '{}': {}", path.display(), source)
            }
            Self::InvalidPolicy(message) => write!(f, "invalid policy: {}", message),
        }
    }
}

impl Error for PolicyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ReadPolicy { source, .. } => Some(source),
            Self::ParsePolicy { source, .. } => Some(source),
            Self::InvalidPolicy(_) => None,
        }
    }
}

impl From<PolicyError> for CheckError {
    fn from(error: PolicyError) -> Self {
        let message = error.to_string();
        match error {
            PolicyError::ReadPolicy { .. } => CheckError::io("IO.POLICY_READ", message),
            PolicyError::ParsePolicy { .. } | PolicyError::InvalidPolicy(_) => {
                CheckError::invalid_input("INPUT.POLICY", message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ComparePolicy, PolicyError};
    use crate::domain::{CheckErrorCategory, ReportingMode};
    use crate::indexer::DuplicatePolicy;
    use crate::table::ColumnType;
    use tempfile::TempDir;

    #[test]
    fn empty_policy_uses_defaults() {
        let policy = ComparePolicy::from_policy_json("{}").expect("policy should parse");
        assert_eq!(policy.mode, ReportingMode::Silent);
        assert_eq!(policy.duplicate_policy, DuplicatePolicy::LastWins);
        assert_eq!(policy.image.min_bad_pixels, 1);
        assert_eq!(policy.image.max_abs_diff, 0);
        assert!(!policy.image.convert_to_gray);
        assert!(policy.columns.is_empty());
    }

    #[test]
    fn parses_camel_case_policy() {
        let policy = ComparePolicy::from_policy_json(
            r#"{
                "mode": "informative",
                "duplicatePolicy": "reject",
                "image": { "thrMean": 1.5, "minBadPixels": 10, "maxAbsDiff": 3, "convertToGray": true },
                "columns": [
                    { "groundTruthColumn": "p1", "resultColumn": "prob1", "threshold": 0.2 },
                    { "groundTruthColumn": "n", "resultColumn": "count", "threshold": 1, "columnType": "int" }
                ]
            }"#,
        )
        .expect("policy should parse");

        assert_eq!(policy.mode, ReportingMode::Informative);
        assert_eq!(policy.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(policy.image.thr_mean, 1.5);
        assert_eq!(policy.image.thr_min, 0.0);
        assert_eq!(policy.image.min_bad_pixels, 10);
        assert!(policy.image.convert_to_gray);
        assert_eq!(policy.columns[0].column_type, ColumnType::Float);
        assert_eq!(policy.columns[1].column_type, ColumnType::Int);
        assert_eq!(policy.image_comparator().thresholds().max_abs_diff, 3);
    }

    #[test]
    fn negative_thresholds_are_rejected() {
        let error = ComparePolicy::from_policy_json(r#"{ "image": { "thrMax": -1 } }"#)
            .expect_err("negative threshold should be rejected");
        assert!(matches!(error, PolicyError::InvalidPolicy(_)));
        assert!(error.to_string().contains("image.thrMax"));

        let error = ComparePolicy::from_policy_json(
            r#"{ "columns": [ { "groundTruthColumn": "a", "resultColumn": "b", "threshold": -0.5 } ] }"#,
        )
        .expect_err("negative column threshold should be rejected");
        assert!(error.to_string().contains("columns[0].threshold"));
    }

    #[test]
    fn blank_column_names_are_rejected() {
        let error = ComparePolicy::from_policy_json(
            r#"{ "columns": [ { "groundTruthColumn": " ", "resultColumn": "b" } ] }"#,
        )
        .expect_err("blank column should be rejected");
        assert!(matches!(error, PolicyError::InvalidPolicy(_)));
    }

    #[test]
    fn read_and_parse_errors_map_to_categories() {
        let temp = TempDir::new().expect("tempdir should be created");
        let missing = ComparePolicy::from_policy_path(temp.path().join("missing.json"))
            .expect_err("missing policy should fail");
        let missing = crate::domain::CheckError::from(missing);
        assert_eq!(missing.category(), CheckErrorCategory::Io);
        assert_eq!(missing.placeholder(), "IO.POLICY_READ");

        let path = temp.path().join("policy.json");
        std::fs::write(&path, "{ not json").expect("policy should be written");
        let malformed =
            ComparePolicy::from_policy_path(&path).expect_err("malformed policy should fail");
        let malformed = crate::domain::CheckError::from(malformed);
        assert_eq!(malformed.category(), CheckErrorCategory::InvalidInput);
        assert_eq!(malformed.exit_code(), 2);
    }
}
