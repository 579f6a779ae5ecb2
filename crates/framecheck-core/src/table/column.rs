use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Value semantics of a compared column. Unknown tags fall back to `Float`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    Bool,
    Int,
    #[default]
    Float,
}

impl ColumnType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "bool" => Self::Bool,
            "int" => Self::Int,
            _ => Self::Float,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
        }
    }
}

impl From<String> for ColumnType {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<ColumnType> for String {
    fn from(column_type: ColumnType) -> Self {
        column_type.as_str().to_string()
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}, column '{column}': '{value}' is not a valid {expected}")]
pub struct CellParseError {
    pub line: usize,
    pub column: String,
    pub value: String,
    pub expected: ColumnType,
}

/// A raw cell with lazily parsed typed views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell<'a> {
    pub column: &'a str,
    pub raw: &'a str,
    pub line: usize,
}

impl<'a> Cell<'a> {
    pub fn as_str(&self) -> &'a str {
        self.raw
    }

    pub fn as_int(&self) -> Result<i64, CellParseError> {
        self.raw
            .trim()
            .parse::<i64>()
            .map_err(|_| self.parse_error(ColumnType::Int))
    }

    pub fn as_float(&self) -> Result<f64, CellParseError> {
        self.raw
            .trim()
            .parse::<f64>()
            .map_err(|_| self.parse_error(ColumnType::Float))
    }

    fn parse_error(&self, expected: ColumnType) -> CellParseError {
        CellParseError {
            line: self.line,
            column: self.column.to_string(),
            value: self.raw.to_string(),
            expected,
        }
    }
}

/// `bool` compares raw text, `int` allows `floor(threshold)`, `float` allows
/// `threshold`. Both bounds are inclusive.
pub fn values_match(
    column_type: ColumnType,
    ground_truth: Cell<'_>,
    result: Cell<'_>,
    threshold: f64,
) -> Result<bool, CellParseError> {
    match column_type {
        ColumnType::Bool => Ok(ground_truth.as_str() == result.as_str()),
        ColumnType::Int => {
            let delta = i128::from(ground_truth.as_int()?) - i128::from(result.as_int()?);
            Ok(delta.abs() <= threshold.floor() as i128)
        }
        ColumnType::Float => {
            let delta = ground_truth.as_float()? - result.as_float()?;
            Ok(delta.abs() <= threshold)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Cell, ColumnType, values_match};

    fn cell(raw: &str) -> Cell<'_> {
        Cell {
            column: "value",
            raw,
            line: 2,
        }
    }

    #[test]
    fn unknown_tags_fall_back_to_float() {
        assert_eq!(ColumnType::from_tag("bool"), ColumnType::Bool);
        assert_eq!(ColumnType::from_tag("int"), ColumnType::Int);
        assert_eq!(ColumnType::from_tag("double"), ColumnType::Float);
        let parsed: ColumnType = serde_json::from_str("\"Bool\"").expect("tag should parse");
        assert_eq!(parsed, ColumnType::Float);
    }

    #[test]
    fn bool_compares_exact_text() {
        assert!(values_match(ColumnType::Bool, cell("true"), cell("true"), 0.0).unwrap());
        assert!(!values_match(ColumnType::Bool, cell("true"), cell("True"), 10.0).unwrap());
    }

    #[test]
    fn int_threshold_is_floored() {
        assert!(values_match(ColumnType::Int, cell("10"), cell("12"), 2.9).unwrap());
        assert!(!values_match(ColumnType::Int, cell("10"), cell("13"), 2.9).unwrap());
        assert!(!values_match(ColumnType::Int, cell("10"), cell("11"), 0.5).unwrap());
    }

    #[test]
    fn float_threshold_is_inclusive() {
        assert!(values_match(ColumnType::Float, cell("0.50"), cell("0.65"), 0.2).unwrap());
        assert!(!values_match(ColumnType::Float, cell("0.50"), cell("0.65"), 0.1).unwrap());
        assert!(values_match(ColumnType::Float, cell(" 1.5 "), cell("1.5"), 0.0).unwrap());
    }

    #[test]
    fn non_numeric_cells_are_typed_errors() {
        let error = values_match(ColumnType::Float, cell("0.5"), cell("n/a"), 0.1)
            .expect_err("parse should fail");
        assert_eq!(error.value, "n/a");
        assert_eq!(error.expected, ColumnType::Float);
        assert_eq!(
            error.to_string(),
            "line 2, column 'value': 'n/a' is not a valid float"
        );

        let error = values_match(ColumnType::Int, cell("3.7"), cell("3"), 1.0)
            .expect_err("int parse should fail");
        assert_eq!(error.expected, ColumnType::Int);
    }
}
