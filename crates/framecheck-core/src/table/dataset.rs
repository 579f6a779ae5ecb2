use super::column::Cell;
use crate::batch::Locator;
use crate::domain::{CheckError, FrameNumber};
use crate::indexer::{DuplicatePolicy, FrameIndex};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub line: usize,
    cells: Vec<String>,
}

/// Position of a parsed row inside its dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLocator {
    pub row: usize,
    pub line: usize,
}

impl Locator for RowLocator {
    fn describe(&self) -> String {
        format!("line {}", self.line)
    }
}

/// A row viewed through its dataset header.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    headers: &'a [String],
    row: &'a Row,
}

impl<'a> RowRef<'a> {
    pub fn line(&self) -> usize {
        self.row.line
    }

    pub fn cell(&self, column: &str) -> Option<Cell<'a>> {
        let position = self.headers.iter().position(|header| header == column)?;
        Some(Cell {
            column: self.headers[position].as_str(),
            raw: self.row.cells[position].as_str(),
            line: self.row.line,
        })
    }
}

/// One comma-separated file indexed by its frame column.
///
/// No quoting is supported; every comma is a delimiter. Trailing empty
/// fields are ignored in the header and beyond the header width in rows.
/// Rows whose field count differs from the header, that leave any column
/// blank, or whose frame cell is not an integer are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    source: PathBuf,
    headers: Vec<String>,
    rows: Vec<Row>,
    index: FrameIndex<RowLocator>,
    dropped_lines: Vec<usize>,
}

impl Dataset {
    pub fn from_path(
        path: &Path,
        frame_column: &str,
        policy: DuplicatePolicy,
    ) -> Result<Self, TableError> {
        let content = fs::read_to_string(path).map_err(|source| TableError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content, frame_column, policy)
    }

    pub fn parse(
        source: &Path,
        content: &str,
        frame_column: &str,
        policy: DuplicatePolicy,
    ) -> Result<Self, TableError> {
        let mut lines = content.lines().enumerate();
        let Some((_, header_line)) = lines.next() else {
            return Err(TableError::EmptyFile {
                path: source.to_path_buf(),
            });
        };

        let mut headers = split_fields(header_line);
        while headers.last().is_some_and(|header| header.trim().is_empty()) {
            headers.pop();
        }
        let frame_position = headers
            .iter()
            .position(|header| header == frame_column)
            .ok_or_else(|| TableError::MissingFrameColumn {
                path: source.to_path_buf(),
                column: frame_column.to_string(),
            })?;

        let mut rows = Vec::new();
        let mut index = FrameIndex::new();
        let mut dropped_lines = Vec::new();
        for (line_index, raw_line) in lines {
            let line = line_index + 1;
            let mut cells = split_fields(raw_line);
            while cells.len() > headers.len()
                && cells.last().is_some_and(|cell| cell.trim().is_empty())
            {
                cells.pop();
            }
            if cells.len() != headers.len() || cells.iter().any(|cell| cell.trim().is_empty()) {
                dropped_lines.push(line);
                continue;
            }
            let Ok(frame) = cells[frame_position].trim().parse::<FrameNumber>() else {
                dropped_lines.push(line);
                continue;
            };

            let locator = RowLocator {
                row: rows.len(),
                line,
            };
            index
                .insert(frame, locator, policy)
                .map_err(|frame| TableError::DuplicateFrame {
                    path: source.to_path_buf(),
                    frame,
                })?;
            rows.push(Row { line, cells });
        }

        Ok(Self {
            source: source.to_path_buf(),
            headers,
            rows,
            index,
            dropped_lines,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn index(&self) -> &FrameIndex<RowLocator> {
        &self.index
    }

    pub fn dropped_lines(&self) -> &[usize] {
        &self.dropped_lines
    }

    /// Number of indexed frames; superseded duplicates are not counted.
    pub fn frame_count(&self) -> usize {
        self.index.len()
    }

    pub fn row(&self, frame: FrameNumber) -> Option<RowRef<'_>> {
        let locator = self.index.get(frame)?;
        self.row_at(*locator)
    }

    pub fn row_at(&self, locator: RowLocator) -> Option<RowRef<'_>> {
        self.rows.get(locator.row).map(|row| RowRef {
            headers: &self.headers,
            row,
        })
    }
}

fn split_fields(line: &str) -> Vec<String> {
    line.split(',').map(str::to_string).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to open table '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("table '{}' has no header line", path.display())]
    EmptyFile { path: PathBuf },
    #[error("table '{}' has no column named '{column}'", path.display())]
    MissingFrameColumn { path: PathBuf, column: String },
    #[error("frame {frame} appears more than once in '{}'", path.display())]
    DuplicateFrame { path: PathBuf, frame: FrameNumber },
}

impl From<TableError> for CheckError {
    fn from(error: TableError) -> Self {
        let message = error.to_string();
        match error {
            TableError::Open { .. } => CheckError::io("IO.TABLE_OPEN", message),
            TableError::EmptyFile { .. } | TableError::MissingFrameColumn { .. } => {
                CheckError::invalid_input("INPUT.TABLE_HEADER", message)
            }
            TableError::DuplicateFrame { .. } => {
                CheckError::invalid_input("INPUT.DUPLICATE_FRAME", message)
            }
        }
    }
}
