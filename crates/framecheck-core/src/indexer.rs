//! Frame-number extraction and frame-indexed artifact discovery.
//!
//! Both engines align ground truth with results by an integer frame number:
//! images carry it in their file name (`<token><frame>.<ext>`), tables in a
//! designated column. [`FrameIndex`] is the ordered map shared by both.

use crate::domain::{CheckError, FrameNumber};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FramePattern {
    pub token: String,
    pub extension: String,
}

impl FramePattern {
    pub fn new(token: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            extension: extension.into(),
        }
    }

    pub fn frame_number(&self, file_name: &str) -> Option<FrameNumber> {
        extract_frame_number(file_name, &self.token, &self.extension)
    }
}

/// How an index reacts when two resources claim the same frame number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    FirstWins,
    #[default]
    LastWins,
    Reject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameIndex<T> {
    entries: BTreeMap<FrameNumber, T>,
}

impl<T> Default for FrameIndex<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> FrameIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts under `policy`. Returns `Err(frame)` only for
    /// [`DuplicatePolicy::Reject`] collisions.
    pub fn insert(
        &mut self,
        frame: FrameNumber,
        value: T,
        policy: DuplicatePolicy,
    ) -> Result<(), FrameNumber> {
        match self.entries.entry(frame) {
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
            Entry::Occupied(mut slot) => match policy {
                DuplicatePolicy::FirstWins => Ok(()),
                DuplicatePolicy::LastWins => {
                    slot.insert(value);
                    Ok(())
                }
                DuplicatePolicy::Reject => Err(frame),
            },
        }
    }

    pub fn get(&self, frame: FrameNumber) -> Option<&T> {
        self.entries.get(&frame)
    }

    pub fn contains(&self, frame: FrameNumber) -> bool {
        self.entries.contains_key(&frame)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn frames(&self) -> impl Iterator<Item = FrameNumber> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FrameNumber, &T)> {
        self.entries.iter().map(|(frame, value)| (*frame, value))
    }
}

/// Extracts the frame number from `<token><frame>.<extension>`.
///
/// Returns `None` when the prefix or suffix does not match or the middle is
/// not a base-10 integer. Leading zeros are accepted.
pub fn extract_frame_number(file_name: &str, token: &str, extension: &str) -> Option<FrameNumber> {
    let extension = extension.trim_start_matches('.');
    let rest = file_name.strip_prefix(token)?;
    let core = rest.strip_suffix(extension)?.strip_suffix('.')?;
    if core.is_empty() {
        return None;
    }
    core.parse::<FrameNumber>().ok()
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("failed to read directory '{}': {source}", path.display())]
    ReadDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("frame {frame} appears more than once in '{}'", path.display())]
    DuplicateFrame { path: PathBuf, frame: FrameNumber },
}

impl From<IndexError> for CheckError {
    fn from(error: IndexError) -> Self {
        let message = error.to_string();
        match error {
            IndexError::ReadDirectory { .. } => CheckError::io("IO.INDEX_DIRECTORY", message),
            IndexError::DuplicateFrame { .. } => {
                CheckError::invalid_input("INPUT.DUPLICATE_FRAME", message)
            }
        }
    }
}

/// Indexes the files of `directory` matching `pattern`, including symlinks
/// that resolve to regular files.
///
/// Entries are visited in file-name order so that collision handling does not
/// depend on filesystem enumeration order.
pub fn index_directory(
    directory: &Path,
    pattern: &FramePattern,
    policy: DuplicatePolicy,
) -> Result<FrameIndex<PathBuf>, IndexError> {
    let read_error = |source| IndexError::ReadDirectory {
        path: directory.to_path_buf(),
        source,
    };

    let mut candidates = Vec::new();
    for entry in fs::read_dir(directory).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        let path = entry.path();
        // Follows symlinks; dangling links are skipped.
        if !path.is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().into_owned();
        if let Some(frame) = pattern.frame_number(&file_name) {
            candidates.push((file_name, frame, path));
        }
    }
    candidates.sort_by(|left, right| left.0.cmp(&right.0));

    let mut index = FrameIndex::new();
    for (_, frame, path) in candidates {
        index
            .insert(frame, path, policy)
            .map_err(|frame| IndexError::DuplicateFrame {
                path: directory.to_path_buf(),
                frame,
            })?;
    }
    Ok(index)
}
