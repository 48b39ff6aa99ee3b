// LogMark - app/offsets.rs
//
// Per-file cursors: the running offset advanced by running-offset waits and
// the mark set explicitly by the caller. Both default to 0 and are created
// lazily on first access.

use crate::core::model::CursorKind;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct OffsetStore {
    offsets: HashMap<PathBuf, u64>,
    marks: HashMap<PathBuf, u64>,
}

impl OffsetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Running offset for `path`.
    pub fn offset(&mut self, path: &Path) -> u64 {
        *self.offsets.entry(path.to_path_buf()).or_insert(0)
    }

    pub fn update_offset(&mut self, path: &Path, offset: u64) {
        self.offsets.insert(path.to_path_buf(), offset);
    }

    /// Mark for `path`.
    pub fn mark(&mut self, path: &Path) -> u64 {
        *self.marks.entry(path.to_path_buf()).or_insert(0)
    }

    pub fn set_mark(&mut self, path: &Path, offset: u64) {
        self.marks.insert(path.to_path_buf(), offset);
    }

    /// Value of the given cursor.
    pub fn get(&mut self, path: &Path, cursor: CursorKind) -> u64 {
        match cursor {
            CursorKind::Mark => self.mark(path),
            CursorKind::RunningOffset => self.offset(path),
        }
    }

    /// Forget every offset and mark. Idempotent.
    pub fn reset(&mut self) {
        self.offsets.clear();
        self.marks.clear();
    }

    /// Number of paths with at least one cursor.
    pub fn tracked_files(&self) -> usize {
        let mut paths: Vec<&PathBuf> = self.offsets.keys().chain(self.marks.keys()).collect();
        paths.sort();
        paths.dedup();
        paths.len()
    }
}
