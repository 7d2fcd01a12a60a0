//! Snapshot-based undo/redo for the drawings layer
//!
//! Every stroke commit or successful erase records a full copy of the
//! drawings array. Only the ink layer participates; notes, texts and
//! highlights have no history.

use tracing::debug;

use crate::annotation::Drawing;

/// Whole-layer drawing history with a cursor
#[derive(Debug, Clone, Default)]
pub struct UndoRedoStack {
    snapshots: Vec<Vec<Drawing>>,
    /// Index of the snapshot currently shown; `None` when history is empty
    cursor: Option<usize>,
    /// Maximum retained snapshots (oldest dropped first)
    limit: Option<usize>,
}

impl UndoRedoStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: Option<usize>) -> Self {
        Self { limit: limit.map(|l| l.max(2)), ..Self::default() }
    }

    /// Record the layer after a commit or erase
    ///
    /// `before` is the layer as it was prior to the change. It seeds the
    /// history when the history is empty, so the first change of a session
    /// can be undone too. Any redo entries beyond the cursor are discarded.
    pub fn record(&mut self, before: &[Drawing], after: Vec<Drawing>) {
        match self.cursor {
            None => {
                self.snapshots.clear();
                self.snapshots.push(before.to_vec());
            }
            Some(cursor) => self.snapshots.truncate(cursor + 1),
        }
        self.snapshots.push(after);

        if let Some(limit) = self.limit {
            let excess = self.snapshots.len().saturating_sub(limit);
            self.snapshots.drain(..excess);
        }
        self.cursor = Some(self.snapshots.len() - 1);
        debug!(cursor = ?self.cursor, depth = self.snapshots.len(), "drawing snapshot recorded");
    }

    /// Step back one snapshot, returning the layer to restore
    pub fn undo(&mut self) -> Option<&[Drawing]> {
        let cursor = self.cursor.filter(|&c| c > 0)? - 1;
        self.cursor = Some(cursor);
        debug!(cursor, "undo");
        self.snapshots.get(cursor).map(Vec::as_slice)
    }

    /// Step forward one snapshot, returning the layer to restore
    pub fn redo(&mut self) -> Option<&[Drawing]> {
        let cursor = self.cursor? + 1;
        if cursor >= self.snapshots.len() {
            return None;
        }
        self.cursor = Some(cursor);
        debug!(cursor, "redo");
        self.snapshots.get(cursor).map(Vec::as_slice)
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(c) if c > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(c) if c + 1 < self.snapshots.len())
    }

    /// Drop all history (cursor back to "before the beginning")
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.cursor = None;
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
