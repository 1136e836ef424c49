//! Core editor types: selection, revisions, and edit tracking.
//!
//! These types are surface-agnostic and shared by the document, the
//! formatting layer and the synchronizer.

use std::fmt;
use std::ops::Range;

use web_time::Instant;

/// How many chars from a line start count as the marker zone.
///
/// Edits in this zone can create, break or duplicate a line marker, so the
/// session re-normalizes the affected line after them.
pub const MARKER_ZONE: usize = 6;

/// Text selection with anchor and head positions.
///
/// The anchor is where the selection started, the head is where the cursor is now.
/// They may be in any order - use `start()` and `end()` for ordered bounds.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    /// Where selection started
    pub anchor: usize,
    /// Where cursor is now
    pub head: usize,
}

impl Selection {
    /// Create a new selection.
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Create a collapsed selection (cursor position).
    pub fn collapsed(offset: usize) -> Self {
        Self {
            anchor: offset,
            head: offset,
        }
    }

    /// Get the start (lower bound) of the selection.
    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Get the end (upper bound) of the selection.
    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Check if the selection is collapsed (empty, cursor only).
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Get the selection length.
    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    /// Check if empty (same as is_collapsed).
    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }

    /// Convert to a Range<usize> (ordered).
    pub fn to_range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    /// Clamp both ends into `[0, len]`, keeping direction.
    pub fn clamped(&self, len: usize) -> Self {
        Self {
            anchor: self.anchor.min(len),
            head: self.head.min(len),
        }
    }
}

impl From<Range<usize>> for Selection {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Monotonic document revision. Bumped on every mutation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(pub u64);

impl Revision {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Information about the most recent edit.
///
/// The session uses this to decide whether a line needs marker normalization,
/// and observers use it to decide whether an edit touched line structure.
#[derive(Clone, Debug)]
pub struct EditInfo {
    /// Character offset where the edit occurred
    pub edit_char_pos: usize,
    /// Number of characters inserted
    pub inserted_len: usize,
    /// Number of characters deleted
    pub deleted_len: usize,
    /// Whether the inserted or deleted text contains a newline
    pub contains_newline: bool,
    /// Whether the edit starts within [`MARKER_ZONE`] chars of its line start.
    pub in_marker_zone: bool,
    /// Document length (in chars) after this edit was applied.
    pub doc_len_after: usize,
    /// When this edit occurred. Used to coalesce typing into undo steps.
    pub timestamp: Instant,
}

impl PartialEq for EditInfo {
    fn eq(&self, other: &Self) -> bool {
        // Compare all fields except timestamp (not meaningful for equality)
        self.edit_char_pos == other.edit_char_pos
            && self.inserted_len == other.inserted_len
            && self.deleted_len == other.deleted_len
            && self.contains_newline == other.contains_newline
            && self.in_marker_zone == other.in_marker_zone
            && self.doc_len_after == other.doc_len_after
    }
}

impl Eq for EditInfo {}

impl EditInfo {
    /// Map an offset that was valid before this edit to its position after it.
    ///
    /// Offsets inside the replaced range collapse to the end of the inserted text.
    /// An offset sitting exactly at a pure insertion moves past it.
    pub fn map_offset(&self, offset: usize) -> usize {
        let start = self.edit_char_pos;
        let end = start + self.deleted_len;
        if offset < start || (offset == start && self.deleted_len > 0) {
            offset
        } else if offset >= end {
            offset - self.deleted_len + self.inserted_len
        } else {
            start + self.inserted_len
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(pos: usize, inserted: usize, deleted: usize) -> EditInfo {
        EditInfo {
            edit_char_pos: pos,
            inserted_len: inserted,
            deleted_len: deleted,
            contains_newline: false,
            in_marker_zone: false,
            doc_len_after: 0,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn test_selection_bounds() {
        let sel = Selection::new(7, 3);
        assert_eq!(sel.start(), 3);
        assert_eq!(sel.end(), 7);
        assert_eq!(sel.to_range(), 3..7);
        assert!(!sel.is_collapsed());
        assert_eq!(sel.clamped(5), Selection::new(5, 3));
    }

    #[test]
    fn test_map_offset() {
        // replace 2..5 with 1 char
        let edit = info(2, 1, 3);
        assert_eq!(edit.map_offset(1), 1);
        assert_eq!(edit.map_offset(2), 2);
        assert_eq!(edit.map_offset(4), 3);
        assert_eq!(edit.map_offset(5), 3);
        assert_eq!(edit.map_offset(9), 7);

        // pure insertion at the cursor pushes it forward
        let insert = info(2, 3, 0);
        assert_eq!(insert.map_offset(2), 5);
        assert_eq!(insert.map_offset(1), 1);
    }
}
