//! Flattened text index over a styled document.
//!
//! `TextIndex` mirrors the document's segments as plain text (attachments
//! flatten to U+FFFC) in a rope, so line and char queries stay O(log n)
//! while the segment list stays the source of truth.

use std::ops::Range;

use smol_str::{SmolStr, ToSmolStr};
use unicode_segmentation::UnicodeSegmentation;

use crate::types::MARKER_ZONE;

/// Ropey-backed flattened text.
///
/// All offsets are in Unicode scalar values (chars), not bytes or UTF-16.
#[derive(Clone, Debug, Default)]
pub struct TextIndex {
    rope: ropey::Rope,
}

impl TextIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_str(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }

    /// Get a reference to the underlying rope.
    pub fn rope(&self) -> &ropey::Rope {
        &self.rope
    }

    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Replace a char range. Caller validates the range.
    pub(crate) fn replace(&mut self, char_range: Range<usize>, text: &str) {
        if !char_range.is_empty() {
            self.rope.remove(char_range.clone());
        }
        if !text.is_empty() {
            self.rope.insert(char_range.start, text);
        }
    }

    /// Get a slice as SmolStr. Returns None if range is invalid.
    pub fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        if char_range.start > char_range.end || char_range.end > self.len_chars() {
            return None;
        }
        Some(self.rope.slice(char_range).to_smolstr())
    }

    /// Get character at offset. Returns None if out of bounds.
    pub fn char_at(&self, char_offset: usize) -> Option<char> {
        if char_offset >= self.len_chars() {
            return None;
        }
        Some(self.rope.char(char_offset))
    }

    pub fn to_string(&self) -> String {
        self.rope.to_string()
    }

    /// Start and end (excluding the `\n`) of the line containing `offset`.
    ///
    /// `offset` must be `<= len_chars()`.
    pub fn line_bounds(&self, offset: usize) -> Range<usize> {
        let line_idx = self.rope.char_to_line(offset);
        let start = self.rope.line_to_char(line_idx);
        let line = self.rope.line(line_idx);
        let mut end = start + line.len_chars();
        if end > start && self.rope.char(end - 1) == '\n' {
            end -= 1;
        }
        start..end
    }

    /// Check if a char offset is in the marker zone (first few chars of a line).
    pub fn is_in_marker_zone(&self, offset: usize) -> bool {
        if offset > self.len_chars() {
            return false;
        }
        let line_start = self.line_bounds(offset).start;
        (offset - line_start) <= MARKER_ZONE
    }

    /// Whether `offset` sits on a grapheme cluster boundary.
    ///
    /// Clusters never span a `\n`, so only the containing line is segmented.
    pub fn is_grapheme_boundary(&self, offset: usize) -> bool {
        let len = self.len_chars();
        if offset == 0 || offset >= len {
            return offset <= len;
        }
        let line_idx = self.rope.char_to_line(offset);
        let line_start = self.rope.line_to_char(line_idx);
        if offset == line_start {
            return true;
        }
        let line = self.rope.line(line_idx).to_string();
        let target = char_to_byte(&line, offset - line_start);
        line.grapheme_indices(true).any(|(byte, _)| byte == target)
    }

    /// Nearest grapheme boundary at or before `offset`.
    pub fn prev_grapheme_boundary(&self, offset: usize) -> usize {
        let mut pos = offset.min(self.len_chars());
        while !self.is_grapheme_boundary(pos) {
            pos -= 1;
        }
        pos
    }

    /// Nearest grapheme boundary at or after `offset`.
    pub fn next_grapheme_boundary(&self, offset: usize) -> usize {
        let len = self.len_chars();
        let mut pos = offset.min(len);
        while !self.is_grapheme_boundary(pos) {
            pos += 1;
        }
        pos
    }
}

pub(crate) fn char_to_byte(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let mut text = TextIndex::from_str("hello world");
        assert_eq!(text.len_chars(), 11);

        text.replace(5..5, " beautiful");
        assert_eq!(text.to_string(), "hello beautiful world");

        text.replace(5..15, "");
        assert_eq!(text.to_string(), "hello world");
        assert_eq!(text.slice(6..11).as_deref(), Some("world"));
        assert_eq!(text.slice(0..100), None);
        assert_eq!(text.char_at(11), None);
    }

    #[test]
    fn test_line_bounds() {
        let text = TextIndex::from_str("ab\ncd\n");
        assert_eq!(text.line_bounds(0), 0..2);
        assert_eq!(text.line_bounds(2), 0..2);
        assert_eq!(text.line_bounds(3), 3..5);
        assert_eq!(text.line_bounds(6), 6..6);
    }

    #[test]
    fn test_grapheme_boundaries() {
        // e + combining acute, then a flag (two regional indicators)
        let text = TextIndex::from_str("e\u{301}x\u{1F1EB}\u{1F1F7}");
        assert!(text.is_grapheme_boundary(0));
        assert!(!text.is_grapheme_boundary(1));
        assert!(text.is_grapheme_boundary(2));
        assert!(text.is_grapheme_boundary(3));
        assert!(!text.is_grapheme_boundary(4));
        assert!(text.is_grapheme_boundary(5));
        assert_eq!(text.prev_grapheme_boundary(4), 3);
        assert_eq!(text.next_grapheme_boundary(4), 5);
    }

    #[test]
    fn test_marker_zone() {
        let text = TextIndex::from_str("short\nthis line is long");
        assert!(text.is_in_marker_zone(3));
        assert!(text.is_in_marker_zone(8));
        assert!(!text.is_in_marker_zone(20));
    }
}
