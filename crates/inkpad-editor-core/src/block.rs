//! Line classification: which block format a line is in and where its marker sits.
//!
//! This is the only module that recognizes marker glyphs. Everything else asks
//! for a [`LineInfo`] and works with the untrimmed offsets it reports.

use std::ops::Range;

use crate::attachment::AttachmentKind;
use crate::document::{AttachmentRef, OBJECT_REPLACEMENT, Piece, StyledDocument};
use crate::error::RangeError;

/// Bullet glyph at the head of a bullet line.
pub const BULLET_GLYPH: char = '•';
/// Bullet glyph plus the space the autoformatter writes after it.
pub const BULLET_MARKER: &str = "• ";
/// Zero-width char that gives an otherwise empty code line something to carry
/// the `code_block` attribute.
pub const CODE_PLACEHOLDER: char = '\u{200B}';
/// Unit inserted by indent.
pub const INDENT_UNIT: &str = "\t";

/// Block-level format of a line. A line has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockFormat {
    #[default]
    None,
    BulletList,
    Checkbox,
    CodeBlock,
}

/// A leading line marker: bullet glyph or checkbox attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMarker {
    pub kind: BlockFormat,
    /// Marker plus its trailing space, when present.
    pub range: Range<usize>,
    pub attachment: Option<AttachmentRef>,
}

/// Shorthand typed at the head of a line that the autoformatter expands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerTrigger {
    /// `*` or `-`
    Bullet,
    /// `[]`
    Checkbox,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInfo {
    /// Line range excluding the terminating `\n`.
    pub range: Range<usize>,
    /// Leading spaces and tabs, in chars.
    pub indent: usize,
    pub kind: BlockFormat,
    pub marker: Option<LineMarker>,
    /// First offset after indentation and marker.
    pub content_start: usize,
    /// Whether anything other than whitespace follows the marker.
    pub has_content: bool,
}

impl LineInfo {
    pub fn indent_range(&self) -> Range<usize> {
        self.range.start..self.range.start + self.indent
    }

    /// Offset right after indentation, where a marker starts or would start.
    pub fn marker_start(&self) -> usize {
        self.range.start + self.indent
    }
}

fn is_indent(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn is_blank(c: char) -> bool {
    c.is_whitespace() || c == CODE_PLACEHOLDER
}

/// Classify the line containing `offset`.
pub fn classify_line(doc: &StyledDocument, offset: usize) -> Result<LineInfo, RangeError> {
    let range = doc.line_range(offset)?;
    let text: Vec<char> = doc.slice(range.clone())?.chars().collect();
    let indent = text.iter().take_while(|c| is_indent(**c)).count();

    let marker = marker_at(doc, range.start + indent, range.end);
    let content_start = marker
        .as_ref()
        .map(|m| m.range.end)
        .unwrap_or(range.start + indent);
    let has_content = text[content_start - range.start..]
        .iter()
        .any(|c| !is_blank(*c));

    let kind = match &marker {
        Some(m) => m.kind,
        None if is_code_line(doc, &range) => BlockFormat::CodeBlock,
        None => BlockFormat::None,
    };

    Ok(LineInfo {
        range,
        indent,
        kind,
        marker,
        content_start,
        has_content,
    })
}

/// Classify every line touched by `range`.
///
/// A non-empty range ending exactly at a line start does not include that line.
pub fn classify_range(
    doc: &StyledDocument,
    range: Range<usize>,
) -> Result<Vec<LineInfo>, RangeError> {
    let mut lines = Vec::new();
    let mut offset = range.start;
    loop {
        let info = classify_line(doc, offset)?;
        let end = info.range.end;
        lines.push(info);
        if end >= doc.len() || end + 1 >= range.end {
            break;
        }
        offset = end + 1;
    }
    Ok(lines)
}

fn marker_at(doc: &StyledDocument, at: usize, line_end: usize) -> Option<LineMarker> {
    if at >= line_end {
        return None;
    }
    let (kind, attachment) = match doc.char_at(at)? {
        BULLET_GLYPH => (BlockFormat::BulletList, None),
        OBJECT_REPLACEMENT => match doc.attachment_at(at) {
            Some(r) if r.kind == AttachmentKind::Checkbox => (BlockFormat::Checkbox, Some(r)),
            _ => return None,
        },
        _ => return None,
    };
    let mut end = at + 1;
    if end < line_end && doc.char_at(end) == Some(' ') {
        end += 1;
    }
    Some(LineMarker {
        kind,
        range: at..end,
        attachment,
    })
}

/// A line is code when it has text and every piece of it carries `code_block`.
fn is_code_line(doc: &StyledDocument, range: &Range<usize>) -> bool {
    if range.is_empty() {
        return false;
    }
    match doc.pieces(range.clone()) {
        Ok(pieces) => pieces
            .iter()
            .all(|p| matches!(p, Piece::Text { style, .. } if style.code_block)),
        Err(_) => false,
    }
}

/// All consecutive leading markers of the line's marker kind.
pub fn leading_markers(doc: &StyledDocument, line: &LineInfo) -> Vec<LineMarker> {
    let Some(first) = line.marker.clone() else {
        return Vec::new();
    };
    let kind = first.kind;
    let mut markers = vec![first];
    loop {
        let Some(last) = markers.last() else { break };
        let mut next = last.range.end;
        while next < line.range.end && doc.char_at(next).is_some_and(is_indent) {
            next += 1;
        }
        match marker_at(doc, next, line.range.end) {
            Some(m) if m.kind == kind => markers.push(m),
            _ => break,
        }
    }
    markers
}

/// Range to delete so exactly one leading marker remains, if the line has duplicates.
///
/// The first glyph and the last marker's trailing space survive.
pub fn duplicate_marker_range(doc: &StyledDocument, line: &LineInfo) -> Option<Range<usize>> {
    let markers = leading_markers(doc, line);
    match (markers.first(), markers.last()) {
        (Some(first), Some(last)) if markers.len() > 1 => {
            Some(first.range.start + 1..last.range.start + 1)
        }
        _ => None,
    }
}

/// A marker shorthand occupying the line from its indentation up to `cursor`.
pub fn pending_trigger(
    doc: &StyledDocument,
    cursor: usize,
) -> Result<Option<(MarkerTrigger, Range<usize>)>, RangeError> {
    let line = classify_line(doc, cursor)?;
    if line.kind != BlockFormat::None {
        return Ok(None);
    }
    let start = line.marker_start();
    if cursor <= start {
        return Ok(None);
    }
    let trigger = match doc.slice(start..cursor)?.as_str() {
        "*" | "-" => MarkerTrigger::Bullet,
        "[]" => MarkerTrigger::Checkbox,
        _ => return Ok(None),
    };
    Ok(Some((trigger, start..cursor)))
}

/// Range covering the run of consecutive code lines around `offset`,
/// from the first line's start to the last line's end.
pub fn code_span(doc: &StyledDocument, offset: usize) -> Result<Option<Range<usize>>, RangeError> {
    let line = classify_line(doc, offset)?;
    if line.kind != BlockFormat::CodeBlock {
        return Ok(None);
    }
    let mut start = line.range.start;
    while start > 0 {
        let prev = classify_line(doc, start - 1)?;
        if prev.kind != BlockFormat::CodeBlock {
            break;
        }
        start = prev.range.start;
    }
    let mut end = line.range.end;
    while end < doc.len() {
        let next = classify_line(doc, end + 1)?;
        if next.kind != BlockFormat::CodeBlock {
            break;
        }
        end = next.range.end;
    }
    Ok(Some(start..end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::AttachmentId;
    use crate::document::Segment;
    use crate::style::StyleSet;

    fn checkbox() -> Segment {
        Segment::Attachment(AttachmentRef {
            id: AttachmentId::new(),
            kind: AttachmentKind::Checkbox,
        })
    }

    #[test]
    fn test_classify_bullet_with_indent() {
        let doc = StyledDocument::plain("intro\n  • item");
        let line = classify_line(&doc, 9).unwrap();
        assert_eq!(line.range, 6..14);
        assert_eq!(line.indent, 2);
        assert_eq!(line.kind, BlockFormat::BulletList);
        assert_eq!(line.marker.as_ref().map(|m| m.range.clone()), Some(8..10));
        assert_eq!(line.content_start, 10);
        assert!(line.has_content);
    }

    #[test]
    fn test_classify_empty_checkbox_line() {
        let doc = StyledDocument::from_segments(vec![
            checkbox(),
            Segment::text(" ", StyleSet::PLAIN),
        ]);
        let line = classify_line(&doc, 2).unwrap();
        assert_eq!(line.kind, BlockFormat::Checkbox);
        assert_eq!(line.marker.map(|m| m.range), Some(0..2));
        assert!(!line.has_content);
    }

    #[test]
    fn test_classify_code_line() {
        let doc = StyledDocument::from_segments(vec![
            Segment::text("plain\n", StyleSet::PLAIN),
            Segment::text("let x = 1;", StyleSet::CODE),
        ]);
        assert_eq!(classify_line(&doc, 2).unwrap().kind, BlockFormat::None);
        assert_eq!(classify_line(&doc, 8).unwrap().kind, BlockFormat::CodeBlock);
        // an empty line is never code
        assert_eq!(
            classify_line(&StyledDocument::new(), 0).unwrap().kind,
            BlockFormat::None
        );
    }

    #[test]
    fn test_classify_range_lines() {
        let doc = StyledDocument::plain("a\nb\nc");
        let lines = classify_range(&doc, 0..3).unwrap();
        assert_eq!(lines.len(), 2);
        // ending right at a line start leaves that line out
        assert_eq!(classify_range(&doc, 0..2).unwrap().len(), 1);
        assert_eq!(classify_range(&doc, 1..1).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_markers() {
        let doc = StyledDocument::plain("• • foo");
        let line = classify_line(&doc, 0).unwrap();
        assert_eq!(leading_markers(&doc, &line).len(), 2);
        assert_eq!(duplicate_marker_range(&doc, &line), Some(1..3));

        let single = StyledDocument::plain("• foo • bar");
        let line = classify_line(&single, 0).unwrap();
        assert_eq!(duplicate_marker_range(&single, &line), None);
    }

    #[test]
    fn test_pending_trigger() {
        let doc = StyledDocument::plain("  *");
        assert_eq!(
            pending_trigger(&doc, 3).unwrap(),
            Some((MarkerTrigger::Bullet, 2..3))
        );
        let doc = StyledDocument::plain("[]");
        assert_eq!(
            pending_trigger(&doc, 2).unwrap(),
            Some((MarkerTrigger::Checkbox, 0..2))
        );
        let doc = StyledDocument::plain("a*");
        assert_eq!(pending_trigger(&doc, 2).unwrap(), None);
        let doc = StyledDocument::plain("• -");
        assert_eq!(pending_trigger(&doc, 3).unwrap(), None);
    }

    #[test]
    fn test_code_span_covers_adjacent_lines() {
        let doc = StyledDocument::from_segments(vec![
            Segment::text("before\n", StyleSet::PLAIN),
            Segment::text("one\ntwo", StyleSet::CODE),
            Segment::text("\nafter", StyleSet::PLAIN),
        ]);
        assert_eq!(code_span(&doc, 12).unwrap(), Some(7..14));
        assert_eq!(code_span(&doc, 2).unwrap(), None);
    }
}
