//! The styled document: an ordered list of text runs and attachment refs.
//!
//! `StyledDocument` is the single source of truth for note content. Text runs
//! carry a [`StyleSet`]; attachments reference widgets owned by the
//! [`AttachmentRegistry`](crate::attachment::AttachmentRegistry) and occupy
//! exactly one offset each. A [`TextIndex`] mirrors the flattened text so line
//! and char queries do not walk the segment list.
//!
//! Every mutation validates its range (bounds, direction, grapheme clusters),
//! coalesces adjacent runs with identical style, and bumps the [`Revision`].

use std::ops::Range;

use smol_str::SmolStr;
use web_time::Instant;

use crate::attachment::{AttachmentId, AttachmentKind};
use crate::error::RangeError;
use crate::style::StyleSet;
use crate::text::{TextIndex, char_to_byte};
use crate::types::{EditInfo, Revision, Selection};

/// Placeholder char an attachment flattens to in the text index.
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

/// A run of text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub style: StyleSet,
}

impl TextRun {
    pub fn new(text: impl Into<String>, style: StyleSet) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Reference from the document to a registry widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentRef {
    pub id: AttachmentId,
    pub kind: AttachmentKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(TextRun),
    Attachment(AttachmentRef),
}

impl Segment {
    pub fn text(text: impl Into<String>, style: StyleSet) -> Self {
        Segment::Text(TextRun::new(text, style))
    }

    /// Length in chars. Attachments always occupy one offset.
    pub fn len(&self) -> usize {
        match self {
            Segment::Text(run) => run.len(),
            Segment::Attachment(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push_flattened(&self, out: &mut String) {
        match self {
            Segment::Text(run) => out.push_str(&run.text),
            Segment::Attachment(_) => out.push(OBJECT_REPLACEMENT),
        }
    }
}

/// Replacement content for [`StyledDocument::replace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Empty,
    Text { text: String, style: StyleSet },
    Attachment(AttachmentRef),
}

impl Content {
    pub fn text(text: impl Into<String>, style: StyleSet) -> Self {
        Content::Text {
            text: text.into(),
            style,
        }
    }

    /// Length in chars once inserted.
    pub fn len(&self) -> usize {
        match self {
            Content::Empty => 0,
            Content::Text { text, .. } => text.chars().filter(|c| *c != OBJECT_REPLACEMENT).count(),
            Content::Attachment(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Strip stray placeholder chars so text can never masquerade as an attachment.
    fn sanitized(self) -> Self {
        match self {
            Content::Text { text, style } => {
                let text = if text.contains(OBJECT_REPLACEMENT) {
                    text.replace(OBJECT_REPLACEMENT, "")
                } else {
                    text
                };
                if text.is_empty() {
                    Content::Empty
                } else {
                    Content::Text { text, style }
                }
            }
            other => other,
        }
    }

    fn into_segment(self) -> Option<Segment> {
        match self {
            Content::Empty => None,
            Content::Text { text, style } => Some(Segment::Text(TextRun { text, style })),
            Content::Attachment(r) => Some(Segment::Attachment(r)),
        }
    }
}

/// Result of a successful [`StyledDocument::replace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub edit: EditInfo,
    /// Attachment refs the replaced range contained. The caller decides
    /// whether their widgets can be released.
    pub removed: Vec<AttachmentRef>,
}

/// A view of the document restricted to a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece<'a> {
    Text {
        range: Range<usize>,
        text: &'a str,
        style: StyleSet,
    },
    Attachment {
        offset: usize,
        attachment: AttachmentRef,
    },
}

#[derive(Debug, Clone, Default)]
pub struct StyledDocument {
    segments: Vec<Segment>,
    text: TextIndex,
    selection: Selection,
    revision: Revision,
    last_edit: Option<EditInfo>,
}

impl StyledDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single unstyled run.
    pub fn plain(text: &str) -> Self {
        Self::from_segments(vec![Segment::text(text, StyleSet::PLAIN)])
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        let segments = segments
            .into_iter()
            .map(|segment| match segment {
                Segment::Text(run) if run.text.contains(OBJECT_REPLACEMENT) => Segment::Text(
                    TextRun::new(run.text.replace(OBJECT_REPLACEMENT, ""), run.style),
                ),
                other => other,
            })
            .collect();
        let mut doc = Self {
            segments,
            ..Self::default()
        };
        doc.coalesce();
        doc.rebuild_index();
        doc
    }

    fn rebuild_index(&mut self) {
        let mut flat = String::new();
        for segment in &self.segments {
            segment.push_flattened(&mut flat);
        }
        self.text = TextIndex::from_str(&flat);
    }

    // === Queries ===

    /// Length in chars, attachments counting one each.
    pub fn len(&self) -> usize {
        self.text.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Flattened text with attachments as U+FFFC.
    pub fn text(&self) -> String {
        self.text.to_string()
    }

    pub fn text_index(&self) -> &TextIndex {
        &self.text
    }

    pub fn slice(&self, range: Range<usize>) -> Result<SmolStr, RangeError> {
        self.check_bounds(&range)?;
        Ok(self.text.slice(range).unwrap_or_default())
    }

    pub fn char_at(&self, offset: usize) -> Option<char> {
        self.text.char_at(offset)
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Set the selection. Both ends must lie within `[0, len]`.
    pub fn set_selection(&mut self, selection: Selection) -> Result<(), RangeError> {
        let len = self.len();
        if selection.anchor > len || selection.head > len {
            return Err(RangeError::OutOfBounds {
                start: selection.start(),
                end: selection.end(),
                len,
            });
        }
        self.selection = selection;
        Ok(())
    }

    pub fn last_edit(&self) -> Option<&EditInfo> {
        self.last_edit.as_ref()
    }

    /// Bump the revision without touching content, e.g. after widget state changes.
    pub fn touch(&mut self) {
        self.revision = self.revision.next();
    }

    /// Whether both documents hold the same segments.
    pub fn same_content(&self, other: &StyledDocument) -> bool {
        self.segments == other.segments
    }

    /// Style of the char at `offset`.
    ///
    /// At `offset == len` the preceding char answers. Attachments and the
    /// empty document report the plain style.
    pub fn style_attributes(&self, offset: usize) -> Result<StyleSet, RangeError> {
        let len = self.len();
        if offset > len {
            return Err(RangeError::OutOfBounds {
                start: offset,
                end: offset,
                len,
            });
        }
        if len == 0 {
            return Ok(StyleSet::PLAIN);
        }
        let at = if offset == len { offset - 1 } else { offset };
        Ok(self.char_style(at).unwrap_or_default())
    }

    /// Style of the text char at `offset`, `None` for attachments or out of range.
    pub fn char_style(&self, offset: usize) -> Option<StyleSet> {
        let (idx, _) = self.locate(offset)?;
        match &self.segments[idx] {
            Segment::Text(run) => Some(run.style),
            Segment::Attachment(_) => None,
        }
    }

    /// Range of the line containing `offset`, excluding its `\n`.
    pub fn line_range(&self, offset: usize) -> Result<Range<usize>, RangeError> {
        let len = self.len();
        if offset > len {
            return Err(RangeError::OutOfBounds {
                start: offset,
                end: offset,
                len,
            });
        }
        Ok(self.text.line_bounds(offset))
    }

    /// Attachment refs in document order with their offsets.
    pub fn attachments(&self) -> impl Iterator<Item = (usize, AttachmentRef)> + '_ {
        self.segments
            .iter()
            .scan(0usize, |pos, segment| {
                let start = *pos;
                *pos += segment.len();
                Some((start, segment))
            })
            .filter_map(|(start, segment)| match segment {
                Segment::Attachment(r) => Some((start, *r)),
                Segment::Text(_) => None,
            })
    }

    pub fn attachment_at(&self, offset: usize) -> Option<AttachmentRef> {
        if self.char_at(offset) != Some(OBJECT_REPLACEMENT) {
            return None;
        }
        let (idx, _) = self.locate(offset)?;
        match &self.segments[idx] {
            Segment::Attachment(r) => Some(*r),
            Segment::Text(_) => None,
        }
    }

    pub fn offset_of(&self, id: AttachmentId) -> Option<usize> {
        self.attachments()
            .find(|(_, r)| r.id == id)
            .map(|(offset, _)| offset)
    }

    /// Text and attachment pieces overlapping `range`, clipped to it.
    pub fn pieces(&self, range: Range<usize>) -> Result<Vec<Piece<'_>>, RangeError> {
        self.check_bounds(&range)?;
        let mut out = Vec::new();
        let mut pos = 0;
        for segment in &self.segments {
            let len = segment.len();
            let seg_range = pos..pos + len;
            pos += len;
            if seg_range.end <= range.start {
                continue;
            }
            if seg_range.start >= range.end {
                break;
            }
            match segment {
                Segment::Text(run) => {
                    let from = range.start.max(seg_range.start);
                    let to = range.end.min(seg_range.end);
                    let bytes = char_to_byte(&run.text, from - seg_range.start)
                        ..char_to_byte(&run.text, to - seg_range.start);
                    out.push(Piece::Text {
                        range: from..to,
                        text: &run.text[bytes],
                        style: run.style,
                    });
                }
                Segment::Attachment(r) => out.push(Piece::Attachment {
                    offset: seg_range.start,
                    attachment: *r,
                }),
            }
        }
        Ok(out)
    }

    // === Validation ===

    fn check_bounds(&self, range: &Range<usize>) -> Result<(), RangeError> {
        if range.start > range.end {
            return Err(RangeError::Inverted {
                start: range.start,
                end: range.end,
            });
        }
        let len = self.len();
        if range.end > len {
            return Err(RangeError::OutOfBounds {
                start: range.start,
                end: range.end,
                len,
            });
        }
        Ok(())
    }

    /// Bounds, direction and grapheme checks every mutation runs first.
    pub fn check_range(&self, range: &Range<usize>) -> Result<(), RangeError> {
        self.check_bounds(range)?;
        for offset in [range.start, range.end] {
            if !self.text.is_grapheme_boundary(offset) {
                return Err(RangeError::SplitsGrapheme { offset });
            }
        }
        Ok(())
    }

    pub fn is_grapheme_boundary(&self, offset: usize) -> bool {
        self.text.is_grapheme_boundary(offset)
    }

    pub fn prev_grapheme_boundary(&self, offset: usize) -> usize {
        self.text.prev_grapheme_boundary(offset)
    }

    pub fn next_grapheme_boundary(&self, offset: usize) -> usize {
        self.text.next_grapheme_boundary(offset)
    }

    // === Mutation ===

    /// Replace `range` with `content`.
    ///
    /// The selection is mapped through the edit. Attachments inside `range`
    /// are reported in the outcome; their widgets are not touched.
    pub fn replace(
        &mut self,
        range: Range<usize>,
        content: Content,
    ) -> Result<ReplaceOutcome, RangeError> {
        self.check_range(&range)?;
        let content = content.sanitized();

        let mut flat = String::new();
        match &content {
            Content::Empty => {}
            Content::Text { text, .. } => flat.push_str(text),
            Content::Attachment(_) => flat.push(OBJECT_REPLACEMENT),
        }
        let removed_text = self.text.slice(range.clone()).unwrap_or_default();
        let contains_newline = flat.contains('\n') || removed_text.contains('\n');
        let in_marker_zone = self.text.is_in_marker_zone(range.start);

        let start_idx = self.split_at(range.start);
        let end_idx = self.split_at(range.end);
        let removed: Vec<AttachmentRef> = self
            .segments
            .drain(start_idx..end_idx)
            .filter_map(|segment| match segment {
                Segment::Attachment(r) => Some(r),
                Segment::Text(_) => None,
            })
            .collect();
        if let Some(segment) = content.into_segment() {
            self.segments.insert(start_idx, segment);
        }
        self.coalesce();
        self.text.replace(range.clone(), &flat);

        let edit = EditInfo {
            edit_char_pos: range.start,
            inserted_len: flat.chars().count(),
            deleted_len: range.len(),
            contains_newline,
            in_marker_zone,
            doc_len_after: self.text.len_chars(),
            timestamp: Instant::now(),
        };
        self.selection = Selection::new(
            edit.map_offset(self.selection.anchor),
            edit.map_offset(self.selection.head),
        );
        self.revision = self.revision.next();
        self.last_edit = Some(edit.clone());

        tracing::trace!(
            start = range.start,
            end = range.end,
            inserted = edit.inserted_len,
            removed_attachments = removed.len(),
            revision = %self.revision,
            "document replace"
        );

        Ok(ReplaceOutcome { edit, removed })
    }

    /// Apply `f` to the style of every text char in `range`.
    ///
    /// Returns whether any style changed. Attachments are left alone.
    pub fn set_style(
        &mut self,
        range: Range<usize>,
        mut f: impl FnMut(&mut StyleSet),
    ) -> Result<bool, RangeError> {
        self.check_range(&range)?;
        if range.is_empty() {
            return Ok(false);
        }
        let start_idx = self.split_at(range.start);
        let end_idx = self.split_at(range.end);
        let mut changed = false;
        for segment in &mut self.segments[start_idx..end_idx] {
            if let Segment::Text(run) = segment {
                let before = run.style;
                f(&mut run.style);
                changed |= before != run.style;
            }
        }
        self.coalesce();
        if changed {
            self.revision = self.revision.next();
        }
        Ok(changed)
    }

    /// Swap in a previous state (undo/redo), keeping the revision monotonic.
    pub fn restore(&mut self, snapshot: StyledDocument) {
        let revision = self.revision.next();
        *self = snapshot;
        self.revision = revision;
        self.last_edit = None;
    }

    /// Merge adjacent runs with identical style and drop empty runs.
    pub fn coalesce(&mut self) {
        let mut out: Vec<Segment> = Vec::with_capacity(self.segments.len());
        for segment in self.segments.drain(..) {
            match segment {
                Segment::Text(run) if run.text.is_empty() => {}
                Segment::Text(run) => match out.last_mut() {
                    Some(Segment::Text(prev)) if prev.style == run.style => {
                        prev.text.push_str(&run.text)
                    }
                    _ => out.push(Segment::Text(run)),
                },
                other => out.push(other),
            }
        }
        self.segments = out;
    }

    /// Segment index and offset within it for the char at `offset`.
    fn locate(&self, offset: usize) -> Option<(usize, usize)> {
        let mut pos = 0;
        for (idx, segment) in self.segments.iter().enumerate() {
            let len = segment.len();
            if offset < pos + len {
                return Some((idx, offset - pos));
            }
            pos += len;
        }
        None
    }

    /// Ensure a segment boundary at `offset`; returns the index of the first
    /// segment starting there (or `segments.len()` at the end).
    fn split_at(&mut self, offset: usize) -> usize {
        let mut pos = 0;
        for idx in 0..self.segments.len() {
            if pos == offset {
                return idx;
            }
            let len = self.segments[idx].len();
            if offset < pos + len {
                if let Segment::Text(run) = &mut self.segments[idx] {
                    let byte = char_to_byte(&run.text, offset - pos);
                    let tail = run.text.split_off(byte);
                    let style = run.style;
                    self.segments
                        .insert(idx + 1, Segment::Text(TextRun { text: tail, style }));
                }
                return idx + 1;
            }
            pos += len;
        }
        self.segments.len()
    }
}
