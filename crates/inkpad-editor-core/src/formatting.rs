//! Formatting state: what the toolbar shows and what its buttons do.
//!
//! [`FormattingContext`] is always derived from the document and selection,
//! never stored and mutated on its own. Toggles return [`EditPlan`]s for the
//! caller to apply.

use std::ops::Range;

use crate::actions::{IndentDirection, ProposedEdit};
use crate::attachment::AttachmentKind;
use crate::block::{
    BULLET_MARKER, BlockFormat, CODE_PLACEHOLDER, INDENT_UNIT, LineInfo, classify_line,
    classify_range,
};
use crate::document::{Piece, StyledDocument};
use crate::error::RangeError;
use crate::execute::{EditPlan, PlannedContent, StylePatch};
use crate::style::{Style, StyleSet};
use crate::types::Selection;

/// Toolbar state for the current selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormattingContext {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub block: BlockFormat,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl FormattingContext {
    pub fn is_active(&self, style: Style) -> bool {
        match style {
            Style::Bold => self.bold,
            Style::Italic => self.italic,
            Style::Underline => self.underline,
            Style::Strikethrough => self.strikethrough,
        }
    }

    pub fn with_history(mut self, can_undo: bool, can_redo: bool) -> Self {
        self.can_undo = can_undo;
        self.can_redo = can_redo;
        self
    }

    /// Override the inline flags with a pending typing style.
    pub fn with_typing_style(mut self, style: &StyleSet) -> Self {
        self.bold = style.bold;
        self.italic = style.italic;
        self.underline = style.underline;
        self.strikethrough = style.strikethrough;
        self
    }

    fn from_style(style: &StyleSet, block: BlockFormat) -> Self {
        Self {
            bold: style.bold,
            italic: style.italic,
            underline: style.underline,
            strikethrough: style.strikethrough,
            block,
            can_undo: false,
            can_redo: false,
        }
    }
}

/// Derive the toolbar state for `selection`. Out-of-range selections are clamped.
///
/// For a range, a style is active only if every text char in it has the style.
/// For a caret, the typing style at the caret answers. The block format is
/// reported only when every selected line shares it.
pub fn derive(doc: &StyledDocument, selection: Selection) -> FormattingContext {
    let range = selection.clamped(doc.len()).to_range();
    let style = if range.is_empty() {
        typing_style_at(doc, range.start)
    } else {
        common_style(doc, range.clone())
    };
    let block = match classify_range(doc, range) {
        Ok(lines) => {
            let first = lines.first().map(|l| l.kind).unwrap_or_default();
            if lines.iter().all(|l| l.kind == first) {
                first
            } else {
                BlockFormat::None
            }
        }
        Err(_) => BlockFormat::None,
    };
    FormattingContext::from_style(&style, block)
}

/// Flags shared by every text char in `range`. No text means no flags.
pub fn common_style(doc: &StyledDocument, range: Range<usize>) -> StyleSet {
    let Ok(pieces) = doc.pieces(range) else {
        return StyleSet::PLAIN;
    };
    let mut styles = pieces.iter().filter_map(|p| match p {
        Piece::Text { style, .. } => Some(*style),
        Piece::Attachment { .. } => None,
    });
    let Some(mut common) = styles.next() else {
        return StyleSet::PLAIN;
    };
    for style in styles {
        common.bold &= style.bold;
        common.italic &= style.italic;
        common.underline &= style.underline;
        common.strikethrough &= style.strikethrough;
        common.code_block &= style.code_block;
    }
    common
}

/// Style the next typed char at `offset` gets.
///
/// Taken from the preceding char, including a line break, so a new line keeps
/// the style the previous one ended with. Only offset 0 looks at the following
/// char. `code_block` follows the line's block format.
pub fn typing_style_at(doc: &StyledDocument, offset: usize) -> StyleSet {
    let offset = offset.min(doc.len());
    let neighbour = match offset {
        0 => doc.char_style(0),
        _ => doc.char_style(offset - 1),
    };
    let in_code = classify_line(doc, offset)
        .map(|line| line.kind == BlockFormat::CodeBlock)
        .unwrap_or(false);
    neighbour.unwrap_or_default().with_code_block(in_code)
}

/// Result of toggling an inline style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleToggle {
    /// Restyle the selection.
    Plan(EditPlan),
    /// Caret only: this becomes the style of the next typed char.
    Typing(StyleSet),
}

/// Toggle `style` over `selection`.
///
/// If the whole selection already has the style it is cleared everywhere,
/// otherwise it is set everywhere.
pub fn toggle_style(
    doc: &StyledDocument,
    selection: Selection,
    style: Style,
    pending_typing: Option<StyleSet>,
) -> Result<StyleToggle, RangeError> {
    let range = selection.to_range();
    if range.is_empty() {
        let current = pending_typing.unwrap_or_else(|| typing_style_at(doc, range.start));
        let on = !current.has(style);
        return Ok(StyleToggle::Typing(current.with(style, on)));
    }
    doc.check_range(&range)?;
    let active = common_style(doc, range.clone()).has(style);
    Ok(StyleToggle::Plan(
        EditPlan::new()
            .restyle(range, StylePatch::style(style, !active))
            .with_selection(selection),
    ))
}

/// Switch every line in `selection` to `format`, or back to plain if they
/// all have it already. Block formats are exclusive per line.
pub fn toggle_block_format(
    doc: &StyledDocument,
    selection: Selection,
    format: BlockFormat,
) -> Result<EditPlan, RangeError> {
    let lines = classify_range(doc, selection.to_range())?;
    let target = if lines.iter().all(|l| l.kind == format) {
        BlockFormat::None
    } else {
        format
    };
    tracing::debug!(?format, ?target, lines = lines.len(), "toggle block format");

    let mut plan = EditPlan::new();
    for line in lines.iter().rev() {
        plan = convert_line(doc, plan, line, target)?;
    }
    Ok(plan)
}

/// Ops turning one line into `target`, in descending offset order.
fn convert_line(
    doc: &StyledDocument,
    mut plan: EditPlan,
    line: &LineInfo,
    target: BlockFormat,
) -> Result<EditPlan, RangeError> {
    if line.kind == target {
        return Ok(plan);
    }

    if line.kind == BlockFormat::CodeBlock {
        plan = plan.restyle(line.range.clone(), StylePatch::code_block(false));
        let text: Vec<char> = doc.slice(line.range.clone())?.chars().collect();
        for (i, c) in text.iter().enumerate().rev() {
            if *c == CODE_PLACEHOLDER {
                let at = line.range.start + i;
                plan = plan.delete(at..at + 1);
            }
        }
    } else if target == BlockFormat::CodeBlock && line.has_content {
        plan = plan.restyle(line.range.clone(), StylePatch::code_block(true));
    }

    if let Some(marker) = &line.marker {
        plan = plan.delete(marker.range.clone());
    }

    let at = line.marker_start();
    plan = match target {
        BlockFormat::BulletList => plan.insert_text(at, BULLET_MARKER, StyleSet::PLAIN),
        BlockFormat::Checkbox => plan
            .insert_text(at, " ", StyleSet::PLAIN)
            .insert_attachment(at, AttachmentKind::Checkbox),
        BlockFormat::CodeBlock if !line.has_content => {
            plan.insert_text(at, CODE_PLACEHOLDER.to_string(), StyleSet::CODE)
        }
        BlockFormat::CodeBlock | BlockFormat::None => plan,
    };
    Ok(plan)
}

/// Indent or outdent every line in `selection`.
///
/// Outdent removes one tab, or up to four spaces.
pub fn indent_lines(
    doc: &StyledDocument,
    selection: Selection,
    direction: IndentDirection,
) -> Result<EditPlan, RangeError> {
    let lines = classify_range(doc, selection.to_range())?;
    let mut plan = EditPlan::new();
    for line in lines.iter().rev() {
        let start = line.range.start;
        match direction {
            IndentDirection::Increase => {
                let style = doc.char_style(start).unwrap_or_default();
                plan = plan.insert_text(start, INDENT_UNIT, style);
            }
            IndentDirection::Decrease => {
                let indent = doc.slice(line.indent_range())?;
                let remove = if indent.starts_with('\t') {
                    1
                } else {
                    indent.chars().take_while(|c| *c == ' ').take(4).count()
                };
                if remove > 0 {
                    plan = plan.delete(start..start + remove);
                }
            }
        }
    }
    Ok(plan)
}

/// Plan that mirrors a plain surface edit into the model with the typing style.
pub fn typed_plan(
    doc: &StyledDocument,
    edit: &ProposedEdit,
    pending_typing: Option<StyleSet>,
) -> EditPlan {
    let start = edit.range.start;
    if edit.replacement.is_empty() {
        return EditPlan::new().delete(edit.range.clone()).with_cursor(start);
    }
    let inherited = typing_style_at(doc, start);
    let style = pending_typing
        .map(|s| s.with_code_block(inherited.code_block))
        .unwrap_or(inherited);
    EditPlan::new()
        .replace(
            edit.range.clone(),
            PlannedContent::Text {
                text: edit.replacement.to_string(),
                style,
            },
        )
        .with_cursor(start + edit.replacement_len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::AttachmentRegistry;
    use crate::config::DrawingConfig;
    use crate::document::Segment;
    use crate::execute::apply_plan;

    fn bold() -> StyleSet {
        StyleSet::PLAIN.with(Style::Bold, true)
    }

    fn apply(doc: &mut StyledDocument, plan: &EditPlan) -> AttachmentRegistry {
        let mut reg = AttachmentRegistry::new(DrawingConfig::default());
        apply_plan(doc, &mut reg, plan).unwrap();
        reg
    }

    #[test]
    fn test_derive_range_requires_whole_selection() {
        let doc = StyledDocument::from_segments(vec![
            Segment::text("ab", bold()),
            Segment::text("cd", StyleSet::PLAIN),
        ]);
        assert!(derive(&doc, Selection::new(0, 2)).bold);
        assert!(!derive(&doc, Selection::new(0, 4)).bold);
    }

    #[test]
    fn test_derive_caret_uses_preceding_char() {
        let doc = StyledDocument::from_segments(vec![
            Segment::text("ab", bold()),
            Segment::text("cd", StyleSet::PLAIN),
        ]);
        assert!(derive(&doc, Selection::collapsed(2)).bold);
        assert!(!derive(&doc, Selection::collapsed(3)).bold);
        // at offset 0 the following char answers
        assert!(derive(&doc, Selection::collapsed(0)).bold);
    }

    #[test]
    fn test_line_start_takes_style_from_previous_line() {
        let doc = StyledDocument::from_segments(vec![
            Segment::text("plain\n", StyleSet::PLAIN),
            Segment::text("bold", bold()),
        ]);
        assert!(!typing_style_at(&doc, 6).bold);
        assert!(typing_style_at(&doc, 10).bold);

        let doc = StyledDocument::from_segments(vec![
            Segment::text("ab\n", bold()),
            Segment::text("cd", StyleSet::PLAIN),
        ]);
        assert!(typing_style_at(&doc, 3).bold);
        assert!(derive(&doc, Selection::collapsed(3)).bold);
    }

    #[test]
    fn test_partial_bold_toggle_makes_whole_selection_bold() {
        let mut doc = StyledDocument::from_segments(vec![
            Segment::text("He", bold()),
            Segment::text("llo", StyleSet::PLAIN),
        ]);
        let sel = Selection::new(0, 5);
        assert!(!derive(&doc, sel).bold);

        let StyleToggle::Plan(plan) = toggle_style(&doc, sel, Style::Bold, None).unwrap() else {
            panic!("range toggle should restyle");
        };
        apply(&mut doc, &plan);
        assert_eq!(doc.segments(), &[Segment::text("Hello", bold())]);
        assert!(derive(&doc, sel).bold);

        let StyleToggle::Plan(plan) = toggle_style(&doc, sel, Style::Bold, None).unwrap() else {
            panic!("range toggle should restyle");
        };
        apply(&mut doc, &plan);
        assert_eq!(doc.segments(), &[Segment::text("Hello", StyleSet::PLAIN)]);
    }

    #[test]
    fn test_caret_toggle_returns_typing_style() {
        let doc = StyledDocument::plain("abc");
        let toggled = toggle_style(&doc, Selection::collapsed(3), Style::Italic, None).unwrap();
        assert_eq!(
            toggled,
            StyleToggle::Typing(StyleSet::PLAIN.with(Style::Italic, true))
        );
    }

    #[test]
    fn test_block_formats_are_exclusive() {
        let mut doc = StyledDocument::plain("task");
        let sel = Selection::collapsed(4);
        let reg = {
            let plan = toggle_block_format(&doc, sel, BlockFormat::BulletList).unwrap();
            apply(&mut doc, &plan)
        };
        assert!(reg.is_empty());
        assert_eq!(doc.text(), "• task");
        assert_eq!(derive(&doc, doc.selection()).block, BlockFormat::BulletList);

        let plan = toggle_block_format(&doc, doc.selection(), BlockFormat::Checkbox).unwrap();
        let reg = apply(&mut doc, &plan);
        assert_eq!(doc.text(), "\u{FFFC} task");
        assert_eq!(reg.checkbox_count(), 1);
        assert_eq!(derive(&doc, doc.selection()).block, BlockFormat::Checkbox);

        let plan = toggle_block_format(&doc, doc.selection(), BlockFormat::CodeBlock).unwrap();
        apply(&mut doc, &plan);
        assert_eq!(doc.text(), "task");
        let ctx = derive(&doc, doc.selection());
        assert_eq!(ctx.block, BlockFormat::CodeBlock);

        // toggling the active format turns it off
        let plan = toggle_block_format(&doc, doc.selection(), BlockFormat::CodeBlock).unwrap();
        apply(&mut doc, &plan);
        assert_eq!(derive(&doc, doc.selection()).block, BlockFormat::None);
        assert_eq!(doc.segments(), &[Segment::text("task", StyleSet::PLAIN)]);
    }

    #[test]
    fn test_block_toggle_over_several_lines() {
        let mut doc = StyledDocument::plain("one\ntwo\nthree");
        let sel = Selection::new(0, 13);
        let plan = toggle_block_format(&doc, sel, BlockFormat::BulletList).unwrap();
        apply(&mut doc, &plan);
        assert_eq!(doc.text(), "• one\n• two\n• three");
    }

    #[test]
    fn test_indent_and_outdent() {
        let mut doc = StyledDocument::plain("a\n    b");
        let plan = indent_lines(&doc, Selection::new(0, 7), IndentDirection::Increase).unwrap();
        apply(&mut doc, &plan);
        assert_eq!(doc.text(), "\ta\n\t    b");

        let sel = Selection::new(0, doc.len());
        let plan = indent_lines(&doc, sel, IndentDirection::Decrease).unwrap();
        apply(&mut doc, &plan);
        let plan = indent_lines(&doc, Selection::new(0, doc.len()), IndentDirection::Decrease)
            .unwrap();
        apply(&mut doc, &plan);
        assert_eq!(doc.text(), "a\nb");
    }

    #[test]
    fn test_typed_text_inherits_code_block() {
        let doc = StyledDocument::from_segments(vec![Segment::text("let", StyleSet::CODE)]);
        let plan = typed_plan(&doc, &ProposedEdit::insert(3, "x"), Some(bold()));
        let mut doc = doc;
        apply(&mut doc, &plan);
        assert_eq!(doc.style_attributes(3).unwrap(), StyleSet::CODE.with(Style::Bold, true));
        assert_eq!(doc.selection(), Selection::collapsed(4));
    }
}
