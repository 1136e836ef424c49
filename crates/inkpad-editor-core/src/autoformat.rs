//! Autoformatting: turning typed shorthand into line markers and keeping
//! list and code lines well formed as the user types.
//!
//! The engine only looks at the document and a proposed edit. It either lets
//! the edit through unchanged or answers with a replacement [`EditPlan`].
//! Marker recognition is delegated to [`crate::block`]; every offset in a
//! returned plan is an untrimmed document offset.

use std::ops::Range;

use crate::actions::{DeleteDirection, InputKind, ProposedEdit};
use crate::attachment::AttachmentKind;
use crate::block::{
    BULLET_MARKER, BlockFormat, CODE_PLACEHOLDER, MarkerTrigger, classify_line, code_span,
    duplicate_marker_range, pending_trigger,
};
use crate::config::AutoformatConfig;
use crate::document::StyledDocument;
use crate::error::RangeError;
use crate::execute::{EditPlan, StylePatch};
use crate::style::StyleSet;

/// What to do with a proposed edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Apply the edit as proposed.
    Allow,
    /// Apply this plan instead.
    Rewrite(EditPlan),
}

fn is_blank(c: char) -> bool {
    c.is_whitespace() || c == CODE_PLACEHOLDER
}

#[derive(Debug, Clone, Default)]
pub struct AutoformatEngine {
    config: AutoformatConfig,
}

impl AutoformatEngine {
    pub fn new(config: AutoformatConfig) -> Self {
        Self { config }
    }

    /// Decide on a surface edit before it is applied.
    pub fn propose(
        &self,
        doc: &StyledDocument,
        edit: &ProposedEdit,
    ) -> Result<Decision, RangeError> {
        doc.check_range(&edit.range)?;
        let decision = match edit.input_kind() {
            InputKind::Space => self.expand_shorthand(doc, edit.range.start)?,
            InputKind::Newline => self.break_line(doc, edit.range.start)?,
            InputKind::Delete => self.delete_marker(doc, edit.range.clone(), edit.direction)?,
            _ => Decision::Allow,
        };
        if let Decision::Rewrite(plan) = &decision {
            tracing::debug!(
                start = edit.range.start,
                end = edit.range.end,
                replacement = %edit.replacement,
                ops = plan.ops.len(),
                "autoformat rewrite"
            );
        }
        Ok(decision)
    }

    /// `*`/`-` then space becomes a bullet; `[]` then space becomes a checkbox.
    fn expand_shorthand(&self, doc: &StyledDocument, cursor: usize) -> Result<Decision, RangeError> {
        let Some((trigger, range)) = pending_trigger(doc, cursor)? else {
            return Ok(Decision::Allow);
        };
        let start = range.start;
        let plan = match trigger {
            MarkerTrigger::Bullet if self.config.bullets => EditPlan::new()
                .delete(range)
                .insert_text(start, BULLET_MARKER, StyleSet::PLAIN),
            MarkerTrigger::Checkbox if self.config.checkboxes => EditPlan::new()
                .delete(range)
                .insert_text(start, " ", StyleSet::PLAIN)
                .insert_attachment(start, AttachmentKind::Checkbox),
            _ => return Ok(Decision::Allow),
        };
        Ok(Decision::Rewrite(plan.with_cursor(start + 2)))
    }

    /// Enter on a marker or code line.
    fn break_line(&self, doc: &StyledDocument, cursor: usize) -> Result<Decision, RangeError> {
        let line = classify_line(doc, cursor)?;
        match line.kind {
            BlockFormat::BulletList | BlockFormat::Checkbox => {
                let Some(marker) = &line.marker else {
                    return Ok(Decision::Allow);
                };
                if cursor < line.content_start {
                    return Ok(Decision::Allow);
                }
                if !line.has_content {
                    // empty item ends the list
                    let plan = EditPlan::new()
                        .delete(marker.range.clone())
                        .with_cursor(marker.range.start);
                    return Ok(Decision::Rewrite(plan));
                }
                let indent = doc.slice(line.indent_range())?;
                let prefix_len = 1 + indent.chars().count();
                let mut head = String::with_capacity(prefix_len + BULLET_MARKER.len());
                head.push('\n');
                head.push_str(&indent);
                let plan = if line.kind == BlockFormat::BulletList {
                    head.push_str(BULLET_MARKER);
                    EditPlan::new().insert_text(cursor, head, StyleSet::PLAIN)
                } else {
                    let marker_at = cursor + prefix_len;
                    EditPlan::new()
                        .insert_text(cursor, head, StyleSet::PLAIN)
                        .insert_text(marker_at, " ", StyleSet::PLAIN)
                        .insert_attachment(marker_at, AttachmentKind::Checkbox)
                };
                Ok(Decision::Rewrite(plan.with_cursor(cursor + prefix_len + 2)))
            }
            BlockFormat::CodeBlock if self.config.code_blocks => {
                if !line.has_content {
                    // Enter on an empty code line leaves the block
                    let plan = EditPlan::new()
                        .delete(line.range.clone())
                        .with_cursor(line.range.start);
                    return Ok(Decision::Rewrite(plan));
                }
                let rest_blank = doc
                    .slice(cursor..line.range.end)?
                    .chars()
                    .all(is_blank);
                let mut text = String::from("\n");
                if rest_blank {
                    text.push(CODE_PLACEHOLDER);
                }
                let len = text.chars().count();
                let plan = EditPlan::new()
                    .insert_text(cursor, text, StyleSet::CODE)
                    .with_cursor(cursor + len);
                Ok(Decision::Rewrite(plan))
            }
            _ => Ok(Decision::Allow),
        }
    }

    /// Backspace right after a line marker removes the whole marker.
    /// Forward deletes are left to the surface.
    fn delete_marker(
        &self,
        doc: &StyledDocument,
        range: Range<usize>,
        direction: DeleteDirection,
    ) -> Result<Decision, RangeError> {
        if direction == DeleteDirection::Forward {
            return Ok(Decision::Allow);
        }
        let line = classify_line(doc, range.end)?;
        let Some(marker) = line.marker else {
            return Ok(Decision::Allow);
        };
        if range.end != marker.range.end || range.start < marker.range.start {
            return Ok(Decision::Allow);
        }
        let plan = EditPlan::new()
            .delete(marker.range.clone())
            .with_cursor(marker.range.start);
        Ok(Decision::Rewrite(plan))
    }

    /// Leave a code block if the cursor is in one, otherwise open a new one.
    ///
    /// Leaving clears `code_block` over the whole run of code lines, trims
    /// blank chars from both ends of it and puts the cursor at the start of
    /// the line below (adding one at the end of the document).
    pub fn toggle_code_block(
        &self,
        doc: &StyledDocument,
        cursor: usize,
    ) -> Result<EditPlan, RangeError> {
        let cursor = cursor.min(doc.len());
        if let Some(span) = code_span(doc, cursor)? {
            return self.close_code_block(doc, span);
        }

        let line = classify_line(doc, cursor)?;
        let plan = if line.range.is_empty() {
            EditPlan::new()
                .insert_text(cursor, CODE_PLACEHOLDER.to_string(), StyleSet::CODE)
                .with_cursor(cursor + 1)
        } else {
            let at = line.range.end;
            EditPlan::new()
                .insert_text(at, "\n", StyleSet::PLAIN)
                .insert_text(at + 1, CODE_PLACEHOLDER.to_string(), StyleSet::CODE)
                .with_cursor(at + 2)
        };
        tracing::debug!(cursor, "opening code block");
        Ok(plan)
    }

    fn close_code_block(
        &self,
        doc: &StyledDocument,
        span: Range<usize>,
    ) -> Result<EditPlan, RangeError> {
        let text: Vec<char> = doc.slice(span.clone())?.chars().collect();
        let lead = text.iter().take_while(|c| is_blank(**c)).count();
        let trail = if lead == text.len() {
            0
        } else {
            text.iter().rev().take_while(|c| is_blank(**c)).count()
        };
        let interior: Vec<usize> = (lead..text.len() - trail)
            .filter(|i| text[*i] == CODE_PLACEHOLDER)
            .map(|i| span.start + i)
            .collect();
        let kept = text.len() - lead - trail - interior.len();

        let has_next_line = span.end < doc.len();
        let restyle_end = if has_next_line { span.end + 1 } else { span.end };
        let mut plan = EditPlan::new().restyle(span.start..restyle_end, StylePatch::code_block(false));
        if !has_next_line {
            plan = plan.insert_text(span.end, "\n", StyleSet::PLAIN);
        }
        if trail > 0 {
            plan = plan.delete(span.end - trail..span.end);
        }
        for at in interior.iter().rev() {
            plan = plan.delete(*at..*at + 1);
        }
        if lead > 0 {
            plan = plan.delete(span.start..span.start + lead);
        }
        tracing::debug!(start = span.start, end = span.end, kept, "closing code block");
        Ok(plan.with_cursor(span.start + kept + 1))
    }

    /// Collapse repeated leading markers on the line at `offset` to one.
    ///
    /// Returns `None` when the line is already normal, so applying the
    /// result and normalizing again yields `None`.
    pub fn normalize_line(
        &self,
        doc: &StyledDocument,
        offset: usize,
    ) -> Result<Option<EditPlan>, RangeError> {
        let line = classify_line(doc, offset)?;
        Ok(duplicate_marker_range(doc, &line).map(|range| {
            tracing::debug!(start = range.start, end = range.end, "removing duplicate markers");
            EditPlan::new().delete(range)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::AttachmentRegistry;
    use crate::config::DrawingConfig;
    use crate::document::{Content, Segment};
    use crate::execute::apply_plan;
    use crate::types::Selection;

    fn engine() -> AutoformatEngine {
        AutoformatEngine::default()
    }

    fn registry() -> AttachmentRegistry {
        AttachmentRegistry::new(DrawingConfig::default())
    }

    fn rewrite(decision: Decision) -> EditPlan {
        match decision {
            Decision::Rewrite(plan) => plan,
            Decision::Allow => panic!("expected a rewrite"),
        }
    }

    #[test]
    fn test_star_space_becomes_bullet() {
        let mut doc = StyledDocument::plain("*");
        let plan = rewrite(engine().propose(&doc, &ProposedEdit::insert(1, " ")).unwrap());
        apply_plan(&mut doc, &mut registry(), &plan).unwrap();
        assert_eq!(doc.text(), "• ");
        assert_eq!(doc.selection(), Selection::collapsed(2));
    }

    #[test]
    fn test_indented_dash_keeps_indent() {
        let mut doc = StyledDocument::plain("top\n\t-");
        let plan = rewrite(engine().propose(&doc, &ProposedEdit::insert(6, " ")).unwrap());
        apply_plan(&mut doc, &mut registry(), &plan).unwrap();
        assert_eq!(doc.text(), "top\n\t• ");
        assert_eq!(doc.selection(), Selection::collapsed(7));
    }

    #[test]
    fn test_brackets_space_becomes_checkbox() {
        let mut doc = StyledDocument::plain("[]");
        let mut reg = registry();
        let plan = rewrite(engine().propose(&doc, &ProposedEdit::insert(2, " ")).unwrap());
        let outcome = apply_plan(&mut doc, &mut reg, &plan).unwrap();
        assert_eq!(doc.text(), "\u{FFFC} ");
        assert_eq!(doc.selection(), Selection::collapsed(2));
        assert_eq!(reg.checkbox(outcome.created[0]).map(|c| c.checked), Some(false));
    }

    #[test]
    fn test_space_elsewhere_is_allowed() {
        let doc = StyledDocument::plain("a*");
        assert_eq!(
            engine().propose(&doc, &ProposedEdit::insert(2, " ")).unwrap(),
            Decision::Allow
        );
        let doc = StyledDocument::plain("• *");
        assert_eq!(
            engine().propose(&doc, &ProposedEdit::insert(3, " ")).unwrap(),
            Decision::Allow
        );
    }

    #[test]
    fn test_disabled_rules_allow() {
        let engine = AutoformatEngine::new(AutoformatConfig {
            bullets: false,
            ..AutoformatConfig::default()
        });
        let doc = StyledDocument::plain("*");
        assert_eq!(
            engine.propose(&doc, &ProposedEdit::insert(1, " ")).unwrap(),
            Decision::Allow
        );
    }

    #[test]
    fn test_enter_continues_bullet() {
        let mut doc = StyledDocument::plain("  • milk");
        let plan = rewrite(engine().propose(&doc, &ProposedEdit::insert(8, "\n")).unwrap());
        apply_plan(&mut doc, &mut registry(), &plan).unwrap();
        assert_eq!(doc.text(), "  • milk\n  • ");
        assert_eq!(doc.selection(), Selection::collapsed(13));
    }

    #[test]
    fn test_enter_continues_checkbox_unchecked() {
        let mut reg = registry();
        let mut doc = StyledDocument::plain("[]");
        let first = rewrite(engine().propose(&doc, &ProposedEdit::insert(2, " ")).unwrap());
        apply_plan(&mut doc, &mut reg, &first).unwrap();
        doc.replace(2..2, Content::text("eggs", StyleSet::PLAIN)).unwrap();
        let id = doc.attachment_at(0).unwrap().id;
        reg.toggle_checkbox(id).unwrap();

        let plan = rewrite(engine().propose(&doc, &ProposedEdit::insert(6, "\n")).unwrap());
        apply_plan(&mut doc, &mut reg, &plan).unwrap();
        assert_eq!(doc.text(), "\u{FFFC} eggs\n\u{FFFC} ");
        assert_eq!(doc.selection(), Selection::collapsed(9));
        let new_id = doc.attachment_at(7).unwrap().id;
        assert_ne!(new_id, id);
        assert_eq!(reg.checkbox(new_id).map(|c| c.checked), Some(false));
    }

    #[test]
    fn test_enter_on_empty_item_removes_marker() {
        let mut doc = StyledDocument::plain("• milk\n• ");
        let plan = rewrite(engine().propose(&doc, &ProposedEdit::insert(9, "\n")).unwrap());
        apply_plan(&mut doc, &mut registry(), &plan).unwrap();
        assert_eq!(doc.text(), "• milk\n");
        assert_eq!(doc.selection(), Selection::collapsed(7));
    }

    #[test]
    fn test_backspace_removes_marker_as_unit() {
        let mut doc = StyledDocument::plain("• item");
        let plan = rewrite(engine().propose(&doc, &ProposedEdit::backspace(2, 1)).unwrap());
        apply_plan(&mut doc, &mut registry(), &plan).unwrap();
        assert_eq!(doc.text(), "item");
        assert_eq!(doc.selection(), Selection::collapsed(0));

        // inside the content it is an ordinary backspace
        let doc = StyledDocument::plain("• item");
        assert_eq!(
            engine().propose(&doc, &ProposedEdit::backspace(4, 1)).unwrap(),
            Decision::Allow
        );
    }

    #[test]
    fn test_forward_delete_of_marker_space_is_allowed() {
        // "• |x" with the Delete key removes the 'x', not the marker
        let doc = StyledDocument::plain("• x");
        assert_eq!(
            engine()
                .propose(&doc, &ProposedEdit::forward_delete(1, 1))
                .unwrap(),
            Decision::Allow
        );
        assert_eq!(
            engine()
                .propose(&doc, &ProposedEdit::forward_delete(2, 1))
                .unwrap(),
            Decision::Allow
        );
        // the same range as a backspace still takes the marker
        assert!(matches!(
            engine()
                .propose(&doc, &ProposedEdit::new(1..2, ""))
                .unwrap(),
            Decision::Rewrite(_)
        ));
    }

    #[test]
    fn test_backspace_releases_checkbox() {
        let mut reg = registry();
        let mut doc = StyledDocument::plain("[]");
        let plan = rewrite(engine().propose(&doc, &ProposedEdit::insert(2, " ")).unwrap());
        apply_plan(&mut doc, &mut reg, &plan).unwrap();

        let plan = rewrite(engine().propose(&doc, &ProposedEdit::backspace(2, 1)).unwrap());
        let outcome = apply_plan(&mut doc, &mut reg, &plan).unwrap();
        assert_eq!(doc.text(), "");
        assert_eq!(outcome.released.len(), 1);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_enter_in_code_continues_block() {
        let mut doc = StyledDocument::from_segments(vec![Segment::text("fn main()", StyleSet::CODE)]);
        let plan = rewrite(engine().propose(&doc, &ProposedEdit::insert(9, "\n")).unwrap());
        apply_plan(&mut doc, &mut registry(), &plan).unwrap();
        assert_eq!(doc.text(), "fn main()\n\u{200B}");
        assert_eq!(classify_line(&doc, 11).unwrap().kind, BlockFormat::CodeBlock);

        // Enter again on the empty code line leaves the block
        let plan = rewrite(engine().propose(&doc, &ProposedEdit::insert(11, "\n")).unwrap());
        apply_plan(&mut doc, &mut registry(), &plan).unwrap();
        assert_eq!(doc.text(), "fn main()\n");
        assert_eq!(classify_line(&doc, 10).unwrap().kind, BlockFormat::None);
    }

    #[test]
    fn test_toggle_code_block_opens_and_closes() {
        let mut doc = StyledDocument::plain("intro");
        let plan = engine().toggle_code_block(&doc, 5).unwrap();
        apply_plan(&mut doc, &mut registry(), &plan).unwrap();
        assert_eq!(doc.text(), "intro\n\u{200B}");
        assert_eq!(doc.selection(), Selection::collapsed(7));
        assert_eq!(classify_line(&doc, 7).unwrap().kind, BlockFormat::CodeBlock);

        doc.replace(7..7, Content::text("x = 1  ", StyleSet::CODE)).unwrap();
        let plan = engine().toggle_code_block(&doc, 9).unwrap();
        apply_plan(&mut doc, &mut registry(), &plan).unwrap();
        assert_eq!(doc.text(), "intro\nx = 1\n");
        assert_eq!(doc.selection(), Selection::collapsed(12));
        assert!(doc.segments().iter().all(|s| match s {
            Segment::Text(run) => !run.style.code_block,
            Segment::Attachment(_) => true,
        }));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut doc = StyledDocument::plain("• • • eggs");
        let engine = engine();
        let plan = engine.normalize_line(&doc, 0).unwrap().unwrap();
        apply_plan(&mut doc, &mut registry(), &plan).unwrap();
        assert_eq!(doc.text(), "• eggs");
        assert_eq!(engine.normalize_line(&doc, 0).unwrap(), None);
    }
}
