//! Edit plans and their execution.
//!
//! Formatting toggles and autoformat rewrites never touch the document
//! directly. They describe what should happen as an [`EditPlan`]: an ordered
//! list of replacements and restyles plus an optional final selection.
//! [`apply_plan`] is the central place plans are executed. It creates widgets
//! for new attachments, releases widgets whose refs were removed, and rolls
//! the whole plan back if any step fails.
//!
//! Ops run in order against the document as it stands after the previous op.
//! Plans that touch several places list them from the highest offset down so
//! earlier offsets stay valid.

use std::ops::Range;

use crate::attachment::{AttachmentId, AttachmentKind, AttachmentRegistry, Widget};
use crate::document::{AttachmentRef, Content, StyledDocument};
use crate::error::EditError;
use crate::style::{Style, StyleSet};
use crate::types::{EditInfo, Selection};

/// Content a plan inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedContent {
    Empty,
    Text { text: String, style: StyleSet },
    /// A fresh widget of this kind, created when the plan is applied.
    NewAttachment(AttachmentKind),
}

/// Partial style update. `None` fields are left as they are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StylePatch {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
    pub code_block: Option<bool>,
}

impl StylePatch {
    pub fn style(style: Style, on: bool) -> Self {
        let mut patch = Self::default();
        match style {
            Style::Bold => patch.bold = Some(on),
            Style::Italic => patch.italic = Some(on),
            Style::Underline => patch.underline = Some(on),
            Style::Strikethrough => patch.strikethrough = Some(on),
        }
        patch
    }

    pub fn code_block(on: bool) -> Self {
        Self {
            code_block: Some(on),
            ..Self::default()
        }
    }

    pub fn apply(&self, style: &mut StyleSet) {
        if let Some(on) = self.bold {
            style.bold = on;
        }
        if let Some(on) = self.italic {
            style.italic = on;
        }
        if let Some(on) = self.underline {
            style.underline = on;
        }
        if let Some(on) = self.strikethrough {
            style.strikethrough = on;
        }
        if let Some(on) = self.code_block {
            style.code_block = on;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOp {
    Replace {
        range: Range<usize>,
        content: PlannedContent,
    },
    Restyle {
        range: Range<usize>,
        patch: StylePatch,
    },
}

/// A batch of document changes applied as one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditPlan {
    pub ops: Vec<PlanOp>,
    /// Final selection. `None` keeps the selection as mapped through the ops.
    pub selection: Option<Selection>,
}

impl EditPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(mut self, range: Range<usize>, content: PlannedContent) -> Self {
        self.ops.push(PlanOp::Replace { range, content });
        self
    }

    pub fn insert_text(self, at: usize, text: impl Into<String>, style: StyleSet) -> Self {
        self.replace(
            at..at,
            PlannedContent::Text {
                text: text.into(),
                style,
            },
        )
    }

    pub fn insert_attachment(self, at: usize, kind: AttachmentKind) -> Self {
        self.replace(at..at, PlannedContent::NewAttachment(kind))
    }

    pub fn delete(self, range: Range<usize>) -> Self {
        self.replace(range, PlannedContent::Empty)
    }

    pub fn restyle(mut self, range: Range<usize>, patch: StylePatch) -> Self {
        self.ops.push(PlanOp::Restyle { range, patch });
        self
    }

    pub fn with_cursor(mut self, offset: usize) -> Self {
        self.selection = Some(Selection::collapsed(offset));
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Append another plan's ops; its selection wins if set.
    pub fn then(mut self, other: EditPlan) -> Self {
        self.ops.extend(other.ops);
        if other.selection.is_some() {
            self.selection = other.selection;
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// What applying a plan did.
#[derive(Debug, Clone, Default)]
pub struct PlanOutcome {
    pub created: Vec<AttachmentId>,
    /// Widgets whose refs the plan removed and that nothing references any more.
    pub released: Vec<Widget>,
    pub edits: Vec<EditInfo>,
    /// Whether any op changed content or style.
    pub changed: bool,
}

impl PlanOutcome {
    /// Whether any edit touched the head of a line or its line breaks.
    pub fn touched_line_structure(&self) -> bool {
        self.edits
            .iter()
            .any(|e| e.in_marker_zone || e.contains_newline)
    }
}

/// Apply `plan` to the document and registry as one step.
///
/// On failure both are left exactly as they were.
pub fn apply_plan(
    doc: &mut StyledDocument,
    registry: &mut AttachmentRegistry,
    plan: &EditPlan,
) -> Result<PlanOutcome, EditError> {
    let backup = doc.clone();
    let mut outcome = PlanOutcome::default();
    let mut removed = Vec::new();

    if let Err(err) = apply_ops(doc, registry, plan, &mut outcome, &mut removed) {
        tracing::warn!(error = %err, ops = plan.ops.len(), "edit plan failed, rolling back");
        for id in &outcome.created {
            registry.remove(*id);
        }
        *doc = backup;
        return Err(err);
    }

    outcome.released = registry.release_unreferenced(doc, &removed);
    tracing::trace!(
        ops = plan.ops.len(),
        created = outcome.created.len(),
        released = outcome.released.len(),
        revision = %doc.revision(),
        "applied edit plan"
    );
    Ok(outcome)
}

fn apply_ops(
    doc: &mut StyledDocument,
    registry: &mut AttachmentRegistry,
    plan: &EditPlan,
    outcome: &mut PlanOutcome,
    removed: &mut Vec<AttachmentRef>,
) -> Result<(), EditError> {
    for op in &plan.ops {
        match op {
            PlanOp::Replace { range, content } => {
                if range.is_empty() && *content == PlannedContent::Empty {
                    continue;
                }
                // validate before creating a widget for it
                doc.check_range(range)?;
                let content = match content {
                    PlannedContent::Empty => Content::Empty,
                    PlannedContent::Text { text, style } => Content::text(text.clone(), *style),
                    PlannedContent::NewAttachment(kind) => {
                        let id = registry.create(*kind);
                        outcome.created.push(id);
                        Content::Attachment(AttachmentRef { id, kind: *kind })
                    }
                };
                let result = doc.replace(range.clone(), content)?;
                removed.extend(result.removed);
                outcome.edits.push(result.edit);
                outcome.changed = true;
            }
            PlanOp::Restyle { range, patch } => {
                outcome.changed |= doc.set_style(range.clone(), |style| patch.apply(style))?;
            }
        }
    }
    if let Some(selection) = plan.selection {
        doc.set_selection(selection)?;
    }
    Ok(())
}
