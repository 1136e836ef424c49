//! Undo/redo management for editor operations.
//!
//! Provides:
//! - `UndoManager` trait for abstracting undo implementations
//! - `UndoHistory` - snapshot stack over a document and its widgets
//!
//! Each step holds a full copy of the document plus the widgets it referenced
//! at the time. Restoring a step re-registers those widgets, so a deleted
//! checkbox comes back with its checked state and a redrawn canvas comes back
//! with its old strokes.

use std::time::Duration;

use web_time::Instant;

use crate::attachment::{AttachmentRegistry, Widget};
use crate::config::UndoConfig;
use crate::document::StyledDocument;

/// Trait for managing undo/redo operations.
///
/// Implementations must actually perform the undo/redo on the state they are
/// given, not just track it.
pub trait UndoManager {
    /// Check if undo is available.
    fn can_undo(&self) -> bool;

    /// Check if redo is available.
    fn can_redo(&self) -> bool;

    /// Perform undo. Returns true if successful.
    fn undo(&mut self, doc: &mut StyledDocument, registry: &mut AttachmentRegistry) -> bool;

    /// Perform redo. Returns true if successful.
    fn redo(&mut self, doc: &mut StyledDocument, registry: &mut AttachmentRegistry) -> bool;

    /// Clear all undo/redo history.
    fn clear_history(&mut self);
}

/// How a recorded change was made. Consecutive typing shares one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Typing,
    Other,
}

#[derive(Debug, Clone)]
struct UndoStep {
    document: StyledDocument,
    widgets: Vec<Widget>,
    kind: EditKind,
    at: Instant,
}

impl UndoStep {
    fn capture(
        doc: &StyledDocument,
        registry: &AttachmentRegistry,
        kind: EditKind,
        at: Instant,
    ) -> Self {
        Self {
            document: doc.clone(),
            widgets: registry.referenced_widgets(doc),
            kind,
            at,
        }
    }

    fn restore_into(self, doc: &mut StyledDocument, registry: &mut AttachmentRegistry) {
        for widget in self.widgets {
            registry.restore(widget);
        }
        doc.restore(self.document);
        registry.retain_referenced(doc);
    }
}

/// Bounded snapshot history.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    undo_stack: Vec<UndoStep>,
    redo_stack: Vec<UndoStep>,
    max_steps: usize,
    typing_group: Duration,
    /// Set when the next typing edit must start a new step.
    group_broken: bool,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(&UndoConfig::default())
    }
}

impl UndoHistory {
    pub fn new(config: &UndoConfig) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps: config.max_steps,
            typing_group: Duration::from_millis(config.typing_group_ms),
            group_broken: false,
        }
    }

    /// Record the state *before* a change is applied.
    pub fn record(&mut self, doc: &StyledDocument, registry: &AttachmentRegistry, kind: EditKind) {
        self.record_at(doc, registry, kind, Instant::now());
    }

    pub fn record_at(
        &mut self,
        doc: &StyledDocument,
        registry: &AttachmentRegistry,
        kind: EditKind,
        at: Instant,
    ) {
        // Clear redo stack on new edit
        self.redo_stack.clear();

        if kind == EditKind::Typing && !self.group_broken {
            if let Some(last) = self.undo_stack.last_mut() {
                if last.kind == EditKind::Typing
                    && at.saturating_duration_since(last.at) <= self.typing_group
                {
                    last.at = at;
                    tracing::trace!(steps = self.undo_stack.len(), "typing joined undo step");
                    return;
                }
            }
        }
        self.group_broken = false;

        self.undo_stack
            .push(UndoStep::capture(doc, registry, kind, at));

        // Trim if over max
        if self.undo_stack.len() > self.max_steps {
            let excess = self.undo_stack.len() - self.max_steps;
            self.undo_stack.drain(..excess);
        }
        tracing::trace!(steps = self.undo_stack.len(), ?kind, "recorded undo step");
    }

    /// Make the next typing edit start its own step (cursor moved, toolbar used).
    pub fn break_coalescing(&mut self) {
        self.group_broken = true;
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }
}

impl UndoManager for UndoHistory {
    fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn undo(&mut self, doc: &mut StyledDocument, registry: &mut AttachmentRegistry) -> bool {
        let Some(step) = self.undo_stack.pop() else {
            return false;
        };
        self.redo_stack
            .push(UndoStep::capture(doc, registry, EditKind::Other, Instant::now()));
        step.restore_into(doc, registry);
        self.group_broken = true;
        tracing::debug!(revision = %doc.revision(), remaining = self.undo_stack.len(), "undo");
        true
    }

    fn redo(&mut self, doc: &mut StyledDocument, registry: &mut AttachmentRegistry) -> bool {
        let Some(step) = self.redo_stack.pop() else {
            return false;
        };
        self.undo_stack
            .push(UndoStep::capture(doc, registry, EditKind::Other, Instant::now()));
        step.restore_into(doc, registry);
        self.group_broken = true;
        tracing::debug!(revision = %doc.revision(), remaining = self.redo_stack.len(), "redo");
        true
    }

    fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.group_broken = false;
    }
}
