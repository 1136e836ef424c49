//! One open note: document, widgets, history and the surface showing them.
//!
//! Every change goes through here. Surface edits arrive via
//! [`EditingSession::on_proposed_edit`] and may be rewritten by the
//! autoformatter; toolbar actions, widget taps and undo/redo are applied to the
//! model first and then pushed out to the surface.

use std::ops::Range;

use inkpad_editor_codec::{CodecWarning, DocumentSnapshot, PersistenceCodec, PortableBytes};
use inkpad_editor_core::formatting::{self, FormattingContext, StyleToggle};
use inkpad_editor_core::{
    AttachmentId, AttachmentKind, AttachmentNotFound, AttachmentRegistry, AutoformatEngine,
    BlockFormat, Decision, EditKind, EditPlan, EditingSurface, EditorAction, EditorConfig,
    IndentDirection, InkColor, InputKind, OBJECT_REPLACEMENT, ProposedEdit, Selection, Style,
    StyleSet, StyledDocument, SurfaceEvent, UndoHistory, UndoManager, WidgetCounts, apply_plan,
    classify_range,
};

use crate::error::SessionError;
use crate::observer::{ChangeOrigin, DocumentChange, DocumentObserver};
use crate::sync::{EditSynchronizer, clamp_range, clamp_selection};

/// State the surface should show after a rewritten edit.
#[derive(Debug, Clone)]
pub struct SurfaceUpdate {
    pub document: StyledDocument,
    pub selection: Selection,
    pub typing_style: StyleSet,
}

/// Answer to a proposed surface edit.
#[derive(Debug, Clone)]
pub enum EditResponse {
    /// Let the surface apply its edit; the model already holds the same result.
    Allow,
    /// Cancel the surface's own edit. The model applied something else and
    /// has already pushed it to the surface.
    Rewrite(SurfaceUpdate),
    /// The event was an echo or could not be applied. Nothing changed.
    Ignored,
}

pub struct EditingSession<S: EditingSurface> {
    document: StyledDocument,
    registry: AttachmentRegistry,
    surface: S,
    sync: EditSynchronizer,
    autoformat: AutoformatEngine,
    history: UndoHistory,
    codec: PersistenceCodec,
    config: EditorConfig,
    /// Style for the next typed char, set by toggling a style at a caret.
    typing_style: Option<StyleSet>,
    observers: Vec<Box<dyn DocumentObserver>>,
    editing: bool,
}

impl<S: EditingSurface> EditingSession<S> {
    pub fn new(surface: S, config: EditorConfig) -> Self {
        let registry = AttachmentRegistry::new(config.drawing.clone());
        Self::with_document(surface, config, StyledDocument::new(), registry)
    }

    pub fn with_document(
        surface: S,
        config: EditorConfig,
        document: StyledDocument,
        registry: AttachmentRegistry,
    ) -> Self {
        let mut session = Self {
            document,
            registry,
            surface,
            sync: EditSynchronizer::new(),
            autoformat: AutoformatEngine::new(config.autoformat.clone()),
            history: UndoHistory::new(&config.undo),
            codec: PersistenceCodec::new(config.drawing.clone()),
            config,
            typing_style: None,
            observers: Vec::new(),
            editing: false,
        };
        session.push_to_surface();
        session
    }

    /// Load a saved note. Marker problems come back as warnings next to the session.
    pub fn open(
        surface: S,
        config: EditorConfig,
        bytes: &[u8],
    ) -> Result<(Self, Vec<CodecWarning>), SessionError> {
        let decoded = PersistenceCodec::new(config.drawing.clone()).deserialize(bytes)?;
        for warning in &decoded.warnings {
            tracing::warn!(%warning, "loaded note with warning");
        }
        let session = Self::with_document(surface, config, decoded.document, decoded.registry);
        Ok((session, decoded.warnings))
    }

    /// Discard the note, returning the surface.
    pub fn close(mut self) -> S {
        self.registry.clear();
        self.history.clear_history();
        self.surface
    }

    pub fn add_observer(&mut self, observer: Box<dyn DocumentObserver>) {
        self.observers.push(observer);
    }

    pub fn document(&self) -> &StyledDocument {
        &self.document
    }

    pub fn registry(&self) -> &AttachmentRegistry {
        &self.registry
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn synchronizer(&self) -> &EditSynchronizer {
        &self.sync
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    // === Surface events ===

    /// Route one surface event to its handler.
    pub fn handle_event(&mut self, event: SurfaceEvent) -> EditResponse {
        match event {
            SurfaceEvent::ProposedEdit(edit) => self.on_edit(edit),
            SurfaceEvent::SelectionChanged(selection) => {
                self.on_selection_changed(selection);
                EditResponse::Allow
            }
            SurfaceEvent::BeginEditing => {
                self.on_begin_editing();
                EditResponse::Allow
            }
            SurfaceEvent::EndEditing => {
                self.on_end_editing();
                EditResponse::Allow
            }
        }
    }

    /// The surface wants to replace `range` with `replacement`.
    ///
    /// The surface latch is held from here until observers have seen the
    /// result, so model pushes triggered meanwhile are dropped.
    pub fn on_proposed_edit(&mut self, range: Range<usize>, replacement: &str) -> EditResponse {
        self.on_edit(ProposedEdit::new(range, replacement))
    }

    /// Like [`Self::on_proposed_edit`], keeping the edit's delete direction.
    pub fn on_edit(&mut self, edit: ProposedEdit) -> EditResponse {
        if !self.sync.begin_surface_to_model() {
            return EditResponse::Ignored;
        }
        let response = self.apply_surface_edit(edit);
        self.sync.finish_surface_to_model();
        response
    }

    fn apply_surface_edit(&mut self, requested: ProposedEdit) -> EditResponse {
        let (range, clamped) = clamp_range(&self.document, requested.range.clone());
        if clamped {
            tracing::warn!(requested = ?requested.range, ?range, len = self.document.len(), "clamped proposed edit");
        }
        // the surface can't produce attachments from typed text
        let stripped = requested.replacement.contains(OBJECT_REPLACEMENT);
        let replacement = if stripped {
            requested.replacement.replace(OBJECT_REPLACEMENT, "")
        } else {
            requested.replacement.to_string()
        };
        let edit = ProposedEdit::new(range, replacement).with_direction(requested.direction);
        let input = edit.input_kind();
        if input == InputKind::Noop {
            if stripped {
                return self.push_rewrite();
            }
            return EditResponse::Allow;
        }

        let decision = match self.autoformat.propose(&self.document, &edit) {
            Ok(decision) => decision,
            Err(err) => {
                tracing::warn!(error = %err, "autoformat rejected edit");
                return EditResponse::Ignored;
            }
        };
        let (plan, mut rewritten) = match decision {
            Decision::Rewrite(plan) => (plan, true),
            Decision::Allow => (
                formatting::typed_plan(&self.document, &edit, self.typing_style),
                clamped || stripped,
            ),
        };
        let kind = match input {
            InputKind::InsertText | InputKind::Space | InputKind::Delete
                if !rewritten && !edit.replacement.contains('\n') =>
            {
                EditKind::Typing
            }
            _ => EditKind::Other,
        };

        let before = (self.document.clone(), self.registry.clone());
        let outcome = match apply_plan(&mut self.document, &mut self.registry, &plan) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(error = %err, "surface edit could not be applied");
                return EditResponse::Ignored;
            }
        };
        if outcome.touched_line_structure() {
            rewritten |= self.normalize_lines(edit.range.start);
        }
        self.history.record(&before.0, &before.1, kind);
        self.typing_style = None;

        tracing::debug!(
            revision = %self.document.revision(),
            ?input,
            rewritten,
            created = outcome.created.len(),
            released = outcome.released.len(),
            "applied surface edit"
        );

        let response = if rewritten {
            self.push_rewrite()
        } else {
            EditResponse::Allow
        };
        self.notify(ChangeOrigin::Surface);
        response
    }

    /// Collapse duplicate markers on every line between `from` and the cursor.
    fn normalize_lines(&mut self, from: usize) -> bool {
        let len = self.document.len();
        let head = self.document.selection().head;
        let range = from.min(head).min(len)..from.max(head).min(len);
        let Ok(lines) = classify_range(&self.document, range) else {
            return false;
        };
        let mut plan = EditPlan::new();
        for line in lines.iter().rev() {
            match self.autoformat.normalize_line(&self.document, line.range.start) {
                Ok(Some(fix)) => plan = plan.then(fix),
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, "line normalization failed"),
            }
        }
        if plan.is_empty() {
            return false;
        }
        match apply_plan(&mut self.document, &mut self.registry, &plan) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(error = %err, "could not remove duplicate markers");
                false
            }
        }
    }

    pub fn on_selection_changed(&mut self, selection: Selection) {
        if self.sync.applying_model_to_surface() {
            tracing::trace!(?selection, "ignoring selection echo");
            return;
        }
        let clamped = clamp_selection(&self.document, selection);
        let previous = self.document.selection();
        if let Err(err) = self.document.set_selection(clamped) {
            tracing::warn!(error = %err, "selection rejected");
            return;
        }
        if clamped != selection {
            tracing::warn!(?selection, ?clamped, "clamped surface selection");
        }
        if clamped != previous {
            self.typing_style = None;
            self.history.break_coalescing();
        }
        if self.sync.begin_model_to_surface() {
            if clamped != selection {
                self.surface.push_selection(clamped);
            }
            let typing = self.current_typing_style();
            self.surface.push_typing_style(typing);
            self.sync.end_model_to_surface();
        }
    }

    pub fn on_begin_editing(&mut self) {
        self.editing = true;
        tracing::trace!("begin editing");
    }

    pub fn on_end_editing(&mut self) {
        self.editing = false;
        self.typing_style = None;
        self.history.break_coalescing();
        tracing::trace!("end editing");
    }

    // === Toolbar ===

    /// Toolbar state for the current selection.
    pub fn formatting_context(&self) -> FormattingContext {
        let selection = self.document.selection();
        let mut context = formatting::derive(&self.document, selection);
        if let (true, Some(style)) = (selection.is_collapsed(), &self.typing_style) {
            context = context.with_typing_style(style);
        }
        context.with_history(self.history.can_undo(), self.history.can_redo())
    }

    pub fn toggle_style(&mut self, style: Style) -> Result<bool, SessionError> {
        let toggle = formatting::toggle_style(
            &self.document,
            self.document.selection(),
            style,
            self.typing_style,
        )?;
        match toggle {
            StyleToggle::Plan(plan) => self.apply_model_plan(&plan),
            StyleToggle::Typing(typing) => {
                self.typing_style = Some(typing);
                if self.sync.begin_model_to_surface() {
                    self.surface.push_typing_style(typing);
                    self.sync.end_model_to_surface();
                }
                Ok(true)
            }
        }
    }

    pub fn toggle_block_format(&mut self, format: BlockFormat) -> Result<bool, SessionError> {
        let plan =
            formatting::toggle_block_format(&self.document, self.document.selection(), format)?;
        self.apply_model_plan(&plan)
    }

    pub fn toggle_code_block(&mut self) -> Result<bool, SessionError> {
        let plan = self
            .autoformat
            .toggle_code_block(&self.document, self.document.selection().head)?;
        self.apply_model_plan(&plan)
    }

    pub fn indent(&mut self, direction: IndentDirection) -> Result<bool, SessionError> {
        let plan = formatting::indent_lines(&self.document, self.document.selection(), direction)?;
        self.apply_model_plan(&plan)
    }

    pub fn undo(&mut self) -> bool {
        if !self.history.undo(&mut self.document, &mut self.registry) {
            return false;
        }
        self.after_model_change();
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.history.redo(&mut self.document, &mut self.registry) {
            return false;
        }
        self.after_model_change();
        true
    }

    pub fn select_all(&mut self) {
        let all = Selection::new(0, self.document.len());
        if self.document.set_selection(all).is_ok() && self.sync.begin_model_to_surface() {
            self.surface.push_selection(all);
            self.sync.end_model_to_surface();
        }
    }

    // === Widgets ===

    /// Toggle the checkbox nearest a tap, if one is within tolerance.
    /// Returns its new checked state.
    pub fn tap_checkbox(&mut self, offset: usize) -> Result<Option<bool>, SessionError> {
        let tolerance = self.config.checkbox.tap_tolerance;
        let Some(id) = self
            .registry
            .hit_test_checkbox(&self.document, offset, tolerance)
        else {
            tracing::trace!(offset, "tap missed every checkbox");
            return Ok(None);
        };
        self.history
            .record(&self.document, &self.registry, EditKind::Other);
        let checked = self.registry.toggle_checkbox(id)?;
        self.document.touch();
        self.after_model_change();
        Ok(Some(checked))
    }

    /// Insert a blank drawing on its own line at the cursor, replacing any
    /// selected text.
    pub fn insert_drawing(&mut self) -> Result<Option<AttachmentId>, SessionError> {
        let selection = self.document.selection();
        let (start, end) = (selection.start(), selection.end());
        let split_before = start != self.document.line_range(start)?.start;
        let split_after = end != self.document.line_range(end)?.end;

        // ops run in order, each insert landing in front of the previous one
        let mut plan = EditPlan::new();
        if end > start {
            plan = plan.delete(start..end);
        }
        if split_after {
            plan = plan.insert_text(start, "\n", StyleSet::PLAIN);
        }
        plan = plan.insert_attachment(start, AttachmentKind::Drawing);
        if split_before {
            plan = plan.insert_text(start, "\n", StyleSet::PLAIN);
        }
        let after = start + usize::from(split_before) + 1 + usize::from(split_after);
        let plan = plan.with_cursor(after);

        let before = (self.document.clone(), self.registry.clone());
        let outcome = apply_plan(&mut self.document, &mut self.registry, &plan)?;
        self.history.record(&before.0, &before.1, EditKind::Other);
        self.after_model_change();
        Ok(outcome.created.first().copied())
    }

    /// Store new strokes and color for a drawing.
    pub fn update_drawing(
        &mut self,
        id: AttachmentId,
        stroke_data: Option<Vec<u8>>,
        color: InkColor,
    ) -> Result<(), SessionError> {
        self.registry.drawing(id).ok_or(AttachmentNotFound(id))?;
        self.history
            .record(&self.document, &self.registry, EditKind::Other);
        self.registry.update_drawing(id, stroke_data, color)?;
        self.document.touch();
        self.after_model_change();
        Ok(())
    }

    /// Resize a drawing. Returns the height actually applied after clamping.
    pub fn resize_drawing(&mut self, id: AttachmentId, height: u32) -> Result<u32, SessionError> {
        self.registry.drawing(id).ok_or(AttachmentNotFound(id))?;
        self.history
            .record(&self.document, &self.registry, EditKind::Other);
        let applied = self.registry.resize_drawing(id, height)?;
        self.document.touch();
        self.after_model_change();
        Ok(applied)
    }

    pub fn widget_counts(&self) -> WidgetCounts {
        self.registry.counts()
    }

    /// Run a toolbar or shortcut action. Returns whether anything changed.
    pub fn execute_action(&mut self, action: &EditorAction) -> Result<bool, SessionError> {
        tracing::trace!(?action, "execute action");
        match action {
            EditorAction::ToggleStyle(style) => self.toggle_style(*style),
            EditorAction::ToggleBlockFormat(format) => self.toggle_block_format(*format),
            EditorAction::ToggleCodeBlock => self.toggle_code_block(),
            EditorAction::Indent(direction) => self.indent(*direction),
            EditorAction::Undo => Ok(self.undo()),
            EditorAction::Redo => Ok(self.redo()),
            EditorAction::TapCheckbox { offset } => Ok(self.tap_checkbox(*offset)?.is_some()),
            EditorAction::InsertDrawing => Ok(self.insert_drawing()?.is_some()),
            EditorAction::SelectAll => {
                self.select_all();
                Ok(true)
            }
        }
    }

    // === Persistence ===

    pub fn serialize(&self) -> Result<PortableBytes, SessionError> {
        Ok(self.codec.serialize(&self.document, &self.registry)?)
    }

    /// Frozen copy for background work.
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot::capture(&self.document, &self.registry)
    }

    pub fn verify_round_trip(&self) -> Vec<CodecWarning> {
        self.codec.verify_round_trip(&self.document, &self.registry)
    }

    // === Internals ===

    fn apply_model_plan(&mut self, plan: &EditPlan) -> Result<bool, SessionError> {
        if plan.is_empty() && plan.selection.is_none() {
            return Ok(false);
        }
        let before = (self.document.clone(), self.registry.clone());
        let outcome = apply_plan(&mut self.document, &mut self.registry, plan)?;
        if !outcome.changed {
            self.push_to_surface();
            return Ok(false);
        }
        self.history.record(&before.0, &before.1, EditKind::Other);
        self.after_model_change();
        Ok(true)
    }

    fn after_model_change(&mut self) {
        self.typing_style = None;
        self.push_to_surface();
        self.notify(ChangeOrigin::Model);
    }

    fn current_typing_style(&self) -> StyleSet {
        self.typing_style.unwrap_or_else(|| {
            formatting::typing_style_at(&self.document, self.document.selection().head)
        })
    }

    fn surface_update(&self) -> SurfaceUpdate {
        SurfaceUpdate {
            document: self.document.clone(),
            selection: self.document.selection(),
            typing_style: self.current_typing_style(),
        }
    }

    /// Overwrite the surface's pending edit with the model's result.
    fn push_rewrite(&mut self) -> EditResponse {
        self.sync.begin_rewrite_push();
        self.write_surface();
        self.sync.end_model_to_surface();
        EditResponse::Rewrite(self.surface_update())
    }

    /// Push the model out, unless a surface edit is in flight.
    fn push_to_surface(&mut self) -> bool {
        if !self.sync.begin_model_to_surface() {
            tracing::warn!(
                revision = %self.document.revision(),
                "surface edit in flight, dropping model push"
            );
            return false;
        }
        self.write_surface();
        self.sync.end_model_to_surface();
        true
    }

    /// Write document, selection and typing style to the surface. The caller
    /// holds the model latch.
    fn write_surface(&mut self) {
        let selection = self.document.selection();
        let echoes = self.surface.push_document(&self.document, &self.registry);
        if !echoes.is_empty() {
            tracing::trace!(dropped = echoes.len(), "dropped surface echoes");
        }
        let restored = clamp_selection(&self.document, selection);
        if let Err(err) = self.document.set_selection(restored) {
            tracing::warn!(error = %err, "could not restore selection");
        }
        let typing = self.current_typing_style();
        self.surface.push_selection(restored);
        self.surface.push_typing_style(typing);
        tracing::trace!(revision = %self.document.revision(), ?restored, "pushed document");
    }

    fn notify(&mut self, origin: ChangeOrigin) {
        let latches = self.sync.latches();
        let change = DocumentChange {
            revision: self.document.revision(),
            origin,
            document: &self.document,
            registry: &self.registry,
            latches: &latches,
        };
        for observer in &mut self.observers {
            observer.document_changed(&change);
        }
    }
}
