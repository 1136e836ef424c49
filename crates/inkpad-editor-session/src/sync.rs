//! Two-way sync between the editing surface and the document model.
//!
//! Two latches keep updates from bouncing between the two sides:
//!
//! - `surface_to_model` is held while a surface edit is being applied to the
//!   model. It clears only after every [`DocumentObserver`] has seen the new
//!   revision. While it is held, model-originated pushes are dropped, so the
//!   surface's edit wins.
//! - `model_to_surface` is held while the model writes to the surface. Surface
//!   events that arrive meanwhile are echoes of that write and are ignored.
//!
//! The latches live behind an `Rc` so surface adapters and observers can read
//! them without a handle on the session.
//!
//! [`DocumentObserver`]: crate::observer::DocumentObserver

use std::cell::Cell;
use std::ops::Range;
use std::rc::Rc;

use inkpad_editor_core::{Selection, StyledDocument};

#[derive(Debug, Default)]
pub struct SyncLatches {
    model_to_surface: Cell<bool>,
    surface_to_model: Cell<bool>,
}

impl SyncLatches {
    pub fn applying_model_to_surface(&self) -> bool {
        self.model_to_surface.get()
    }

    pub fn applying_surface_to_model(&self) -> bool {
        self.surface_to_model.get()
    }
}

#[derive(Debug, Default)]
pub struct EditSynchronizer {
    latches: Rc<SyncLatches>,
}

impl EditSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared read-only view of the latches.
    pub fn latches(&self) -> Rc<SyncLatches> {
        self.latches.clone()
    }

    /// Start applying a surface change. `false` means the change is an echo
    /// of a model push (or a nested surface change) and must be dropped.
    pub fn begin_surface_to_model(&self) -> bool {
        if self.latches.model_to_surface.get() {
            tracing::trace!("surface event during model push, dropping");
            return false;
        }
        if self.latches.surface_to_model.replace(true) {
            tracing::trace!("surface event while another is in flight, dropping");
            return false;
        }
        tracing::trace!("surface -> model begin");
        true
    }

    /// Clear the surface latch. Call only after observers have been notified.
    pub fn finish_surface_to_model(&self) {
        self.latches.surface_to_model.set(false);
        tracing::trace!("surface -> model end");
    }

    /// Start a model-originated push. `false` means a surface change is in
    /// flight and the push must be dropped (last writer wins at the surface).
    pub fn begin_model_to_surface(&self) -> bool {
        if self.latches.surface_to_model.get() {
            return false;
        }
        self.latches.model_to_surface.set(true);
        tracing::trace!("model -> surface begin");
        true
    }

    /// Start pushing a rewrite of the surface change currently in flight.
    ///
    /// Unlike [`begin_model_to_surface`](Self::begin_model_to_surface) this is
    /// part of the surface transaction, so it runs while `surface_to_model` is held.
    pub fn begin_rewrite_push(&self) {
        self.latches.model_to_surface.set(true);
        tracing::trace!("rewrite push begin");
    }

    pub fn end_model_to_surface(&self) {
        self.latches.model_to_surface.set(false);
        tracing::trace!("model -> surface end");
    }

    pub fn applying_model_to_surface(&self) -> bool {
        self.latches.applying_model_to_surface()
    }

    pub fn applying_surface_to_model(&self) -> bool {
        self.latches.applying_surface_to_model()
    }
}

/// Clamp a surface-reported range into the document and widen it to grapheme
/// boundaries. The flag reports whether anything changed.
pub fn clamp_range(doc: &StyledDocument, range: Range<usize>) -> (Range<usize>, bool) {
    let len = doc.len();
    let (mut start, mut end) = (range.start.min(len), range.end.min(len));
    if start > end {
        std::mem::swap(&mut start, &mut end);
    }
    if !doc.is_grapheme_boundary(start) {
        start = doc.prev_grapheme_boundary(start);
    }
    if !doc.is_grapheme_boundary(end) {
        end = doc.next_grapheme_boundary(end);
    }
    let clamped = start..end;
    let changed = clamped != range;
    (clamped, changed)
}

/// Clamp a selection into `[0, len]`, snapping each end to the grapheme
/// boundary before it. Direction is kept.
pub fn clamp_selection(doc: &StyledDocument, selection: Selection) -> Selection {
    let snap = |offset: usize| {
        let offset = offset.min(doc.len());
        if doc.is_grapheme_boundary(offset) {
            offset
        } else {
            doc.prev_grapheme_boundary(offset)
        }
    };
    Selection::new(snap(selection.anchor), snap(selection.head))
}
