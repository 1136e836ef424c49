//! Platform abstraction traits for the editing surface.
//!
//! The surface is whatever widget shows the document and lets the user type
//! into it (a native text view, a test double). The core never talks to it
//! directly; the session pushes model state out through [`EditingSurface`]
//! and feeds the surface's [`SurfaceEvent`]s back in.

use crate::actions::ProposedEdit;
use crate::attachment::AttachmentRegistry;
use crate::document::StyledDocument;
use crate::style::StyleSet;
use crate::types::Selection;

/// Things a surface reports back to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The user is about to change the text.
    ProposedEdit(ProposedEdit),
    SelectionChanged(Selection),
    BeginEditing,
    EndEditing,
}

/// Platform-specific display of the document.
///
/// Implementations handle the actual UI work of showing content, placing the
/// cursor and reflecting the style the next keystroke will get.
pub trait EditingSurface {
    /// Replace everything the surface shows with `doc`.
    ///
    /// Attachment refs are resolved against `registry` to draw their widgets.
    /// Surfaces often fire change callbacks while their content is being
    /// replaced; those are returned here instead of being delivered, and the
    /// caller drops them.
    fn push_document(
        &mut self,
        doc: &StyledDocument,
        registry: &AttachmentRegistry,
    ) -> Vec<SurfaceEvent>;

    /// Move the cursor or selection. Offsets are already valid for the last
    /// pushed document.
    fn push_selection(&mut self, selection: Selection);

    /// Style the surface should give newly typed text.
    fn push_typing_style(&mut self, style: StyleSet);
}
