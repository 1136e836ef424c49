//! Immutable copies of a document for work off the editing sequence.

use inkpad_editor_core::{AttachmentRegistry, Revision, StyledDocument};

use crate::envelope::PortableBytes;

/// A document and the widgets it references, frozen at one revision.
///
/// The live document may change again before background work on a snapshot
/// finishes; the snapshot never does.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub document: StyledDocument,
    pub registry: AttachmentRegistry,
    pub revision: Revision,
}

impl DocumentSnapshot {
    /// Copy `doc` and only the widgets it references.
    pub fn capture(doc: &StyledDocument, registry: &AttachmentRegistry) -> Self {
        let mut widgets = AttachmentRegistry::new(registry.drawing_config().clone());
        for widget in registry.referenced_widgets(doc) {
            widgets.restore(widget);
        }
        Self {
            document: doc.clone(),
            registry: widgets,
            revision: doc.revision(),
        }
    }

    pub fn cursor_offset(&self) -> usize {
        self.document.selection().head
    }
}

/// Encoded bytes ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePayload {
    pub revision: Revision,
    pub bytes: PortableBytes,
    pub cursor_offset: usize,
}
