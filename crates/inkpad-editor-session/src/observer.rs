//! Downstream consumers of document changes.

use std::sync::Arc;

use inkpad_editor_codec::{DocumentSnapshot, PersistenceCodec, SaveOutcome, SaveScheduler, SnapshotSink};
use inkpad_editor_core::{AttachmentRegistry, Revision, SaveConfig, StyledDocument, WidgetCounts};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::sync::SyncLatches;

/// Who caused a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// An edit typed into the surface.
    Surface,
    /// A toolbar action, widget tap or undo/redo.
    Model,
}

/// A new document revision, as seen by observers.
#[derive(Debug, Clone, Copy)]
pub struct DocumentChange<'a> {
    pub revision: Revision,
    pub origin: ChangeOrigin,
    pub document: &'a StyledDocument,
    pub registry: &'a AttachmentRegistry,
    /// Latch state at notification time. For surface changes
    /// `applying_surface_to_model` is still set.
    pub latches: &'a SyncLatches,
}

pub trait DocumentObserver {
    fn document_changed(&mut self, change: &DocumentChange<'_>);
}

/// Publishes widget counts to the presentation layer when they change.
pub struct WidgetCountPublisher<F> {
    publish: F,
    last: Option<WidgetCounts>,
}

impl<F: FnMut(WidgetCounts)> WidgetCountPublisher<F> {
    pub fn new(publish: F) -> Self {
        Self { publish, last: None }
    }
}

impl<F: FnMut(WidgetCounts)> DocumentObserver for WidgetCountPublisher<F> {
    fn document_changed(&mut self, change: &DocumentChange<'_>) {
        let counts = change.registry.counts();
        if self.last != Some(counts) {
            tracing::trace!(?counts, revision = %change.revision, "publishing widget counts");
            (self.publish)(counts);
            self.last = Some(counts);
        }
    }
}

/// Schedules a debounced save of every new revision.
pub struct AutosaveObserver {
    scheduler: SaveScheduler,
    pending: Vec<JoinHandle<SaveOutcome>>,
}

impl AutosaveObserver {
    pub fn new(
        handle: Handle,
        config: &SaveConfig,
        codec: Arc<PersistenceCodec>,
        sink: Arc<dyn SnapshotSink>,
    ) -> Self {
        Self {
            scheduler: SaveScheduler::new(handle, config, codec, sink),
            pending: Vec::new(),
        }
    }

    /// Handles of saves that had not finished when the last change came in.
    pub fn take_pending(&mut self) -> Vec<JoinHandle<SaveOutcome>> {
        std::mem::take(&mut self.pending)
    }
}

impl DocumentObserver for AutosaveObserver {
    fn document_changed(&mut self, change: &DocumentChange<'_>) {
        let snapshot = DocumentSnapshot::capture(change.document, change.registry);
        self.pending.retain(|handle| !handle.is_finished());
        self.pending.push(self.scheduler.schedule(snapshot));
    }
}
