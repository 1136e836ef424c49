//! Debounced background saves.
//!
//! Every edit may schedule a save. Each scheduled save waits out the debounce,
//! then checks whether a newer snapshot has been scheduled since. If so it is
//! discarded; nothing is ever aborted mid-flight. Encoding runs on the
//! blocking pool against the snapshot, never the live document.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use inkpad_editor_core::{Revision, SaveConfig};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::codec::PersistenceCodec;
use crate::snapshot::{DocumentSnapshot, SavePayload};

/// Where encoded documents go (disk, sync service).
pub trait SnapshotSink: Send + Sync + 'static {
    fn store(&self, payload: SavePayload);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(Revision),
    /// A newer snapshot was scheduled before this one was stored.
    Superseded(Revision),
    Failed(Revision),
}

pub struct SaveScheduler {
    handle: Handle,
    latest: Arc<AtomicU64>,
    debounce: Duration,
    codec: Arc<PersistenceCodec>,
    sink: Arc<dyn SnapshotSink>,
}

impl SaveScheduler {
    pub fn new(
        handle: Handle,
        config: &SaveConfig,
        codec: Arc<PersistenceCodec>,
        sink: Arc<dyn SnapshotSink>,
    ) -> Self {
        Self {
            handle,
            latest: Arc::new(AtomicU64::new(0)),
            debounce: Duration::from_millis(config.debounce_ms),
            codec,
            sink,
        }
    }

    /// Newest revision scheduled so far.
    pub fn latest_revision(&self) -> Revision {
        Revision(self.latest.load(Ordering::SeqCst))
    }

    /// Save `snapshot` once the debounce passes, unless superseded first.
    pub fn schedule(&self, snapshot: DocumentSnapshot) -> JoinHandle<SaveOutcome> {
        let revision = snapshot.revision;
        self.latest.fetch_max(revision.get(), Ordering::SeqCst);
        tracing::trace!(%revision, "save scheduled");

        let latest = self.latest.clone();
        let debounce = self.debounce;
        let codec = self.codec.clone();
        let sink = self.sink.clone();
        self.handle.spawn(async move {
            tokio::time::sleep(debounce).await;
            if latest.load(Ordering::SeqCst) != revision.get() {
                tracing::trace!(%revision, "save superseded before encoding");
                return SaveOutcome::Superseded(revision);
            }

            let encoded = tokio::task::spawn_blocking(move || {
                let cursor_offset = snapshot.cursor_offset();
                codec
                    .serialize(&snapshot.document, &snapshot.registry)
                    .map(|bytes| SavePayload {
                        revision,
                        bytes,
                        cursor_offset,
                    })
            })
            .await;

            let payload = match encoded {
                Ok(Ok(payload)) => payload,
                Ok(Err(err)) => {
                    tracing::warn!(%revision, error = %err, "save encoding failed");
                    return SaveOutcome::Failed(revision);
                }
                Err(err) => {
                    tracing::warn!(%revision, error = %err, "save task did not finish");
                    return SaveOutcome::Failed(revision);
                }
            };

            if latest.load(Ordering::SeqCst) != revision.get() {
                tracing::trace!(%revision, "save superseded after encoding");
                return SaveOutcome::Superseded(revision);
            }
            tracing::debug!(%revision, bytes = payload.bytes.len(), "saving document");
            sink.store(payload);
            SaveOutcome::Saved(revision)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use inkpad_editor_core::{Content, StyleSet, StyledDocument};

    #[derive(Default)]
    struct MemorySink {
        stored: Mutex<Vec<SavePayload>>,
    }

    impl SnapshotSink for MemorySink {
        fn store(&self, payload: SavePayload) {
            self.stored.lock().unwrap().push(payload);
        }
    }

    fn scheduler(sink: Arc<MemorySink>) -> SaveScheduler {
        SaveScheduler::new(
            Handle::current(),
            &SaveConfig { debounce_ms: 500 },
            Arc::new(PersistenceCodec::default()),
            sink,
        )
    }

    fn snapshot(doc: &StyledDocument) -> DocumentSnapshot {
        DocumentSnapshot::capture(doc, &Default::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_latest_snapshot_is_saved() {
        let sink = Arc::new(MemorySink::default());
        let saves = scheduler(sink.clone());

        let mut doc = StyledDocument::new();
        doc.replace(0..0, Content::text("a", StyleSet::PLAIN)).unwrap();
        let first = saves.schedule(snapshot(&doc));
        doc.replace(1..1, Content::text("b", StyleSet::PLAIN)).unwrap();
        let second = saves.schedule(snapshot(&doc));

        assert_eq!(first.await.unwrap(), SaveOutcome::Superseded(Revision(1)));
        assert_eq!(second.await.unwrap(), SaveOutcome::Saved(Revision(2)));

        let stored = sink.stored.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].revision, Revision(2));
        let text = String::from_utf8(stored[0].bytes.as_bytes().to_vec()).unwrap();
        assert!(text.contains("\"ab\""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_saves_both_land() {
        let sink = Arc::new(MemorySink::default());
        let saves = scheduler(sink.clone());

        let mut doc = StyledDocument::new();
        doc.replace(0..0, Content::text("a", StyleSet::PLAIN)).unwrap();
        let first = saves.schedule(snapshot(&doc));
        assert_eq!(first.await.unwrap(), SaveOutcome::Saved(Revision(1)));

        doc.replace(1..1, Content::text("b", StyleSet::PLAIN)).unwrap();
        let second = saves.schedule(snapshot(&doc));
        assert_eq!(second.await.unwrap(), SaveOutcome::Saved(Revision(2)));
        assert_eq!(sink.stored.lock().unwrap().len(), 2);
        assert_eq!(saves.latest_revision(), Revision(2));
    }
}
