//! inkpad-editor-codec: portable serialization of notes.
//!
//! This crate provides:
//! - `PersistenceCodec` - document + widgets ⇄ JSON envelope bytes
//! - Marker grammar for checkbox and drawing attachments
//! - `DocumentSnapshot` and `SaveScheduler` for debounced background saves

pub mod codec;
pub mod envelope;
pub mod error;
pub mod marker;
pub mod save;
pub mod snapshot;

pub use codec::{Decoded, PersistenceCodec};
pub use envelope::{FORMAT_VERSION, PortableBytes, PortableDocument, StyleRange};
pub use error::{CodecError, CodecWarning};
pub use marker::MARKER_DELIMITER;
pub use save::{SaveOutcome, SaveScheduler, SnapshotSink};
pub use snapshot::{DocumentSnapshot, SavePayload};
