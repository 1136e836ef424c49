//! inkpad-editor-session: one open note wired to its editing surface.
//!
//! This crate provides:
//! - `EditingSession` - routes surface edits through autoformat, undo and the model
//! - `EditSynchronizer` - latches that stop updates bouncing between model and surface
//! - `DocumentObserver` implementations for widget counts and autosave

pub mod error;
pub mod observer;
pub mod session;
pub mod sync;

pub use error::SessionError;
pub use observer::{
    AutosaveObserver, ChangeOrigin, DocumentChange, DocumentObserver, WidgetCountPublisher,
};
pub use session::{EditResponse, EditingSession, SurfaceUpdate};
pub use sync::{EditSynchronizer, SyncLatches, clamp_range, clamp_selection};
