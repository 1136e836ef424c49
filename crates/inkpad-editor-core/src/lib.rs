//! inkpad-editor-core: rich-text note model without surface dependencies.
//!
//! This crate provides:
//! - `StyledDocument` - attributed text with inline attachment refs
//! - `AttachmentRegistry` - checkbox and drawing widget state
//! - Block classification, formatting toggles and autoformat rules
//! - `EditPlan` execution and snapshot undo history
//! - `EditingSurface` trait for the widget that displays the document

pub mod actions;
pub mod attachment;
pub mod autoformat;
pub mod block;
pub mod config;
pub mod document;
pub mod error;
pub mod execute;
pub mod formatting;
pub mod platform;
pub mod style;
pub mod text;
pub mod types;
pub mod undo;

pub use actions::{DeleteDirection, EditorAction, IndentDirection, InputKind, ProposedEdit};
pub use attachment::{
    AttachmentId, AttachmentKind, AttachmentRegistry, CheckboxWidget, DrawingWidget, InkColor,
    Widget, WidgetCounts,
};
pub use autoformat::{AutoformatEngine, Decision};
pub use block::{BlockFormat, LineInfo, LineMarker, classify_line, classify_range};
pub use config::{
    AutoformatConfig, CheckboxConfig, DrawingConfig, EditorConfig, SaveConfig, UndoConfig,
};
pub use document::{
    AttachmentRef, Content, OBJECT_REPLACEMENT, Piece, Segment, StyledDocument, TextRun,
};
pub use error::{AttachmentNotFound, EditError, RangeError};
pub use execute::{EditPlan, PlanOutcome, PlannedContent, StylePatch, apply_plan};
pub use formatting::{FormattingContext, StyleToggle};
pub use platform::{EditingSurface, SurfaceEvent};
pub use smol_str::SmolStr;
pub use style::{ForegroundRole, Style, StyleSet};
pub use text::TextIndex;
pub use types::{EditInfo, MARKER_ZONE, Revision, Selection};
pub use undo::{EditKind, UndoHistory, UndoManager};
