//! Codec errors and load warnings.

use smol_str::SmolStr;
use thiserror::Error;

/// The envelope itself could not be read. Marker problems never end up here.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CodecError {
    #[error("portable document envelope is invalid: {0}")]
    Envelope(#[from] serde_json::Error),

    #[error("unsupported portable format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Non-fatal problems found while loading or verifying a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecWarning {
    /// A known marker kind with a payload that did not parse. A default widget
    /// was substituted.
    #[error("malformed {kind} marker at offset {offset}: {reason}")]
    MalformedMarker {
        offset: usize,
        kind: SmolStr,
        reason: String,
    },

    /// A marker-shaped token of a kind this build does not know. It was kept
    /// as editable text.
    #[error("unknown marker kind {kind} at offset {offset}, kept as text")]
    UnknownMarker { offset: usize, kind: SmolStr },

    /// A style range pointing outside the text, dropped.
    #[error("style range {start}..{end} is outside text of length {len}")]
    StyleOutOfRange { start: usize, end: usize, len: usize },

    /// Serializing and loading again did not reproduce the document.
    #[error("round trip lost information: {detail}")]
    EncodingLoss { detail: String },
}
