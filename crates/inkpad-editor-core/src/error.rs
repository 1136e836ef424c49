//! Error types for document and attachment operations.

use thiserror::Error;

use crate::attachment::AttachmentId;

/// A range or offset that the document cannot accept.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RangeError {
    /// Range reaches past the end of the document.
    #[error("range {start}..{end} is out of bounds for document of length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },

    /// Range end comes before its start.
    #[error("range {start}..{end} is inverted")]
    Inverted { start: usize, end: usize },

    /// Offset falls inside a grapheme cluster.
    #[error("offset {offset} splits a grapheme cluster")]
    SplitsGrapheme { offset: usize },
}

/// Lookup of an attachment id that the registry does not hold
/// (or holds as a different widget kind).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("attachment {0} not found")]
pub struct AttachmentNotFound(pub AttachmentId);

/// Failure while applying an edit plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EditError {
    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Attachment(#[from] AttachmentNotFound),
}
