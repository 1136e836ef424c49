//! Session-level errors.

use inkpad_editor_codec::CodecError;
use inkpad_editor_core::{AttachmentNotFound, EditError, RangeError};
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Attachment(#[from] AttachmentNotFound),
}
