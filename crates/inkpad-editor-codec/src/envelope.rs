//! The portable JSON envelope.
//!
//! Text is stored with attachments already expanded to markers. Style ranges
//! are char offsets into that expanded text; plain runs are not listed.

use inkpad_editor_core::{ForegroundRole, StyleSet};
use serde::{Deserialize, Serialize};

/// Version written by this build. Readers reject anything newer.
pub const FORMAT_VERSION: u32 = 1;

/// Serialized document bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PortableBytes(pub Vec<u8>);

impl PortableBytes {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for PortableBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for PortableBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PortableDocument {
    pub version: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<StyleRange>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_primary(role: &ForegroundRole) -> bool {
    *role == ForegroundRole::Primary
}

/// Styling over `start..end` (chars) of the envelope text.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StyleRange {
    pub start: usize,
    pub end: usize,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
    #[serde(default, skip_serializing_if = "is_primary")]
    pub foreground: ForegroundRole,
}

impl StyleRange {
    pub fn new(start: usize, end: usize, style: &StyleSet) -> Self {
        Self {
            start,
            end,
            bold: style.bold,
            italic: style.italic,
            underline: style.underline,
            strikethrough: style.strikethrough,
            code: style.code_block,
            foreground: style.foreground,
        }
    }

    /// Write these flags onto `style`. Flags only ever get set.
    pub fn apply(&self, style: &mut StyleSet) {
        style.bold |= self.bold;
        style.italic |= self.italic;
        style.underline |= self.underline;
        style.strikethrough |= self.strikethrough;
        style.code_block |= self.code;
        if self.foreground != ForegroundRole::Primary {
            style.foreground = self.foreground;
        }
    }
}
