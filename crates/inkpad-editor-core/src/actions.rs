//! Editor actions and proposed edits.
//!
//! `ProposedEdit` is what the editing surface asks permission for before it
//! mutates its own text; `InputKind` is the semantic intent read off it.
//! `EditorAction` covers the toolbar and other caller-driven operations.

use std::ops::Range;

use smol_str::SmolStr;

use crate::block::BlockFormat;
use crate::style::Style;

/// An edit the surface wants to make: replace `range` with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedEdit {
    pub range: Range<usize>,
    pub replacement: SmolStr,
    /// Which key removed text. Only meaningful for deletions.
    pub direction: DeleteDirection,
}

/// Delete content backward (Backspace) or forward (Delete key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteDirection {
    #[default]
    Backward,
    Forward,
}

impl ProposedEdit {
    pub fn new(range: Range<usize>, replacement: impl Into<SmolStr>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
            direction: DeleteDirection::Backward,
        }
    }

    pub fn with_direction(mut self, direction: DeleteDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Insert `text` at a caret.
    pub fn insert(offset: usize, text: impl Into<SmolStr>) -> Self {
        Self::new(offset..offset, text)
    }

    /// Backspace: delete the `len` chars before `offset`.
    pub fn backspace(offset: usize, len: usize) -> Self {
        Self::new(offset.saturating_sub(len)..offset, "")
    }

    /// Forward delete: remove the `len` chars after `offset`.
    pub fn forward_delete(offset: usize, len: usize) -> Self {
        Self::new(offset..offset + len, "").with_direction(DeleteDirection::Forward)
    }

    /// Semantic intent of this edit.
    pub fn input_kind(&self) -> InputKind {
        let caret = self.range.is_empty();
        match self.replacement.as_str() {
            "" if caret => InputKind::Noop,
            "" => InputKind::Delete,
            " " if caret => InputKind::Space,
            "\n" | "\r\n" if caret => InputKind::Newline,
            _ if caret => InputKind::InsertText,
            _ => InputKind::Replace,
        }
    }

    /// Replacement length in chars.
    pub fn replacement_len(&self) -> usize {
        self.replacement.chars().count()
    }
}

/// Semantic input types read off a proposed edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Empty range, empty replacement.
    Noop,
    /// A single space at a caret.
    Space,
    /// Enter at a caret.
    Newline,
    /// Any other text at a caret.
    InsertText,
    /// Removal of a non-empty range (backspace, delete, cut).
    Delete,
    /// Non-empty range replaced by text (paste over selection, autocorrect).
    Replace,
}

impl InputKind {
    pub fn is_deletion(&self) -> bool {
        matches!(self, InputKind::Delete)
    }

    pub fn is_insertion(&self) -> bool {
        matches!(
            self,
            InputKind::Space | InputKind::Newline | InputKind::InsertText
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentDirection {
    Increase,
    Decrease,
}

/// Caller-driven editor operations (toolbar, shortcuts, widget taps).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorAction {
    ToggleStyle(Style),
    ToggleBlockFormat(BlockFormat),
    ToggleCodeBlock,
    Indent(IndentDirection),
    Undo,
    Redo,
    /// Tap at a char offset, toggling a checkbox within tolerance.
    TapCheckbox { offset: usize },
    /// Insert a blank drawing on its own line at the cursor.
    InsertDrawing,
    SelectAll,
}
