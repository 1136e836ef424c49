//! Character styling carried by text runs.

use serde::{Deserialize, Serialize};

/// Inline styles the toolbar can toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    Bold,
    Italic,
    Underline,
    Strikethrough,
}

impl Style {
    pub const ALL: [Style; 4] = [
        Style::Bold,
        Style::Italic,
        Style::Underline,
        Style::Strikethrough,
    ];
}

/// Semantic foreground color. The presentation layer maps roles to theme colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForegroundRole {
    #[default]
    Primary,
    Secondary,
    Accent,
}

/// The full style of a text run.
///
/// `code_block` marks monospace block text. Block membership is read from this
/// flag only, never guessed from neighbouring styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StyleSet {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub code_block: bool,
    pub foreground: ForegroundRole,
}

impl StyleSet {
    /// Unstyled body text.
    pub const PLAIN: StyleSet = StyleSet {
        bold: false,
        italic: false,
        underline: false,
        strikethrough: false,
        code_block: false,
        foreground: ForegroundRole::Primary,
    };

    /// Plain text inside a code block.
    pub const CODE: StyleSet = StyleSet {
        code_block: true,
        ..StyleSet::PLAIN
    };

    pub fn has(&self, style: Style) -> bool {
        match style {
            Style::Bold => self.bold,
            Style::Italic => self.italic,
            Style::Underline => self.underline,
            Style::Strikethrough => self.strikethrough,
        }
    }

    pub fn set(&mut self, style: Style, on: bool) {
        match style {
            Style::Bold => self.bold = on,
            Style::Italic => self.italic = on,
            Style::Underline => self.underline = on,
            Style::Strikethrough => self.strikethrough = on,
        }
    }

    pub fn with(mut self, style: Style, on: bool) -> Self {
        self.set(style, on);
        self
    }

    pub fn with_code_block(mut self, on: bool) -> Self {
        self.code_block = on;
        self
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::PLAIN
    }
}
