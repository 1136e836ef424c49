//! Attachment markers inside envelope text.
//!
//! Grammar, with `␞` (U+241E) as the delimiter:
//!
//! ```text
//! ␞CHECKBOX_UNCHECKED␞
//! ␞CHECKBOX_CHECKED␞
//! ␞DRAWING:<base64 strokes>:<height>:<color tag>␞
//! ␞DELIMITER␞
//! ```
//!
//! The delimiter never appears in base64, decimal digits or color tags, and
//! JSON leaves it unescaped. An empty base64 field is an empty canvas. A `␞`
//! typed into the note itself is written as `␞DELIMITER␞`, so every raw
//! delimiter in saved text opens or closes a marker.

use std::borrow::Cow;
use std::ops::Range;
use std::sync::LazyLock;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use inkpad_editor_core::{
    AttachmentId, AttachmentRegistry, CheckboxWidget, DrawingWidget, InkColor, Widget,
};
use regex::Regex;
use smol_str::SmolStr;

pub const MARKER_DELIMITER: char = '\u{241E}';

pub const CHECKBOX_CHECKED: &str = "CHECKBOX_CHECKED";
pub const CHECKBOX_UNCHECKED: &str = "CHECKBOX_UNCHECKED";
pub const DRAWING: &str = "DRAWING";
/// Stands for one literal `␞` of note text.
pub const DELIMITER: &str = "DELIMITER";

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x{241E}(?P<kind>[A-Z][A-Z_]*)(?::(?P<payload>[^\x{241E}\n]*))?\x{241E}").unwrap()
});

/// Marker text for a widget.
pub fn encode(widget: &Widget) -> String {
    match widget {
        Widget::Checkbox(w) => {
            let kind = if w.checked {
                CHECKBOX_CHECKED
            } else {
                CHECKBOX_UNCHECKED
            };
            format!("{MARKER_DELIMITER}{kind}{MARKER_DELIMITER}")
        }
        Widget::Drawing(w) => {
            let strokes = w
                .stroke_data
                .as_deref()
                .map(|bytes| BASE64.encode(bytes))
                .unwrap_or_default();
            format!(
                "{MARKER_DELIMITER}{DRAWING}:{strokes}:{}:{}{MARKER_DELIMITER}",
                w.canvas_height,
                w.color.tag()
            )
        }
    }
}

/// Note text with each literal delimiter replaced by its escape marker.
pub fn escape_text(text: &str) -> Cow<'_, str> {
    if text.contains(MARKER_DELIMITER) {
        Cow::Owned(text.replace(
            MARKER_DELIMITER,
            &format!("{MARKER_DELIMITER}{DELIMITER}{MARKER_DELIMITER}"),
        ))
    } else {
        Cow::Borrowed(text)
    }
}

/// A marker-shaped token found in envelope text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerToken {
    /// Char range of the whole token, delimiters included.
    pub range: Range<usize>,
    pub kind: SmolStr,
    pub payload: Option<String>,
}

/// Every marker token in `text`, in order, with char offsets.
pub fn scan(text: &str) -> Vec<MarkerToken> {
    let mut tokens = Vec::new();
    let mut chars_before = 0;
    let mut bytes_counted = 0;
    for caps in MARKER_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        chars_before += text[bytes_counted..whole.start()].chars().count();
        let len = whole.as_str().chars().count();
        tokens.push(MarkerToken {
            range: chars_before..chars_before + len,
            kind: caps
                .name("kind")
                .map(|m| SmolStr::new(m.as_str()))
                .unwrap_or_default(),
            payload: caps.name("payload").map(|m| m.as_str().to_string()),
        });
        chars_before += len;
        bytes_counted = whole.end();
    }
    tokens
}

/// What a marker token turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Widget(Widget),
    /// Known kind, unreadable payload. Carries the default widget to use instead.
    Malformed { widget: Widget, reason: String },
    /// An escaped `␞` of note text.
    Delimiter,
    Unknown,
}

/// Rebuild the widget a token describes, under a fresh id.
///
/// Drawing defaults come from `registry`'s drawing config.
pub fn decode(token: &MarkerToken, registry: &AttachmentRegistry) -> Decoded {
    let id = AttachmentId::new();
    match token.kind.as_str() {
        CHECKBOX_CHECKED | CHECKBOX_UNCHECKED => {
            let checked = token.kind == CHECKBOX_CHECKED;
            match &token.payload {
                None => Decoded::Widget(Widget::Checkbox(CheckboxWidget { id, checked })),
                Some(_) => Decoded::Malformed {
                    widget: Widget::Checkbox(CheckboxWidget { id, checked: false }),
                    reason: "checkbox markers take no payload".to_string(),
                },
            }
        }
        DRAWING => match parse_drawing(id, token.payload.as_deref()) {
            Ok(drawing) => Decoded::Widget(Widget::Drawing(drawing)),
            Err(reason) => Decoded::Malformed {
                widget: Widget::Drawing(registry.default_drawing(id)),
                reason,
            },
        },
        DELIMITER if token.payload.is_none() => Decoded::Delimiter,
        _ => Decoded::Unknown,
    }
}

fn parse_drawing(id: AttachmentId, payload: Option<&str>) -> Result<DrawingWidget, String> {
    let payload = payload.ok_or("missing drawing payload")?;
    let mut fields = payload.split(':');
    let (Some(strokes), Some(height), Some(color), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(format!("expected 3 fields, got {:?}", payload));
    };

    let stroke_data = if strokes.is_empty() {
        None
    } else {
        let bytes = BASE64
            .decode(strokes)
            .map_err(|e| format!("stroke data is not base64: {e}"))?;
        Some(bytes).filter(|b| !b.is_empty())
    };
    let canvas_height = height
        .parse::<u32>()
        .map_err(|e| format!("bad canvas height {height:?}: {e}"))?;
    let color = InkColor::from_tag(color).ok_or_else(|| format!("unknown color {color:?}"))?;

    Ok(DrawingWidget {
        id,
        stroke_data,
        canvas_height,
        color,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkpad_editor_core::DrawingConfig;

    fn token(text: &str) -> MarkerToken {
        scan(text).into_iter().next().unwrap()
    }

    #[test]
    fn test_scan_reports_char_offsets() {
        let text = "Bü ␞CHECKBOX_CHECKED␞ x ␞DRAWING::240:red␞";
        let tokens = scan(text);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].range, 3..21);
        assert_eq!(tokens[0].kind, "CHECKBOX_CHECKED");
        assert_eq!(tokens[0].payload, None);
        assert_eq!(tokens[1].range.start, 24);
        assert_eq!(tokens[1].payload.as_deref(), Some(":240:red"));
    }

    #[test]
    fn test_scan_ignores_lowercase_and_unclosed() {
        assert!(scan("␞checkbox␞").is_empty());
        assert!(scan("␞CHECKBOX_CHECKED").is_empty());
        assert!(scan("␞DRAWING:a\nb␞").is_empty());
    }

    #[test]
    fn test_drawing_marker_payload() {
        let widget = Widget::Drawing(DrawingWidget {
            id: AttachmentId::new(),
            stroke_data: Some(vec![1, 2, 3, 250]),
            canvas_height: 300,
            color: InkColor::Blue,
        });
        let text = encode(&widget);
        assert_eq!(text, "␞DRAWING:AQID+g==:300:blue␞");

        let registry = AttachmentRegistry::new(DrawingConfig::default());
        match decode(&token(&text), &registry) {
            Decoded::Widget(Widget::Drawing(d)) => {
                assert_eq!(d.stroke_data, Some(vec![1, 2, 3, 250]));
                assert_eq!(d.canvas_height, 300);
                assert_eq!(d.color, InkColor::Blue);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_malformed_drawing_falls_back_to_default() {
        let registry = AttachmentRegistry::new(DrawingConfig::default());
        for text in [
            "␞DRAWING:!!!:300:blue␞",
            "␞DRAWING::tall:blue␞",
            "␞DRAWING::300:mauve␞",
            "␞DRAWING::300␞",
            "␞DRAWING␞",
        ] {
            match decode(&token(text), &registry) {
                Decoded::Malformed {
                    widget: Widget::Drawing(d),
                    ..
                } => {
                    assert_eq!(d.stroke_data, None);
                    assert_eq!(d.canvas_height, DrawingConfig::default().default_height);
                }
                other => panic!("{text}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_unknown_kind() {
        let registry = AttachmentRegistry::default();
        assert_eq!(decode(&token("␞STICKER:cat␞"), &registry), Decoded::Unknown);
        assert_eq!(decode(&token("␞DELIMITER:x␞"), &registry), Decoded::Unknown);
    }

    #[test]
    fn test_escaped_delimiter_scans_as_its_own_token() {
        assert!(matches!(escape_text("plain"), Cow::Borrowed("plain")));

        let text = format!("note {}A{}", escape_text("␞"), encode(&checkbox()));
        assert_eq!(text, "note ␞DELIMITER␞A␞CHECKBOX_UNCHECKED␞");
        let tokens = scan(&text);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].range, 5..16);
        assert_eq!(tokens[1].kind, CHECKBOX_UNCHECKED);

        let registry = AttachmentRegistry::default();
        assert_eq!(decode(&tokens[0], &registry), Decoded::Delimiter);
    }

    fn checkbox() -> Widget {
        Widget::Checkbox(CheckboxWidget {
            id: AttachmentId::new(),
            checked: false,
        })
    }
}
