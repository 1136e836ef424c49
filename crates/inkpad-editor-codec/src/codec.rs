//! Document ⇄ portable bytes.

use inkpad_editor_core::{
    AttachmentKind, AttachmentRef, AttachmentRegistry, CheckboxWidget, DrawingConfig, Segment,
    StyleSet, StyledDocument, TextRun, Widget, OBJECT_REPLACEMENT,
};
use smol_str::SmolStr;

use crate::envelope::{FORMAT_VERSION, PortableBytes, PortableDocument, StyleRange};
use crate::error::{CodecError, CodecWarning};
use crate::marker::{self, MARKER_DELIMITER, MarkerToken};

/// A loaded document with its widgets.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub document: StyledDocument,
    pub registry: AttachmentRegistry,
    pub warnings: Vec<CodecWarning>,
}

#[derive(Debug, Clone, Default)]
pub struct PersistenceCodec {
    drawing: DrawingConfig,
}

impl PersistenceCodec {
    /// `drawing` supplies the defaults for drawings whose markers are unreadable
    /// and the height bounds loaded drawings are clamped to.
    pub fn new(drawing: DrawingConfig) -> Self {
        Self { drawing }
    }

    /// Build the envelope for a document.
    ///
    /// Attachments are expanded to marker text and literal delimiters in text
    /// runs are escaped. A ref the registry does not hold is written as a
    /// default widget of its kind.
    pub fn to_portable(&self, doc: &StyledDocument, registry: &AttachmentRegistry) -> PortableDocument {
        let mut text = String::with_capacity(doc.len());
        let mut styles = Vec::new();
        let mut offset = 0;

        for segment in doc.segments() {
            match segment {
                Segment::Text(run) => {
                    let escaped = marker::escape_text(&run.text);
                    let len = escaped.chars().count();
                    if !run.style.is_plain() {
                        styles.push(StyleRange::new(offset, offset + len, &run.style));
                    }
                    text.push_str(&escaped);
                    offset += len;
                }
                Segment::Attachment(r) => {
                    let token = match registry.get(r.id) {
                        Some(widget) if widget.kind() == r.kind => marker::encode(widget),
                        _ => {
                            tracing::warn!(id = %r.id, kind = ?r.kind, "serializing attachment missing from registry");
                            marker::encode(&self.default_widget(r, registry))
                        }
                    };
                    offset += token.chars().count();
                    text.push_str(&token);
                }
            }
        }

        PortableDocument {
            version: FORMAT_VERSION,
            text,
            styles,
        }
    }

    pub fn serialize(
        &self,
        doc: &StyledDocument,
        registry: &AttachmentRegistry,
    ) -> Result<PortableBytes, CodecError> {
        let portable = self.to_portable(doc, registry);
        let bytes = serde_json::to_vec(&portable)?;
        tracing::trace!(
            revision = %doc.revision(),
            chars = doc.len(),
            bytes = bytes.len(),
            "serialized document"
        );
        Ok(PortableBytes(bytes))
    }

    /// Load a document.
    ///
    /// Only an unreadable envelope fails. Marker and style problems degrade to
    /// default widgets or plain text and are reported as warnings.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Decoded, CodecError> {
        let portable: PortableDocument = serde_json::from_slice(bytes)?;
        self.from_portable(portable)
    }

    pub fn from_portable(&self, portable: PortableDocument) -> Result<Decoded, CodecError> {
        if portable.version == 0 || portable.version > FORMAT_VERSION {
            return Err(CodecError::UnsupportedVersion {
                found: portable.version,
                supported: FORMAT_VERSION,
            });
        }

        let mut warnings = Vec::new();
        let chars: Vec<char> = portable.text.chars().collect();
        let styles = char_styles(&portable.styles, chars.len(), &mut warnings);

        let mut registry = AttachmentRegistry::new(self.drawing.clone());
        let mut splices = Vec::new();
        for token in marker::scan(&portable.text) {
            match marker::decode(&token, &registry) {
                marker::Decoded::Widget(widget) => {
                    let r = restore(&mut registry, widget);
                    splices.push((token.range, Splice::Attachment(r)));
                }
                marker::Decoded::Malformed { widget, reason } => {
                    tracing::warn!(offset = token.range.start, kind = %token.kind, %reason, "malformed marker");
                    warnings.push(CodecWarning::MalformedMarker {
                        offset: token.range.start,
                        kind: token.kind.clone(),
                        reason,
                    });
                    let r = restore(&mut registry, widget);
                    splices.push((token.range, Splice::Attachment(r)));
                }
                marker::Decoded::Delimiter => splices.push((token.range, Splice::Delimiter)),
                marker::Decoded::Unknown => {
                    tracing::warn!(offset = token.range.start, kind = %token.kind, "unknown marker kind");
                    warnings.push(unknown(&token));
                }
            }
        }

        let document = StyledDocument::from_segments(build_segments(&chars, &styles, &splices));
        tracing::debug!(
            chars = document.len(),
            attachments = registry.len(),
            warnings = warnings.len(),
            "deserialized document"
        );
        Ok(Decoded {
            document,
            registry,
            warnings,
        })
    }

    /// Serialize, load again and compare.
    ///
    /// Reports an `EncodingLoss` for each of visible text, attachments and
    /// styling that did not come back unchanged.
    pub fn verify_round_trip(
        &self,
        doc: &StyledDocument,
        registry: &AttachmentRegistry,
    ) -> Vec<CodecWarning> {
        let decoded = match self
            .serialize(doc, registry)
            .and_then(|bytes| self.deserialize(bytes.as_bytes()))
        {
            Ok(decoded) => decoded,
            Err(err) => {
                return vec![CodecWarning::EncodingLoss {
                    detail: format!("document did not reload: {err}"),
                }];
            }
        };

        let mut losses = Vec::new();
        if doc.text() != decoded.document.text() {
            losses.push("visible text differs".to_string());
        }

        let before = payloads(doc, registry);
        let after = payloads(&decoded.document, &decoded.registry);
        if before.len() != after.len() {
            losses.push(format!(
                "attachment count changed from {} to {}",
                before.len(),
                after.len()
            ));
        } else if let Some(i) = before.iter().zip(&after).position(|(a, b)| a != b) {
            losses.push(format!("payload of attachment {i} changed"));
        }

        if styled_text(doc) != styled_text(&decoded.document) {
            losses.push("styling differs".to_string());
        }

        losses
            .into_iter()
            .map(|detail| {
                tracing::warn!(%detail, "round trip lost information");
                CodecWarning::EncodingLoss { detail }
            })
            .collect()
    }

    fn default_widget(&self, r: &AttachmentRef, registry: &AttachmentRegistry) -> Widget {
        match r.kind {
            AttachmentKind::Checkbox => Widget::Checkbox(CheckboxWidget {
                id: r.id,
                checked: false,
            }),
            AttachmentKind::Drawing => Widget::Drawing(registry.default_drawing(r.id)),
        }
    }
}

fn restore(registry: &mut AttachmentRegistry, widget: Widget) -> AttachmentRef {
    let kind = widget.kind();
    AttachmentRef {
        id: registry.restore(widget),
        kind,
    }
}

fn unknown(token: &MarkerToken) -> CodecWarning {
    CodecWarning::UnknownMarker {
        offset: token.range.start,
        kind: token.kind.clone(),
    }
}

/// Per-char styles from the envelope's style ranges.
fn char_styles(ranges: &[StyleRange], len: usize, warnings: &mut Vec<CodecWarning>) -> Vec<StyleSet> {
    let mut styles = vec![StyleSet::PLAIN; len];
    for range in ranges {
        if range.start > range.end || range.end > len {
            warnings.push(CodecWarning::StyleOutOfRange {
                start: range.start,
                end: range.end,
                len,
            });
            continue;
        }
        for style in &mut styles[range.start..range.end] {
            range.apply(style);
        }
    }
    styles
}

/// What a decoded marker range is replaced with.
#[derive(Debug, Clone, Copy)]
enum Splice {
    Attachment(AttachmentRef),
    Delimiter,
}

/// Segments for the envelope text with marker ranges swapped for attachments
/// and escaped delimiters.
///
/// Stray object replacement chars in the text are dropped.
fn build_segments(
    chars: &[char],
    styles: &[StyleSet],
    splices: &[(std::ops::Range<usize>, Splice)],
) -> Vec<Segment> {
    let mut builder = RunBuilder::default();
    let mut next = splices.iter().peekable();
    let mut i = 0;

    while i < chars.len() {
        if let Some((range, splice)) = next.peek() {
            if range.start == i {
                match splice {
                    Splice::Attachment(r) => builder.attachment(*r),
                    Splice::Delimiter => builder.push(MARKER_DELIMITER, styles[i]),
                }
                i = range.end;
                next.next();
                continue;
            }
        }
        if chars[i] != OBJECT_REPLACEMENT {
            builder.push(chars[i], styles[i]);
        }
        i += 1;
    }
    builder.finish()
}

#[derive(Default)]
struct RunBuilder {
    segments: Vec<Segment>,
    run: String,
    style: StyleSet,
}

impl RunBuilder {
    fn push(&mut self, c: char, style: StyleSet) {
        if style != self.style {
            self.flush();
            self.style = style;
        }
        self.run.push(c);
    }

    fn attachment(&mut self, r: AttachmentRef) {
        self.flush();
        self.segments.push(Segment::Attachment(r));
    }

    fn flush(&mut self) {
        if !self.run.is_empty() {
            let text = std::mem::take(&mut self.run);
            self.segments.push(Segment::Text(TextRun::new(text, self.style)));
        }
    }

    fn finish(mut self) -> Vec<Segment> {
        self.flush();
        self.segments
    }
}

/// Attachment payloads in document order, ids left out.
#[derive(Debug, PartialEq, Eq)]
enum Payload {
    Checkbox(bool),
    Drawing {
        strokes: Option<Vec<u8>>,
        height: u32,
        color: SmolStr,
    },
    Missing(AttachmentKind),
}

fn payloads(doc: &StyledDocument, registry: &AttachmentRegistry) -> Vec<Payload> {
    doc.attachments()
        .map(|(_, r)| match registry.get(r.id) {
            Some(Widget::Checkbox(w)) => Payload::Checkbox(w.checked),
            Some(Widget::Drawing(w)) => Payload::Drawing {
                strokes: w.stroke_data.clone().filter(|b| !b.is_empty()),
                height: w.canvas_height,
                color: SmolStr::new_static(w.color.tag()),
            },
            None => Payload::Missing(r.kind),
        })
        .collect()
}

/// Text runs with their styles, attachments reduced to their kind.
fn styled_text(doc: &StyledDocument) -> Vec<(String, Option<StyleSet>)> {
    doc.segments()
        .iter()
        .map(|segment| match segment {
            Segment::Text(run) => (run.text.clone(), Some(run.style)),
            Segment::Attachment(r) => (format!("{:?}", r.kind), None),
        })
        .collect()
}
