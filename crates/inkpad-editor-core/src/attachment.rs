//! Attachment widgets and the registry that owns them.
//!
//! The document only stores [`AttachmentRef`]s. Widget state (checkbox
//! checked flag, drawing strokes) lives here, keyed by [`AttachmentId`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DrawingConfig;
use crate::document::{AttachmentRef, StyledDocument};
use crate::error::AttachmentNotFound;

/// Stable identifier of an attachment widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(Uuid);

impl AttachmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AttachmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Checkbox,
    Drawing,
}

/// Fixed drawing palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InkColor {
    #[default]
    Black,
    Blue,
    Red,
    Green,
    Orange,
    Purple,
}

impl InkColor {
    pub const ALL: [InkColor; 6] = [
        InkColor::Black,
        InkColor::Blue,
        InkColor::Red,
        InkColor::Green,
        InkColor::Orange,
        InkColor::Purple,
    ];

    /// Stable tag used by the persistence format.
    pub fn tag(self) -> &'static str {
        match self {
            InkColor::Black => "black",
            InkColor::Blue => "blue",
            InkColor::Red => "red",
            InkColor::Green => "green",
            InkColor::Orange => "orange",
            InkColor::Purple => "purple",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.tag() == tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckboxWidget {
    pub id: AttachmentId,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawingWidget {
    pub id: AttachmentId,
    /// Opaque stroke bytes. `None` is an empty canvas.
    pub stroke_data: Option<Vec<u8>>,
    pub canvas_height: u32,
    pub color: InkColor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Widget {
    Checkbox(CheckboxWidget),
    Drawing(DrawingWidget),
}

impl Widget {
    pub fn id(&self) -> AttachmentId {
        match self {
            Widget::Checkbox(w) => w.id,
            Widget::Drawing(w) => w.id,
        }
    }

    pub fn kind(&self) -> AttachmentKind {
        match self {
            Widget::Checkbox(_) => AttachmentKind::Checkbox,
            Widget::Drawing(_) => AttachmentKind::Drawing,
        }
    }
}

/// Per-kind widget counts, as published to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WidgetCounts {
    pub checkboxes: usize,
    pub checked: usize,
    pub drawings: usize,
}

/// Arena of attachment widgets keyed by id.
#[derive(Debug, Clone, Default)]
pub struct AttachmentRegistry {
    widgets: HashMap<AttachmentId, Widget>,
    drawing: DrawingConfig,
}

impl AttachmentRegistry {
    pub fn new(drawing: DrawingConfig) -> Self {
        Self {
            widgets: HashMap::new(),
            drawing,
        }
    }

    pub fn drawing_config(&self) -> &DrawingConfig {
        &self.drawing
    }

    /// Create a widget of the given kind with default state.
    pub fn create(&mut self, kind: AttachmentKind) -> AttachmentId {
        let id = AttachmentId::new();
        let widget = match kind {
            AttachmentKind::Checkbox => Widget::Checkbox(CheckboxWidget { id, checked: false }),
            AttachmentKind::Drawing => Widget::Drawing(self.default_drawing(id)),
        };
        tracing::trace!(%id, ?kind, "created attachment");
        self.widgets.insert(id, widget);
        id
    }

    /// A blank drawing using the configured default height and color.
    pub fn default_drawing(&self, id: AttachmentId) -> DrawingWidget {
        DrawingWidget {
            id,
            stroke_data: None,
            canvas_height: self.drawing.default_height,
            color: self.drawing.default_color,
        }
    }

    pub fn get(&self, id: AttachmentId) -> Option<&Widget> {
        self.widgets.get(&id)
    }

    pub fn checkbox(&self, id: AttachmentId) -> Option<&CheckboxWidget> {
        match self.widgets.get(&id) {
            Some(Widget::Checkbox(w)) => Some(w),
            _ => None,
        }
    }

    pub fn drawing(&self, id: AttachmentId) -> Option<&DrawingWidget> {
        match self.widgets.get(&id) {
            Some(Widget::Drawing(w)) => Some(w),
            _ => None,
        }
    }

    pub fn contains(&self, id: AttachmentId) -> bool {
        self.widgets.contains_key(&id)
    }

    /// Remove a widget. The caller guarantees the document no longer references it.
    pub fn remove(&mut self, id: AttachmentId) -> Option<Widget> {
        self.widgets.remove(&id)
    }

    /// Flip a checkbox, returning the new checked state.
    pub fn toggle_checkbox(&mut self, id: AttachmentId) -> Result<bool, AttachmentNotFound> {
        match self.widgets.get_mut(&id) {
            Some(Widget::Checkbox(w)) => {
                w.checked = !w.checked;
                tracing::debug!(%id, checked = w.checked, "toggled checkbox");
                Ok(w.checked)
            }
            _ => Err(AttachmentNotFound(id)),
        }
    }

    /// Replace a drawing's strokes and color. Empty stroke bytes clear the canvas.
    pub fn update_drawing(
        &mut self,
        id: AttachmentId,
        stroke_data: Option<Vec<u8>>,
        color: InkColor,
    ) -> Result<(), AttachmentNotFound> {
        match self.widgets.get_mut(&id) {
            Some(Widget::Drawing(w)) => {
                w.stroke_data = stroke_data.filter(|bytes| !bytes.is_empty());
                w.color = color;
                Ok(())
            }
            _ => Err(AttachmentNotFound(id)),
        }
    }

    /// Resize a drawing, clamped to the configured height range.
    pub fn resize_drawing(
        &mut self,
        id: AttachmentId,
        height: u32,
    ) -> Result<u32, AttachmentNotFound> {
        let clamped = self.drawing.clamp_height(height);
        match self.widgets.get_mut(&id) {
            Some(Widget::Drawing(w)) => {
                w.canvas_height = clamped;
                Ok(clamped)
            }
            _ => Err(AttachmentNotFound(id)),
        }
    }

    /// Insert a widget with existing state (load or undo restore).
    ///
    /// Drawing heights are clamped on the way in.
    pub fn restore(&mut self, widget: Widget) -> AttachmentId {
        let widget = match widget {
            Widget::Drawing(mut w) => {
                w.canvas_height = self.drawing.clamp_height(w.canvas_height);
                Widget::Drawing(w)
            }
            other => other,
        };
        let id = widget.id();
        self.widgets.insert(id, widget);
        id
    }

    pub fn clear(&mut self) {
        self.widgets.clear();
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn checkbox_count(&self) -> usize {
        self.widgets
            .values()
            .filter(|w| matches!(w, Widget::Checkbox(_)))
            .count()
    }

    pub fn drawing_count(&self) -> usize {
        self.widgets
            .values()
            .filter(|w| matches!(w, Widget::Drawing(_)))
            .count()
    }

    pub fn counts(&self) -> WidgetCounts {
        let mut counts = WidgetCounts::default();
        for widget in self.widgets.values() {
            match widget {
                Widget::Checkbox(w) => {
                    counts.checkboxes += 1;
                    if w.checked {
                        counts.checked += 1;
                    }
                }
                Widget::Drawing(_) => counts.drawings += 1,
            }
        }
        counts
    }

    /// Remove the given refs from the registry unless the document still references them.
    pub fn release_unreferenced(
        &mut self,
        doc: &StyledDocument,
        refs: &[AttachmentRef],
    ) -> Vec<Widget> {
        if refs.is_empty() {
            return Vec::new();
        }
        let live: HashSet<AttachmentId> = doc.attachments().map(|(_, r)| r.id).collect();
        let mut released = Vec::new();
        for r in refs {
            if live.contains(&r.id) {
                continue;
            }
            if let Some(widget) = self.widgets.remove(&r.id) {
                tracing::trace!(id = %r.id, "released attachment");
                released.push(widget);
            }
        }
        released
    }

    /// Drop every widget the document does not reference.
    pub fn retain_referenced(&mut self, doc: &StyledDocument) -> usize {
        let live: HashSet<AttachmentId> = doc.attachments().map(|(_, r)| r.id).collect();
        let before = self.widgets.len();
        self.widgets.retain(|id, _| live.contains(id));
        before - self.widgets.len()
    }

    /// Every id the document references exists with the referenced kind.
    pub fn verify_references(&self, doc: &StyledDocument) -> Result<(), AttachmentNotFound> {
        for (_, r) in doc.attachments() {
            match self.widgets.get(&r.id) {
                Some(w) if w.kind() == r.kind => {}
                _ => return Err(AttachmentNotFound(r.id)),
            }
        }
        Ok(())
    }

    /// Widgets referenced by the document, in document order.
    pub fn referenced_widgets(&self, doc: &StyledDocument) -> Vec<Widget> {
        doc.attachments()
            .filter_map(|(_, r)| self.widgets.get(&r.id).cloned())
            .collect()
    }

    /// Resolve a tap at `tap_offset` to the nearest checkbox on the same line
    /// within `tolerance` chars of either edge of its cell.
    pub fn hit_test_checkbox(
        &self,
        doc: &StyledDocument,
        tap_offset: usize,
        tolerance: usize,
    ) -> Option<AttachmentId> {
        let line = doc.line_range(tap_offset.min(doc.len())).ok()?;
        doc.attachments()
            .filter(|(offset, r)| {
                r.kind == AttachmentKind::Checkbox && line.contains(offset) && self.contains(r.id)
            })
            .filter_map(|(offset, r)| {
                let distance = if tap_offset < offset {
                    offset - tap_offset
                } else {
                    tap_offset.saturating_sub(offset + 1)
                };
                (distance <= tolerance).then_some((distance, r.id))
            })
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, id)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Content, Segment};

    fn registry() -> AttachmentRegistry {
        AttachmentRegistry::new(DrawingConfig::default())
    }

    #[test]
    fn test_toggle_checkbox() {
        let mut reg = registry();
        let id = reg.create(AttachmentKind::Checkbox);
        assert_eq!(reg.toggle_checkbox(id), Ok(true));
        assert_eq!(reg.toggle_checkbox(id), Ok(false));

        let drawing = reg.create(AttachmentKind::Drawing);
        assert_eq!(reg.toggle_checkbox(drawing), Err(AttachmentNotFound(drawing)));
        let missing = AttachmentId::new();
        assert_eq!(reg.toggle_checkbox(missing), Err(AttachmentNotFound(missing)));
    }

    #[test]
    fn test_drawing_update_and_resize() {
        let mut reg = registry();
        let id = reg.create(AttachmentKind::Drawing);
        let config = DrawingConfig::default();
        assert_eq!(reg.drawing(id).map(|d| d.canvas_height), Some(config.default_height));

        reg.update_drawing(id, Some(vec![1, 2, 3]), InkColor::Red).unwrap();
        let drawing = reg.drawing(id).unwrap();
        assert_eq!(drawing.stroke_data.as_deref(), Some(&[1u8, 2, 3][..]));
        assert_eq!(drawing.color, InkColor::Red);

        reg.update_drawing(id, Some(Vec::new()), InkColor::Red).unwrap();
        assert_eq!(reg.drawing(id).unwrap().stroke_data, None);

        assert_eq!(reg.resize_drawing(id, 1), Ok(config.min_height));
        assert_eq!(reg.resize_drawing(id, u32::MAX), Ok(config.max_height));
    }

    #[test]
    fn test_ink_color_tags() {
        for color in InkColor::ALL {
            assert_eq!(InkColor::from_tag(color.tag()), Some(color));
        }
        assert_eq!(InkColor::from_tag("magenta"), None);
    }

    #[test]
    fn test_release_keeps_referenced() {
        let mut reg = registry();
        let kept = reg.create(AttachmentKind::Checkbox);
        let dropped = reg.create(AttachmentKind::Checkbox);
        let doc = StyledDocument::from_segments(vec![Segment::Attachment(AttachmentRef {
            id: kept,
            kind: AttachmentKind::Checkbox,
        })]);

        let refs = [
            AttachmentRef { id: kept, kind: AttachmentKind::Checkbox },
            AttachmentRef { id: dropped, kind: AttachmentKind::Checkbox },
        ];
        let released = reg.release_unreferenced(&doc, &refs);
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].id(), dropped);
        assert!(reg.contains(kept));
        assert!(reg.verify_references(&doc).is_ok());
    }

    #[test]
    fn test_hit_test_checkbox() {
        let mut reg = registry();
        let id = reg.create(AttachmentKind::Checkbox);
        let mut doc = StyledDocument::plain("intro\n task");
        // checkbox at offset 6, after the newline
        doc.replace(
            6..6,
            Content::Attachment(AttachmentRef { id, kind: AttachmentKind::Checkbox }),
        )
        .unwrap();

        assert_eq!(reg.hit_test_checkbox(&doc, 6, 0), Some(id));
        assert_eq!(reg.hit_test_checkbox(&doc, 7, 0), Some(id));
        assert_eq!(reg.hit_test_checkbox(&doc, 8, 1), Some(id));
        assert_eq!(reg.hit_test_checkbox(&doc, 10, 1), None);
        // previous line never matches
        assert_eq!(reg.hit_test_checkbox(&doc, 5, 5), None);
    }

    #[test]
    fn test_counts() {
        let mut reg = registry();
        let a = reg.create(AttachmentKind::Checkbox);
        reg.create(AttachmentKind::Checkbox);
        reg.create(AttachmentKind::Drawing);
        reg.toggle_checkbox(a).unwrap();
        assert_eq!(
            reg.counts(),
            WidgetCounts { checkboxes: 2, checked: 1, drawings: 1 }
        );
    }
}
