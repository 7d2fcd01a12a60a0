//! Annotation store
//!
//! Single source of truth for the four annotation collections and the
//! per-layer visibility flags. Every mutation is synchronous and immediately
//! visible.
//!
//! Notes and floating texts support partial updates and deletion. Highlights
//! and drawings are created once: highlights can only be replaced wholesale
//! (format painting), drawings leave the layer only through erasure,
//! undo/redo or clearing.

use tracing::{debug, info};

use crate::annotation::{
    clamp_dimension, AnnotationCounts, AnnotationId, AnnotationKind, AnnotationSet, ContainerPoint,
    Drawing, FloatingText, Highlight, LayerVisibility, Note, NOTE_MIN_HEIGHT, NOTE_MIN_WIDTH,
};
use crate::clock::Timestamp;

/// Fallback values for fields a draft leaves unset
#[derive(Debug, Clone, PartialEq)]
pub struct StoreDefaults {
    pub note_width: f64,
    pub note_height: f64,
    pub text_font: String,
    pub text_color: String,
    pub text_size: f64,
}

impl Default for StoreDefaults {
    fn default() -> Self {
        Self {
            note_width: 250.0,
            note_height: 150.0,
            text_font: "sans".to_owned(),
            text_color: "yellow".to_owned(),
            text_size: 16.0,
        }
    }
}

/// Fields of a note about to be created
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteDraft {
    pub text: String,
    pub selected_text: Option<String>,
    pub position: ContainerPoint,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub color: Option<String>,
    pub font_size: Option<f64>,
    pub font_family: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
}

/// Partial note update; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotePatch {
    pub text: Option<String>,
    pub selected_text: Option<String>,
    pub position: Option<ContainerPoint>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub color: Option<String>,
    pub font_size: Option<f64>,
    pub font_family: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
}

/// Fields of a floating text about to be created
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloatingTextDraft {
    pub text: String,
    pub position: ContainerPoint,
    pub font: Option<String>,
    pub color: Option<String>,
    pub size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
}

/// Partial floating text update; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloatingTextPatch {
    pub text: Option<String>,
    pub position: Option<ContainerPoint>,
    pub font: Option<String>,
    pub color: Option<String>,
    pub size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    set: AnnotationSet,
    visibility: LayerVisibility,
    defaults: StoreDefaults,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: StoreDefaults) -> Self {
        Self { defaults, ..Self::default() }
    }

    pub fn set(&self) -> &AnnotationSet {
        &self.set
    }

    pub fn drawings(&self) -> &[Drawing] {
        &self.set.drawings
    }

    pub fn counts(&self) -> AnnotationCounts {
        self.set.counts()
    }

    // ---------------------------------------------------------------- layers

    pub fn visibility(&self) -> LayerVisibility {
        self.visibility
    }

    pub fn set_visibility(&mut self, visibility: LayerVisibility) {
        self.visibility = visibility;
    }

    pub fn set_layer_visible(&mut self, kind: AnnotationKind, visible: bool) {
        self.visibility.set(kind, visible);
    }

    /// Flip a layer and return its new visibility
    pub fn toggle_layer(&mut self, kind: AnnotationKind) -> bool {
        let visible = self.visibility.toggle(kind);
        debug!(layer = %kind, visible, "layer toggled");
        visible
    }

    // ------------------------------------------------------------ highlights

    /// Append a highlight; refused when the id is already taken
    pub fn add_highlight(&mut self, highlight: Highlight) -> bool {
        if self.set.highlight(&highlight.id).is_some() {
            return false;
        }
        debug!(id = %highlight.id, "highlight added");
        self.set.highlights.push(highlight);
        true
    }

    /// Swap a highlight for a restyled copy carrying the same id
    pub fn replace_highlight(&mut self, highlight: Highlight) -> bool {
        match self.set.highlights.iter_mut().find(|h| h.id == highlight.id) {
            Some(slot) => {
                *slot = highlight;
                true
            }
            None => false,
        }
    }

    // ----------------------------------------------------------------- notes

    /// Create a note; blank text creates nothing
    ///
    /// Width and height are clamped to the note minimums.
    pub fn add_note(&mut self, draft: NoteDraft, timestamp: Timestamp) -> Option<AnnotationId> {
        if draft.text.trim().is_empty() {
            return None;
        }

        let note = Note {
            id: AnnotationId::new(),
            text: draft.text,
            selected_text: draft.selected_text.filter(|s| !s.is_empty()),
            position: draft.position,
            width: clamp_dimension(draft.width.unwrap_or(self.defaults.note_width), NOTE_MIN_WIDTH),
            height: clamp_dimension(
                draft.height.unwrap_or(self.defaults.note_height),
                NOTE_MIN_HEIGHT,
            ),
            color: draft.color,
            font_size: draft.font_size,
            font_family: draft.font_family,
            bold: draft.bold,
            italic: draft.italic,
            underline: draft.underline,
            timestamp,
        };
        let id = note.id.clone();
        debug!(%id, "note added");
        self.set.notes.push(note);
        Some(id)
    }

    /// Merge the provided fields into a note
    pub fn update_note(&mut self, id: &AnnotationId, patch: NotePatch) -> bool {
        let Some(note) = self.set.notes.iter_mut().find(|n| &n.id == id) else {
            return false;
        };

        if let Some(text) = patch.text {
            note.text = text;
        }
        if let Some(selected_text) = patch.selected_text {
            note.selected_text = Some(selected_text);
        }
        if let Some(position) = patch.position {
            note.position = position;
        }
        if let Some(width) = patch.width {
            note.width = clamp_dimension(width, NOTE_MIN_WIDTH);
        }
        if let Some(height) = patch.height {
            note.height = clamp_dimension(height, NOTE_MIN_HEIGHT);
        }
        if patch.color.is_some() {
            note.color = patch.color;
        }
        if patch.font_size.is_some() {
            note.font_size = patch.font_size;
        }
        if patch.font_family.is_some() {
            note.font_family = patch.font_family;
        }
        if patch.bold.is_some() {
            note.bold = patch.bold;
        }
        if patch.italic.is_some() {
            note.italic = patch.italic;
        }
        if patch.underline.is_some() {
            note.underline = patch.underline;
        }
        debug!(%id, "note updated");
        true
    }

    pub fn delete_note(&mut self, id: &AnnotationId) -> bool {
        let before = self.set.notes.len();
        self.set.notes.retain(|n| &n.id != id);
        let removed = self.set.notes.len() != before;
        if removed {
            debug!(%id, "note deleted");
        }
        removed
    }

    // -------------------------------------------------------- floating texts

    /// Create a floating text; blank text creates nothing
    pub fn add_floating_text(
        &mut self,
        draft: FloatingTextDraft,
        timestamp: Timestamp,
    ) -> Option<AnnotationId> {
        if draft.text.trim().is_empty() {
            return None;
        }

        let text = FloatingText {
            id: AnnotationId::new(),
            text: draft.text,
            position: draft.position,
            font: draft.font.unwrap_or_else(|| self.defaults.text_font.clone()),
            color: draft.color.unwrap_or_else(|| self.defaults.text_color.clone()),
            size: draft.size.unwrap_or(self.defaults.text_size),
            bold: draft.bold,
            italic: draft.italic,
            underline: draft.underline,
            timestamp,
        };
        let id = text.id.clone();
        debug!(%id, "floating text added");
        self.set.floating_texts.push(text);
        Some(id)
    }

    /// Merge the provided fields into a floating text
    pub fn update_floating_text(&mut self, id: &AnnotationId, patch: FloatingTextPatch) -> bool {
        let Some(text) = self.set.floating_texts.iter_mut().find(|t| &t.id == id) else {
            return false;
        };

        if let Some(value) = patch.text {
            text.text = value;
        }
        if let Some(position) = patch.position {
            text.position = position;
        }
        if let Some(font) = patch.font {
            text.font = font;
        }
        if let Some(color) = patch.color {
            text.color = color;
        }
        if let Some(size) = patch.size {
            text.size = size;
        }
        if patch.bold.is_some() {
            text.bold = patch.bold;
        }
        if patch.italic.is_some() {
            text.italic = patch.italic;
        }
        if patch.underline.is_some() {
            text.underline = patch.underline;
        }
        debug!(%id, "floating text updated");
        true
    }

    pub fn delete_floating_text(&mut self, id: &AnnotationId) -> bool {
        let before = self.set.floating_texts.len();
        self.set.floating_texts.retain(|t| &t.id != id);
        let removed = self.set.floating_texts.len() != before;
        if removed {
            debug!(%id, "floating text deleted");
        }
        removed
    }

    // -------------------------------------------------------------- drawings

    /// Append a committed stroke; refused when empty or when the id is taken
    pub fn add_drawing(&mut self, drawing: Drawing) -> bool {
        if drawing.points.is_empty() || self.set.drawing(&drawing.id).is_some() {
            return false;
        }
        self.set.drawings.push(drawing);
        true
    }

    /// Replace the whole drawings layer (undo/redo and erasure)
    pub fn set_drawings(&mut self, drawings: Vec<Drawing>) {
        self.set.drawings = drawings;
    }

    pub fn clear_drawings(&mut self) {
        self.set.drawings.clear();
        info!("all drawings cleared");
    }

    // ------------------------------------------------------------------- set

    pub fn clear_all(&mut self) {
        self.set = AnnotationSet::default();
        info!("all annotations cleared");
    }

    /// Swap in a whole new set (load/import; no merge)
    pub fn replace_all(&mut self, set: AnnotationSet) {
        info!(total = set.counts().total, "annotation set replaced");
        self.set = set;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{BrushType, HighlightStyle, InkPoint, PointerKind};

    fn note_draft(text: &str) -> NoteDraft {
        NoteDraft {
            text: text.to_owned(),
            position: ContainerPoint::new(10.0, 20.0),
            ..NoteDraft::default()
        }
    }

    fn highlight(id: &str) -> Highlight {
        Highlight {
            id: id.into(),
            text: "wrapped".to_owned(),
            color: "yellow".to_owned(),
            style: HighlightStyle::Classic,
            timestamp: 1,
        }
    }

    #[test]
    fn test_note_minimum_width_enforced() {
        let mut store = AnnotationStore::new();
        let id = store
            .add_note(NoteDraft { width: Some(100.0), height: Some(40.0), ..note_draft("hola") }, 5)
            .unwrap();
        let note = store.set().note(&id).unwrap();
        assert_eq!(note.width, 200.0);
        assert_eq!(note.height, 100.0);
        assert_eq!(note.timestamp, 5);
    }

    #[test]
    fn test_note_default_size() {
        let mut store = AnnotationStore::new();
        let id = store.add_note(note_draft("hola"), 0).unwrap();
        let note = store.set().note(&id).unwrap();
        assert_eq!((note.width, note.height), (250.0, 150.0));
    }

    #[test]
    fn test_blank_note_rejected() {
        let mut store = AnnotationStore::new();
        assert!(store.add_note(note_draft("   "), 0).is_none());
        assert_eq!(store.counts().notes, 0);
    }

    #[test]
    fn test_update_note_is_partial() {
        let mut store = AnnotationStore::new();
        let id = store
            .add_note(NoteDraft { color: Some("pink".into()), ..note_draft("first") }, 0)
            .unwrap();

        assert!(store.update_note(&id, NotePatch { text: Some("second".into()), width: Some(50.0), ..NotePatch::default() }));

        let note = store.set().note(&id).unwrap();
        assert_eq!(note.text, "second");
        assert_eq!(note.width, 200.0);
        assert_eq!(note.color.as_deref(), Some("pink"));
        assert_eq!(note.position, ContainerPoint::new(10.0, 20.0));
    }

    #[test]
    fn test_update_missing_note() {
        let mut store = AnnotationStore::new();
        assert!(!store.update_note(&"nope".into(), NotePatch::default()));
        assert!(!store.delete_note(&"nope".into()));
    }

    #[test]
    fn test_floating_text_crud() {
        let mut store = AnnotationStore::new();
        let id = store
            .add_floating_text(
                FloatingTextDraft {
                    text: "margin".into(),
                    position: ContainerPoint::new(1.0, 2.0),
                    ..FloatingTextDraft::default()
                },
                9,
            )
            .unwrap();
        {
            let text = store.set().floating_text(&id).unwrap();
            assert_eq!(text.font, "sans");
            assert_eq!(text.color, "yellow");
            assert_eq!(text.size, 16.0);
        }

        assert!(store.update_floating_text(&id, FloatingTextPatch { size: Some(24.0), ..FloatingTextPatch::default() }));
        assert_eq!(store.set().floating_text(&id).unwrap().size, 24.0);
        assert_eq!(store.set().floating_text(&id).unwrap().text, "margin");

        assert!(store.delete_floating_text(&id));
        assert_eq!(store.counts().floating_texts, 0);
    }

    #[test]
    fn test_highlight_ids_unique() {
        let mut store = AnnotationStore::new();
        assert!(store.add_highlight(highlight("h1")));
        assert!(!store.add_highlight(highlight("h1")));
        assert_eq!(store.counts().highlights, 1);
    }

    #[test]
    fn test_replace_highlight() {
        let mut store = AnnotationStore::new();
        store.add_highlight(highlight("h1"));
        let restyled = Highlight { color: "green".into(), style: HighlightStyle::Wavy, ..highlight("h1") };
        assert!(store.replace_highlight(restyled));
        assert_eq!(store.set().highlights[0].style, HighlightStyle::Wavy);
        assert!(!store.replace_highlight(highlight("missing")));
    }

    #[test]
    fn test_empty_drawing_refused() {
        let mut store = AnnotationStore::new();
        let drawing = Drawing {
            id: "d".into(),
            points: Vec::new(),
            color: "blue".into(),
            brush_type: BrushType::Thin,
            timestamp: 0,
            pointer_type: PointerKind::Mouse,
        };
        assert!(!store.add_drawing(drawing.clone()));

        let drawing = Drawing { points: vec![InkPoint::new(0.0, 0.0, 0.5, PointerKind::Mouse)], ..drawing };
        assert!(store.add_drawing(drawing.clone()));
        assert!(!store.add_drawing(drawing));
    }

    #[test]
    fn test_counts_and_clear_all() {
        let mut store = AnnotationStore::new();
        store.add_highlight(highlight("h1"));
        store.add_note(note_draft("n"), 0);
        assert_eq!(store.counts().total, 2);
        store.clear_all();
        assert!(store.set().is_empty());
    }

    #[test]
    fn test_visibility_toggle() {
        let mut store = AnnotationStore::new();
        assert!(!store.toggle_layer(AnnotationKind::Note));
        assert!(!store.visibility().notes);
        store.set_layer_visible(AnnotationKind::Note, true);
        assert!(store.visibility().notes);
    }
}
