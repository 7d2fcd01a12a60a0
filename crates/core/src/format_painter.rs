//! Format painter
//!
//! Copies the visual format of one annotation and applies it once to another
//! annotation of the same kind.

use tracing::debug;

use crate::annotation::{AnnotationId, AnnotationKind, HighlightStyle};
use crate::store::AnnotationStore;

/// Text styling shared by notes and floating texts
///
/// Unset fields fall back to the target's own value on apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextFormat {
    pub color: Option<String>,
    pub font_size: Option<f64>,
    pub font_family: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
}

/// Kind-specific subset of fields captured by a copy
#[derive(Debug, Clone, PartialEq)]
pub enum FormatFields {
    Highlight { color: String, style: HighlightStyle },
    Text(TextFormat),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CopiedFormat {
    /// Kind of the annotation the format was copied from
    pub source: AnnotationKind,
    pub fields: FormatFields,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PainterState {
    #[default]
    Idle,
    Armed(CopiedFormat),
}

#[derive(Debug, Clone, Default)]
pub struct FormatPainter {
    state: PainterState,
}

impl FormatPainter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PainterState {
        &self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, PainterState::Armed(_))
    }

    /// Drop any copied format
    pub fn reset(&mut self) {
        self.state = PainterState::Idle;
    }

    /// Capture the format of `id` and arm the painter
    ///
    /// Drawings carry no copyable format. Returns false (and leaves the
    /// painter untouched) when the source does not exist.
    pub fn copy_format(&mut self, store: &AnnotationStore, id: &AnnotationId, kind: AnnotationKind) -> bool {
        let set = store.set();
        let fields = match kind {
            AnnotationKind::Highlight => set
                .highlight(id)
                .map(|h| FormatFields::Highlight { color: h.color.clone(), style: h.style }),
            AnnotationKind::Note => set.note(id).map(|n| {
                FormatFields::Text(TextFormat {
                    color: n.color.clone(),
                    font_size: n.font_size,
                    font_family: n.font_family.clone(),
                    bold: n.bold,
                    italic: n.italic,
                    underline: n.underline,
                })
            }),
            AnnotationKind::FloatingText => set.floating_text(id).map(|t| {
                FormatFields::Text(TextFormat {
                    color: Some(t.color.clone()),
                    font_size: Some(t.size),
                    font_family: Some(t.font.clone()),
                    bold: t.bold,
                    italic: t.italic,
                    underline: t.underline,
                })
            }),
            AnnotationKind::Drawing => None,
        };

        match fields {
            Some(fields) => {
                debug!(%id, source = %kind, "format copied");
                self.state = PainterState::Armed(CopiedFormat { source: kind, fields });
                true
            }
            None => false,
        }
    }

    /// Apply the armed format to `id`
    ///
    /// A no-op while idle, on a kind mismatch, or when the target is missing;
    /// the painter then stays as it was. A successful apply disarms it.
    pub fn apply_format(&mut self, store: &mut AnnotationStore, id: &AnnotationId, kind: AnnotationKind) -> bool {
        let PainterState::Armed(copied) = &self.state else {
            return false;
        };
        if copied.source != kind {
            debug!(armed = %copied.source, target = %kind, "format kind mismatch ignored");
            return false;
        }

        let applied = match (&copied.fields, kind) {
            (FormatFields::Highlight { color, style }, AnnotationKind::Highlight) => {
                match store.set().highlight(id) {
                    Some(target) => {
                        let mut restyled = target.clone();
                        restyled.color = color.clone();
                        restyled.style = *style;
                        store.replace_highlight(restyled)
                    }
                    None => false,
                }
            }
            (FormatFields::Text(format), AnnotationKind::Note) => {
                store.set().note(id).is_some() && store.update_note(id, format.clone().into())
            }
            (FormatFields::Text(format), AnnotationKind::FloatingText) => {
                store.set().floating_text(id).is_some()
                    && store.update_floating_text(id, format.clone().into())
            }
            _ => false,
        };

        if applied {
            debug!(%id, target = %kind, "format applied");
            self.state = PainterState::Idle;
        }
        applied
    }
}

impl From<TextFormat> for crate::store::NotePatch {
    fn from(format: TextFormat) -> Self {
        Self {
            color: format.color,
            font_size: format.font_size,
            font_family: format.font_family,
            bold: format.bold,
            italic: format.italic,
            underline: format.underline,
            ..Self::default()
        }
    }
}

impl From<TextFormat> for crate::store::FloatingTextPatch {
    fn from(format: TextFormat) -> Self {
        Self {
            color: format.color,
            size: format.font_size,
            font: format.font_family,
            bold: format.bold,
            italic: format.italic,
            underline: format.underline,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{ContainerPoint, Highlight};
    use crate::store::{FloatingTextDraft, NoteDraft};

    fn store_with_highlights() -> AnnotationStore {
        let mut store = AnnotationStore::new();
        store.add_highlight(Highlight {
            id: "src".into(),
            text: "source".into(),
            color: "green".into(),
            style: HighlightStyle::Wavy,
            timestamp: 0,
        });
        store.add_highlight(Highlight {
            id: "dst".into(),
            text: "target".into(),
            color: "yellow".into(),
            style: HighlightStyle::Classic,
            timestamp: 0,
        });
        store
    }

    #[test]
    fn test_highlight_to_highlight() {
        let mut store = store_with_highlights();
        let mut painter = FormatPainter::new();

        assert!(painter.copy_format(&store, &"src".into(), AnnotationKind::Highlight));
        assert!(painter.is_armed());
        assert!(painter.apply_format(&mut store, &"dst".into(), AnnotationKind::Highlight));

        let target = store.set().highlight(&"dst".into()).unwrap();
        assert_eq!(target.color, "green");
        assert_eq!(target.style, HighlightStyle::Wavy);
        assert_eq!(target.text, "target");
        assert_eq!(*painter.state(), PainterState::Idle);
    }

    #[test]
    fn test_single_use() {
        let mut store = store_with_highlights();
        let mut painter = FormatPainter::new();
        painter.copy_format(&store, &"src".into(), AnnotationKind::Highlight);
        assert!(painter.apply_format(&mut store, &"dst".into(), AnnotationKind::Highlight));
        assert!(!painter.apply_format(&mut store, &"src".into(), AnnotationKind::Highlight));
    }

    #[test]
    fn test_mismatch_is_noop_and_stays_armed() {
        let mut store = store_with_highlights();
        let note_id = store
            .add_note(NoteDraft { text: "n".into(), color: Some("pink".into()), ..NoteDraft::default() }, 0)
            .unwrap();
        let before = store.set().note(&note_id).cloned();

        let mut painter = FormatPainter::new();
        painter.copy_format(&store, &"src".into(), AnnotationKind::Highlight);
        assert!(!painter.apply_format(&mut store, &note_id, AnnotationKind::Note));

        assert_eq!(store.set().note(&note_id).cloned(), before);
        assert!(painter.is_armed());
    }

    #[test]
    fn test_idle_apply_is_noop() {
        let mut store = store_with_highlights();
        let mut painter = FormatPainter::new();
        assert!(!painter.apply_format(&mut store, &"dst".into(), AnnotationKind::Highlight));
        assert_eq!(store.set().highlight(&"dst".into()).unwrap().color, "yellow");
    }

    #[test]
    fn test_note_fields_fall_back_to_target() {
        let mut store = AnnotationStore::new();
        let source = store
            .add_note(NoteDraft { text: "a".into(), bold: Some(true), ..NoteDraft::default() }, 0)
            .unwrap();
        let target = store
            .add_note(
                NoteDraft { text: "b".into(), color: Some("blue".into()), font_size: Some(20.0), ..NoteDraft::default() },
                0,
            )
            .unwrap();

        let mut painter = FormatPainter::new();
        painter.copy_format(&store, &source, AnnotationKind::Note);
        assert!(painter.apply_format(&mut store, &target, AnnotationKind::Note));

        let note = store.set().note(&target).unwrap();
        assert_eq!(note.bold, Some(true));
        assert_eq!(note.color.as_deref(), Some("blue"));
        assert_eq!(note.font_size, Some(20.0));
        assert_eq!(note.text, "b");
    }

    #[test]
    fn test_floating_text_maps_size_and_font() {
        let mut store = AnnotationStore::new();
        let draft = |text: &str, size: f64, font: &str| FloatingTextDraft {
            text: text.into(),
            position: ContainerPoint::new(0.0, 0.0),
            size: Some(size),
            font: Some(font.into()),
            ..FloatingTextDraft::default()
        };
        let source = store.add_floating_text(draft("a", 28.0, "serif"), 0).unwrap();
        let target = store.add_floating_text(draft("b", 12.0, "mono"), 0).unwrap();

        let mut painter = FormatPainter::new();
        painter.copy_format(&store, &source, AnnotationKind::FloatingText);
        assert!(painter.apply_format(&mut store, &target, AnnotationKind::FloatingText));

        let text = store.set().floating_text(&target).unwrap();
        assert_eq!(text.size, 28.0);
        assert_eq!(text.font, "serif");
        assert_eq!(text.text, "b");
    }

    #[test]
    fn test_missing_target_keeps_armed() {
        let mut store = store_with_highlights();
        let mut painter = FormatPainter::new();
        painter.copy_format(&store, &"src".into(), AnnotationKind::Highlight);
        assert!(!painter.apply_format(&mut store, &"gone".into(), AnnotationKind::Highlight));
        assert!(painter.is_armed());
    }

    #[test]
    fn test_drawings_have_no_format() {
        let store = AnnotationStore::new();
        let mut painter = FormatPainter::new();
        assert!(!painter.copy_format(&store, &"d".into(), AnnotationKind::Drawing));
        assert!(!painter.is_armed());
    }
}
