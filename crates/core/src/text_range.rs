//! Text-range annotation capability
//!
//! Highlights are realized by asking the host's rich-text layer to wrap a
//! range of document text in a tagged, stylable span. The host may refuse
//! (for example when the range crosses a structural boundary); the highlight
//! is then abandoned and the store is left untouched.

use thiserror::Error;
use tracing::{debug, warn};

use crate::annotation::{AnnotationId, Highlight, HighlightStyle};
use crate::clock::Timestamp;
use crate::store::AnnotationStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TextRangeError {
    #[error("selection is empty")]
    Empty,

    #[error("range {start}..{end} is outside the document (length {len})")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("offset {0} is not on a character boundary")]
    NotCharBoundary(usize),

    #[error("range {start}..{end} crosses a paragraph boundary")]
    CrossesBoundary { start: usize, end: usize },

    #[error("range overlaps existing highlight {0}")]
    Overlaps(AnnotationId),

    #[error("no span tagged {0}")]
    UnknownSpan(AnnotationId),
}

/// Half-open byte range `[start, end)` of document text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Tag and styling carried by a wrapped span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    pub id: AnnotationId,
    pub color: String,
    pub style: HighlightStyle,
}

/// Host primitive that wraps document text in tagged spans
pub trait TextRangeAnnotator {
    /// Wrap `range` with `span`, returning the wrapped text
    fn wrap(&mut self, range: TextRange, span: HighlightSpan) -> Result<String, TextRangeError>;

    /// Restyle an existing span after its highlight was format-painted
    fn restyle(&mut self, _span: &HighlightSpan) -> Result<(), TextRangeError> {
        Ok(())
    }
}

/// Wrap `range` and record the resulting highlight
///
/// On failure the error is logged and returned; no highlight is stored.
pub fn apply_highlight(
    annotator: &mut dyn TextRangeAnnotator,
    store: &mut AnnotationStore,
    range: TextRange,
    color: &str,
    style: HighlightStyle,
    timestamp: Timestamp,
) -> Result<AnnotationId, TextRangeError> {
    let span = HighlightSpan { id: AnnotationId::new(), color: color.to_owned(), style };
    let id = span.id.clone();

    let text = annotator.wrap(range, span).map_err(|error| {
        warn!(start = range.start, end = range.end, %error, "highlight abandoned");
        error
    })?;

    store.add_highlight(Highlight { id: id.clone(), text, color: color.to_owned(), style, timestamp });
    debug!(%id, "highlight applied");
    Ok(id)
}

/// Plain-text document with paragraph structure
///
/// Paragraphs are separated by a blank line; a span may not cross one, and
/// spans may not overlap.
#[derive(Debug, Clone, Default)]
pub struct PlainTextDocument {
    text: String,
    spans: Vec<(TextRange, HighlightSpan)>,
}

impl PlainTextDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), spans: Vec::new() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn spans(&self) -> &[(TextRange, HighlightSpan)] {
        &self.spans
    }

    pub fn span(&self, id: &AnnotationId) -> Option<&(TextRange, HighlightSpan)> {
        self.spans.iter().find(|(_, span)| &span.id == id)
    }

    /// Byte range of the first occurrence of `needle`
    pub fn find(&self, needle: &str) -> Option<TextRange> {
        self.text.find(needle).map(|start| TextRange::new(start, start + needle.len()))
    }
}

impl TextRangeAnnotator for PlainTextDocument {
    fn wrap(&mut self, range: TextRange, span: HighlightSpan) -> Result<String, TextRangeError> {
        let len = self.text.len();
        if range.start > range.end || range.end > len {
            return Err(TextRangeError::OutOfBounds { start: range.start, end: range.end, len });
        }
        for offset in [range.start, range.end] {
            if !self.text.is_char_boundary(offset) {
                return Err(TextRangeError::NotCharBoundary(offset));
            }
        }

        let selected = &self.text[range.start..range.end];
        if selected.trim().is_empty() {
            return Err(TextRangeError::Empty);
        }
        if selected.contains("\n\n") {
            return Err(TextRangeError::CrossesBoundary { start: range.start, end: range.end });
        }
        if let Some((_, existing)) = self.spans.iter().find(|(r, _)| r.overlaps(&range)) {
            return Err(TextRangeError::Overlaps(existing.id.clone()));
        }

        let selected = selected.to_owned();
        self.spans.push((range, span));
        Ok(selected)
    }

    fn restyle(&mut self, span: &HighlightSpan) -> Result<(), TextRangeError> {
        let slot = self
            .spans
            .iter_mut()
            .find(|(_, existing)| existing.id == span.id)
            .ok_or_else(|| TextRangeError::UnknownSpan(span.id.clone()))?;
        slot.1 = span.clone();
        Ok(())
    }
}
