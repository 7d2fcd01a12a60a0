//! Full-text search over annotation content
//!
//! Matches are case-insensitive substrings of highlight, note and floating
//! text bodies. Drawings carry no text and are never returned.

use serde::Serialize;

use crate::annotation::{AnnotationId, AnnotationKind, AnnotationSet};

/// Default preview length for highlights and notes, in characters
pub const DEFAULT_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub id: AnnotationId,
    pub text: String,
    pub preview: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Search `set` for `query`
///
/// Results are grouped highlights, then notes, then floating texts, each in
/// collection order. A blank query yields nothing.
pub fn search(set: &AnnotationSet, query: &str, preview_chars: usize) -> Vec<SearchResult> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();
    let matches = |text: &str| text.to_lowercase().contains(&needle);
    let preview = |text: &str| text.chars().take(preview_chars).collect::<String>();

    let highlights = set.highlights.iter().filter(|h| matches(&h.text)).map(|h| SearchResult {
        kind: AnnotationKind::Highlight,
        id: h.id.clone(),
        text: h.text.clone(),
        preview: preview(&h.text),
    });
    let notes = set.notes.iter().filter(|n| matches(&n.text)).map(|n| SearchResult {
        kind: AnnotationKind::Note,
        id: n.id.clone(),
        text: n.text.clone(),
        preview: preview(&n.text),
    });
    let texts = set.floating_texts.iter().filter(|t| matches(&t.text)).map(|t| SearchResult {
        kind: AnnotationKind::FloatingText,
        id: t.id.clone(),
        text: t.text.clone(),
        preview: t.text.clone(),
    });

    highlights.chain(notes).chain(texts).collect()
}

/// Result list with a wrapping cursor
#[derive(Debug, Clone)]
pub struct SearchEngine {
    query: String,
    results: Vec<SearchResult>,
    current: usize,
    preview_chars: usize,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_CHARS)
    }
}

impl SearchEngine {
    pub fn new(preview_chars: usize) -> Self {
        Self { query: String::new(), results: Vec::new(), current: 0, preview_chars }
    }

    /// Run a new query, resetting the cursor to the first result
    pub fn run(&mut self, set: &AnnotationSet, query: &str) -> &[SearchResult] {
        self.query = query.to_owned();
        self.results = search(set, query, self.preview_chars);
        self.current = 0;
        tracing::debug!(query, hits = self.results.len(), "search");
        &self.results
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    /// Index of the current result; `None` when there are no results
    pub fn current_index(&self) -> Option<usize> {
        (!self.results.is_empty()).then_some(self.current)
    }

    pub fn current(&self) -> Option<&SearchResult> {
        self.results.get(self.current)
    }

    /// Move the cursor with wraparound, returning the new index
    pub fn navigate(&mut self, direction: Direction) -> Option<usize> {
        let len = self.results.len();
        if len == 0 {
            return None;
        }
        self.current = match direction {
            Direction::Next => (self.current + 1) % len,
            Direction::Prev => (self.current + len - 1) % len,
        };
        Some(self.current)
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.results.clear();
        self.current = 0;
    }
}
