//! Annotation persistence and JSON exchange
//!
//! The annotation set is saved and loaded through an [`AnnotationBackend`]
//! keyed by (document, user). Export/import use the same JSON shape:
//! `{highlights, notes, drawings, floatingTexts}` with camelCase keys.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::annotation::{
    clamp_dimension, AnnotationId, AnnotationKind, AnnotationSet, NOTE_MIN_HEIGHT, NOTE_MIN_WIDTH,
};

/// Malformed or unserializable annotation JSON
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("malformed annotation JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: AnnotationKind, id: AnnotationId },

    #[error("drawing {0} has no points")]
    EmptyStroke(AnnotationId),
}

/// Backend load/save failure
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Persistence collaborator for annotation sets
pub trait AnnotationBackend {
    /// Stored set for the pair, or `None` if nothing was saved yet
    fn load(&self, document_id: &str, user_id: &str) -> PersistenceResult<Option<AnnotationSet>>;

    fn save(&self, document_id: &str, user_id: &str, set: &AnnotationSet) -> PersistenceResult<()>;
}

/// Serialize the whole set as pretty-printed JSON
pub fn export_json(set: &AnnotationSet) -> Result<String, ExchangeError> {
    Ok(serde_json::to_string_pretty(set)?)
}

/// Parse and validate an exported set
///
/// Rejects unparsable JSON, duplicate ids within a collection and drawings
/// without points. Note sizes below the minimums are clamped.
pub fn import_json(json: &str) -> Result<AnnotationSet, ExchangeError> {
    let mut set: AnnotationSet = serde_json::from_str(json)?;
    validate(&set)?;

    for note in &mut set.notes {
        note.width = clamp_dimension(note.width, NOTE_MIN_WIDTH);
        note.height = clamp_dimension(note.height, NOTE_MIN_HEIGHT);
    }
    debug!(total = set.counts().total, "annotation JSON imported");
    Ok(set)
}

fn validate(set: &AnnotationSet) -> Result<(), ExchangeError> {
    fn unique<'a>(
        kind: AnnotationKind,
        ids: impl Iterator<Item = &'a AnnotationId>,
    ) -> Result<(), ExchangeError> {
        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(id) {
                return Err(ExchangeError::DuplicateId { kind, id: id.clone() });
            }
        }
        Ok(())
    }

    unique(AnnotationKind::Highlight, set.highlights.iter().map(|h| &h.id))?;
    unique(AnnotationKind::Note, set.notes.iter().map(|n| &n.id))?;
    unique(AnnotationKind::Drawing, set.drawings.iter().map(|d| &d.id))?;
    unique(AnnotationKind::FloatingText, set.floating_texts.iter().map(|t| &t.id))?;

    if let Some(empty) = set.drawings.iter().find(|d| d.points.is_empty()) {
        return Err(ExchangeError::EmptyStroke(empty.id.clone()));
    }
    Ok(())
}

/// Write an exported set to `path` atomically (temp file then rename)
pub fn save_to_file(set: &AnnotationSet, path: &Path) -> PersistenceResult<()> {
    let json = export_json(set)?;
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, json)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Read a set from `path`; `None` when the file does not exist
pub fn load_from_file(path: &Path) -> PersistenceResult<Option<AnnotationSet>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path)?;
    Ok(Some(import_json(&json)?))
}

/// Default export filename for a document
pub fn export_file_name(document_id: &str) -> PathBuf {
    let stem: String = document_id
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    PathBuf::from(format!("annotations-{stem}.json"))
}

/// In-process backend keeping exported JSON per (document, user)
///
/// Stores the serialized form so every save/load exercises the same path
/// as a remote backend would.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RefCell<HashMap<(String, String), String>>,
    fail_saves: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose saves always fail
    pub fn failing() -> Self {
        Self { fail_saves: true, ..Self::default() }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl AnnotationBackend for MemoryBackend {
    fn load(&self, document_id: &str, user_id: &str) -> PersistenceResult<Option<AnnotationSet>> {
        let entries = self.entries.borrow();
        match entries.get(&(document_id.to_owned(), user_id.to_owned())) {
            Some(json) => Ok(Some(import_json(json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, document_id: &str, user_id: &str, set: &AnnotationSet) -> PersistenceResult<()> {
        if self.fail_saves {
            return Err(PersistenceError::Unavailable("save rejected".to_owned()));
        }
        let json = export_json(set)?;
        self.entries.borrow_mut().insert((document_id.to_owned(), user_id.to_owned()), json);
        Ok(())
    }
}
