use std::fs;
use std::path::{Path, PathBuf};

use marginalia_core::persistence::{self, AnnotationBackend, PersistenceResult};
use marginalia_core::AnnotationSet;

use crate::encode_key;

/// Annotation backend storing one JSON file per (document, user)
///
/// Layout: `<root>/<document>/<user>.json`, written atomically.
#[derive(Debug, Clone)]
pub struct DirectoryBackend {
    root: PathBuf,
}

impl DirectoryBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, document_id: &str, user_id: &str) -> PathBuf {
        self.root
            .join(encode_key(document_id))
            .join(format!("{}.json", encode_key(user_id)))
    }
}

impl AnnotationBackend for DirectoryBackend {
    fn load(&self, document_id: &str, user_id: &str) -> PersistenceResult<Option<AnnotationSet>> {
        persistence::load_from_file(&self.path_for(document_id, user_id))
    }

    fn save(&self, document_id: &str, user_id: &str, set: &AnnotationSet) -> PersistenceResult<()> {
        let path = self.path_for(document_id, user_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        persistence::save_to_file(set, &path)?;
        tracing::debug!(document_id, user_id, path = %path.display(), "annotation set written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_core::{ContainerPoint, FloatingText, PersistenceError};

    fn sample_set() -> AnnotationSet {
        let mut set = AnnotationSet::new();
        set.floating_texts.push(FloatingText {
            id: "t1".into(),
            text: "al margen".into(),
            position: ContainerPoint::new(4.0, 8.0),
            font: "sans".into(),
            color: "orange".into(),
            size: 16.0,
            bold: Some(true),
            italic: None,
            underline: None,
            timestamp: 1_700_000_000_000,
        });
        set
    }

    #[test]
    fn save_and_load_round_trip() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let backend = DirectoryBackend::new(temp.path());

        backend.save("doc 1", "ana", &sample_set()).expect("save should succeed");
        let loaded = backend.load("doc 1", "ana").expect("load should succeed");

        assert_eq!(loaded, Some(sample_set()));
        assert!(backend.path_for("doc 1", "ana").exists());
    }

    #[test]
    fn missing_pair_loads_none() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let backend = DirectoryBackend::new(temp.path());

        backend.save("doc", "ana", &sample_set()).expect("save should succeed");
        assert_eq!(backend.load("doc", "luis").expect("load should succeed"), None);
        assert_eq!(backend.load("other", "ana").expect("load should succeed"), None);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let backend = DirectoryBackend::new(temp.path());
        let path = backend.path_for("doc", "ana");
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "{oops").expect("write");

        assert!(matches!(backend.load("doc", "ana"), Err(PersistenceError::Exchange(_))));
    }

    #[test]
    fn surface_session_persists_through_directory() {
        use marginalia_core::{
            AnnotationSurface, ContainerRect, EngineConfig, HeadlessHost, NoteDraft, RecordingCanvas,
            Tool,
        };

        let temp = tempfile::tempdir().expect("temp dir should be created");
        let storage = crate::Storage::with_root(temp.path());
        let backend = storage.annotation_backend();
        let host = || HeadlessHost::new(ContainerRect::new(0.0, 0.0, 640.0, 480.0), RecordingCanvas::new());

        let mut first = AnnotationSurface::new(host(), EngineConfig::default());
        first.set_tool(Tool::Note);
        first
            .add_note(NoteDraft { text: "revisar".into(), ..NoteDraft::default() })
            .expect("note should be created");
        first.toggle_layer(marginalia_core::AnnotationKind::Note);
        assert!(first.save(&backend, "doc", "ana"));
        storage.save_visibility("ana", &first.visibility()).expect("save should succeed");

        let mut second = AnnotationSurface::new(host(), EngineConfig::default());
        assert!(second.load(&backend, "doc", "ana"));
        second.set_visibility(storage.load_visibility("ana").expect("load should succeed"));

        assert_eq!(second.annotations(), first.annotations());
        assert!(!second.visibility().notes);
    }

    #[test]
    fn ids_cannot_escape_root() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let backend = DirectoryBackend::new(temp.path());
        let path = backend.path_for("../../etc", "passwd");
        assert!(path.starts_with(temp.path()));
        assert_eq!(path.components().count(), temp.path().components().count() + 2);
    }
}
