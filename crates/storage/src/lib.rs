use directories::ProjectDirs;
use marginalia_core::LayerVisibility;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

mod backend;

pub use backend::DirectoryBackend;

const PREFS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported preferences version {0}")]
    UnsupportedVersion(u32),
}

/// User-scoped local key-value store
///
/// Holds view preferences that must survive reloads without going through
/// the annotation backend. The surface never writes here itself: the host
/// calls [`Storage::save_visibility`] after a layer toggle and seeds a new
/// surface with [`Storage::load_visibility`].
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VisibilityEnvelope {
    version: u32,
    visibility: LayerVisibility,
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "Marginalia", "Marginalia")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory-backed annotation backend rooted next to the preferences
    pub fn annotation_backend(&self) -> DirectoryBackend {
        DirectoryBackend::new(self.root.join("annotations"))
    }

    pub fn load_visibility(&self, user_id: &str) -> Result<LayerVisibility, StorageError> {
        let path = self.visibility_path(user_id);
        if !path.exists() {
            return Ok(LayerVisibility::default());
        }

        let bytes = fs::read(path)?;
        let envelope: VisibilityEnvelope = serde_json::from_slice(&bytes)?;
        if envelope.version > PREFS_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedVersion(envelope.version));
        }

        Ok(envelope.visibility)
    }

    pub fn save_visibility(&self, user_id: &str, visibility: &LayerVisibility) -> Result<(), StorageError> {
        let path = self.visibility_path(user_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let envelope = VisibilityEnvelope { version: PREFS_SCHEMA_VERSION, visibility: *visibility };

        let bytes = serde_json::to_vec_pretty(&envelope)?;
        fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), "layer visibility saved");
        Ok(())
    }

    fn visibility_path(&self, user_id: &str) -> PathBuf {
        self.root.join("preferences").join(format!("{}.layers.json", encode_key(user_id)))
    }
}

/// Turn an arbitrary id into a single safe path component
///
/// Bytes outside `[A-Za-z0-9_-]` are percent-encoded, so distinct ids never
/// collide and no id can escape its directory.
pub(crate) fn encode_key(key: &str) -> String {
    if key.is_empty() {
        return "%".to_owned();
    }
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_core::AnnotationKind;

    #[test]
    fn visibility_round_trip() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());

        let mut visibility = LayerVisibility::default();
        visibility.toggle(AnnotationKind::Drawing);
        visibility.toggle(AnnotationKind::Note);

        store.save_visibility("ana", &visibility).expect("save should succeed");
        let loaded = store.load_visibility("ana").expect("load should succeed");

        assert_eq!(loaded, visibility);
    }

    #[test]
    fn load_defaults_when_file_absent() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());

        let loaded = store.load_visibility("nobody").expect("load should succeed");
        assert_eq!(loaded, LayerVisibility::default());
    }

    #[test]
    fn visibility_is_per_user() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());

        let hidden = LayerVisibility { highlights: false, ..LayerVisibility::default() };
        store.save_visibility("ana", &hidden).expect("save should succeed");

        assert_eq!(store.load_visibility("luis").expect("load"), LayerVisibility::default());
    }

    #[test]
    fn newer_schema_rejected() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());
        let path = store.visibility_path("ana");
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, r#"{"version": 99, "visibility": {}}"#).expect("write");

        assert!(matches!(store.load_visibility("ana"), Err(StorageError::UnsupportedVersion(99))));
    }

    #[test]
    fn keys_are_encoded() {
        assert_eq!(encode_key("user-1_a"), "user-1_a");
        assert_eq!(encode_key("../etc"), "%2E%2E%2Fetc");
        assert_eq!(encode_key("a/b"), "a%2Fb");
        assert_ne!(encode_key("a/b"), encode_key("a_b"));
        assert_eq!(encode_key(""), "%");
    }
}
