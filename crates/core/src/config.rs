//! Engine configuration
//!
//! Tunables for the annotation surface. Configuration can be loaded from a
//! JSON file, from environment variables, or built programmatically.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotation::{BrushType, DEFAULT_PRESSURE};
use crate::search::DEFAULT_PREVIEW_CHARS;
use crate::store::StoreDefaults;

pub const ENV_DEFAULT_PRESSURE: &str = "MARGINALIA_DEFAULT_PRESSURE";
pub const ENV_ERASER_RADIUS: &str = "MARGINALIA_ERASER_RADIUS";
pub const ENV_SEARCH_PREVIEW_CHARS: &str = "MARGINALIA_SEARCH_PREVIEW_CHARS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {0}")]
    InvalidValue(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pressure substituted when a device reports none
    pub default_pressure: f64,
    /// Eraser circle radius in container pixels
    pub eraser_radius: f64,
    /// Preview length for highlight and note search results
    pub search_preview_chars: usize,
    /// Initial tool color
    pub default_color: String,
    /// Initial ink brush
    pub default_brush: BrushType,
    pub note_default_width: f64,
    pub note_default_height: f64,
    pub floating_text_default_size: f64,
    /// Cap on retained undo snapshots; unbounded when unset
    pub history_limit: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_pressure: DEFAULT_PRESSURE,
            eraser_radius: 20.0,
            search_preview_chars: DEFAULT_PREVIEW_CHARS,
            default_color: "yellow".to_owned(),
            default_brush: BrushType::Medium,
            note_default_width: 250.0,
            note_default_height: 150.0,
            floating_text_default_size: 16.0,
            history_limit: None,
        }
    }
}

impl EngineConfig {
    pub fn with_eraser_radius(mut self, radius: f64) -> Self {
        self.eraser_radius = radius;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `MARGINALIA_DEFAULT_PRESSURE`: substituted pressure (default: 0.5)
    /// - `MARGINALIA_ERASER_RADIUS`: eraser radius in pixels (default: 20)
    /// - `MARGINALIA_SEARCH_PREVIEW_CHARS`: preview length (default: 100)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
            value.trim().parse().map_err(|_| ConfigError::InvalidValue(key.to_owned()))
        }

        let mut config = Self::default();
        if let Some(value) = lookup(ENV_DEFAULT_PRESSURE) {
            config.default_pressure = parse(ENV_DEFAULT_PRESSURE, &value)?;
        }
        if let Some(value) = lookup(ENV_ERASER_RADIUS) {
            config.eraser_radius = parse(ENV_ERASER_RADIUS, &value)?;
        }
        if let Some(value) = lookup(ENV_SEARCH_PREVIEW_CHARS) {
            config.search_preview_chars = parse(ENV_SEARCH_PREVIEW_CHARS, &value)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    ///
    /// Missing keys take their defaults; unknown keys are ignored.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.default_pressure > 0.0 && self.default_pressure <= 1.0) {
            return Err(ConfigError::InvalidValue("default_pressure".to_owned()));
        }
        if !(self.eraser_radius > 0.0 && self.eraser_radius.is_finite()) {
            return Err(ConfigError::InvalidValue("eraser_radius".to_owned()));
        }
        if !(self.floating_text_default_size > 0.0) {
            return Err(ConfigError::InvalidValue("floating_text_default_size".to_owned()));
        }
        Ok(())
    }

    pub fn store_defaults(&self) -> StoreDefaults {
        StoreDefaults {
            note_width: self.note_default_width,
            note_height: self.note_default_height,
            text_size: self.floating_text_default_size,
            ..StoreDefaults::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_pressure, 0.5);
        assert_eq!(config.eraser_radius, 20.0);
        assert_eq!(config.search_preview_chars, 100);
        assert_eq!(config.default_brush, BrushType::Medium);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lookup_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_ERASER_RADIUS, "35"),
            (ENV_SEARCH_PREVIEW_CHARS, " 40 "),
        ]))
        .unwrap();
        assert_eq!(config.eraser_radius, 35.0);
        assert_eq!(config.search_preview_chars, 40);
        assert_eq!(config.default_pressure, 0.5);
    }

    #[test]
    fn test_lookup_invalid() {
        let err = EngineConfig::from_lookup(lookup(&[(ENV_DEFAULT_PRESSURE, "heavy")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key) if key == ENV_DEFAULT_PRESSURE));

        let err = EngineConfig::from_lookup(lookup(&[(ENV_DEFAULT_PRESSURE, "1.5")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key) if key == "default_pressure"));
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"eraser_radius": 12.5, "default_brush": "thick", "unknown": true}}"#).unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.eraser_radius, 12.5);
        assert_eq!(config.default_brush, BrushType::Thick);
        assert_eq!(config.note_default_width, 250.0);
    }

    #[test]
    fn test_from_file_errors() {
        assert!(matches!(EngineConfig::from_file("/nonexistent/marginalia.json"), Err(ConfigError::Io(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(EngineConfig::from_file(file.path()), Err(ConfigError::Parse(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"eraser_radius": 0}}"#).unwrap();
        assert!(matches!(EngineConfig::from_file(file.path()), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_store_defaults() {
        let config = EngineConfig { note_default_width: 320.0, ..EngineConfig::default() };
        let defaults = config.store_defaults();
        assert_eq!(defaults.note_width, 320.0);
        assert_eq!(defaults.text_font, "sans");
    }
}
