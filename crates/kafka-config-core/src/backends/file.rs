//! Local file backend

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::error::{FetchError, FetchResult};
use super::traits::{parse_config, Backend, ProviderKind};
use crate::config::FileSettings;
use crate::document::Document;
use crate::properties::get_value;

/// `file: { path, binary? }`
#[derive(Debug, Clone, Deserialize)]
struct FileConfig {
    path: String,
    #[serde(default)]
    binary: bool,
}

/// Reads values from local files
///
/// In text mode the file must be UTF-8; in binary mode its raw bytes are
/// returned. The configured path may carry a `:field` suffix to pick one
/// entry out of a properties file.
///
/// # Example
///
/// ```yaml
/// schema_registry:
///   password:
///     file:
///       path: secrets/registry.properties:password
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileBackend {
    base_dir: Option<PathBuf>,
}

impl FileBackend {
    /// Resolve relative paths against the process working directory
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Resolve relative paths against `base_dir`
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    pub fn from_settings(settings: &FileSettings) -> Self {
        Self {
            base_dir: settings.base_dir.clone(),
        }
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn read(&self, path: &str, binary: bool) -> FetchResult<Document> {
        let path = self.resolve_path(path);
        if binary {
            fs::read(&path)
                .map(Document::Bytes)
                .map_err(|e| FetchError::io(path, e))
        } else {
            fs::read_to_string(&path)
                .map(Document::Text)
                .map_err(|e| FetchError::io(path, e))
        }
    }
}

impl Backend for FileBackend {
    type Session = ();

    fn kind(&self) -> ProviderKind {
        ProviderKind::File
    }

    fn create_session(&self) -> FetchResult<()> {
        Ok(())
    }

    fn fetch(&self, config: &Document, _session: &()) -> FetchResult<Document> {
        let config: FileConfig = parse_config(self.kind(), config)?;
        get_value(&config.path, |path| self.read(path, config.binary))
    }
}
