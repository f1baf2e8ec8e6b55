//! Loading input documents from disk

use std::fs;
use std::path::Path;

use super::error::{ConfigError, ConfigResult};
use crate::document::Document;

/// On-disk encoding of an input document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// `.json` files are JSON; everything else is read as YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }

    pub fn parse(&self, text: &str) -> ConfigResult<Document> {
        match self {
            Self::Yaml => Ok(Document::from_yaml_str(text)?),
            Self::Json => {
                let value: serde_yaml::Value = serde_json::from_str(text)?;
                Ok(Document::from(value))
            }
        }
    }
}

/// Read and parse a document, choosing the format by extension
pub fn load_document(path: impl AsRef<Path>) -> ConfigResult<Document> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    DocumentFormat::from_path(path).parse(&text)
}
