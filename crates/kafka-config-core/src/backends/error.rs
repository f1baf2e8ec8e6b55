//! Backend error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching a value from a backend
#[derive(Error, Debug)]
pub enum FetchError {
    /// Provider config is missing required fields or has the wrong shape
    #[error("Unsupported {provider} provider shape: {message}")]
    UnsupportedShape {
        provider: &'static str,
        message: String,
    },

    /// A `kubernetes` tag naming neither a secret nor a configmap
    #[error("Unsupported kind for {provider}: expected one of {expected}")]
    UnsupportedKind {
        provider: &'static str,
        expected: &'static str,
    },

    /// Local file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Key absent from a fetched Secret/ConfigMap data map
    #[error("Key '{key}' not found in {location}")]
    KeyNotFound { key: String, location: String },

    /// Composite-key field absent from the parsed properties blob
    #[error("Field '{field}' not found in properties fetched for '{base}'")]
    FieldNotFound { base: String, field: String },

    /// Properties line with no `=`
    #[error("Malformed properties line {line}: {content:?}")]
    MalformedProperties { line: usize, content: String },

    /// Malformed base64 payload
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Payload is not valid UTF-8 text
    #[error("Invalid UTF-8 payload: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Credentials rejected or unavailable
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Remote object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote API returned an unexpected status
    #[error("{service} API error ({status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// Could not set up a client session
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Kubernetes client error other than an API status
    #[error("Kubernetes client error: {0}")]
    Kube(#[from] kube::Error),

    /// Network/HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FetchError {
    /// Create an unsupported-shape error
    pub fn unsupported_shape(provider: &'static str, message: impl Into<String>) -> Self {
        Self::UnsupportedShape {
            provider,
            message: message.into(),
        }
    }

    /// Create a missing-key error
    pub fn key_not_found(key: impl Into<String>, location: impl Into<String>) -> Self {
        Self::KeyNotFound {
            key: key.into(),
            location: location.into(),
        }
    }

    /// Create an I/O error for `path`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Map an HTTP error status from `service` onto the error taxonomy
    pub fn from_status(service: &'static str, status: u16, what: &str, message: String) -> Self {
        match status {
            401 | 403 => Self::Authentication(format!("{} ({}): {}", what, status, message)),
            404 => Self::NotFound(what.to_string()),
            _ => Self::Api {
                service,
                status,
                message,
            },
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
