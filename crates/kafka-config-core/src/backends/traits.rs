//! Core traits and types for provider backends

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use tokio::runtime::{Builder, Runtime};

use super::error::{FetchError, FetchResult};
use crate::document::Document;

/// The closed set of provider tag kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Inline literal
    Value,
    /// Kubernetes Secret or ConfigMap
    Kubernetes,
    /// Google Cloud Secret Manager
    GoogleSecretManager,
    /// Local file
    File,
}

impl ProviderKind {
    /// The order in which a resolution pass runs the backends
    pub const PIPELINE_ORDER: [ProviderKind; 4] = [
        ProviderKind::Value,
        ProviderKind::Kubernetes,
        ProviderKind::GoogleSecretManager,
        ProviderKind::File,
    ];

    /// Document key naming this provider
    pub fn key(&self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Kubernetes => "kubernetes",
            Self::GoogleSecretManager => "google_secret_manager",
            Self::File => "file",
        }
    }

    /// Human-readable backend name
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Value => "Value",
            Self::Kubernetes => "Kubernetes",
            Self::GoogleSecretManager => "Google Secret Manager",
            Self::File => "File",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::PIPELINE_ORDER
            .into_iter()
            .find(|kind| kind.key() == s)
            .ok_or_else(|| format!("Unknown provider key: {}", s))
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A backend turning a provider tag's config into a concrete value
///
/// A backend's `Session` is whatever shared infrastructure its fetches need
/// (an authenticated cluster client, a cloud client). The pipeline creates it
/// at most once per pass, only when the document contains at least one tag for
/// this backend, and passes it explicitly to every fetch. Backends that need
/// nothing use `()`.
pub trait Backend {
    type Session;

    /// Which provider tag this backend resolves
    fn kind(&self) -> ProviderKind;

    /// Build the shared session for one resolution pass
    fn create_session(&self) -> FetchResult<Self::Session>;

    /// Fetch the value for one provider tag
    ///
    /// `config` is the value stored under the provider key. The result is
    /// always a scalar (`Text`/`Bytes` for remote and file backends).
    fn fetch(&self, config: &Document, session: &Self::Session) -> FetchResult<Document>;
}

/// Deserialize a provider config subtree into its typed form
pub(crate) fn parse_config<T: DeserializeOwned>(
    kind: ProviderKind,
    config: &Document,
) -> FetchResult<T> {
    serde_yaml::from_value(config.to_yaml_value())
        .map_err(|e| FetchError::unsupported_shape(kind.key(), e.to_string()))
}

/// Standard base64 decode, ignoring embedded whitespace and line breaks
pub(crate) fn decode_base64(encoded: impl AsRef<[u8]>) -> FetchResult<Vec<u8>> {
    let compact: Vec<u8> = encoded
        .as_ref()
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(compact)?)
}

fn install_rustls_provider() {
    use rustls::crypto::{ring, CryptoProvider};

    if CryptoProvider::get_default().is_none() {
        // Losing a race to another thread still leaves a provider installed
        let _ = ring::default_provider().install_default();
    }
}

/// Single-threaded runtime owned by a remote backend session
///
/// Sessions block on it for each request, so callers stay synchronous.
pub(crate) fn session_runtime() -> FetchResult<Runtime> {
    install_rustls_provider();
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| FetchError::Connection(format!("failed to start runtime: {}", e)))
}
