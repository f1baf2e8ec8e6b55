//! Google Cloud Secret Manager backend
//!
//! ```yaml
//! google_secret_manager:
//!   secret: projects/my-project/secrets/kafka-password/versions/3
//!   base64: false
//! ```
//!
//! A resource name without a version is read at `versions/latest`.

mod client;

use std::sync::Arc;

use serde::Deserialize;

use super::error::FetchResult;
use super::traits::{decode_base64, parse_config, Backend, ProviderKind};
use crate::config::SecretManagerSettings;
use crate::document::Document;

pub use client::{RestSecretManagerApi, RestSecretManagerConnector};

/// Access to secret version payloads
pub trait SecretManagerApi {
    /// Raw payload bytes of a fully qualified secret version
    fn access_secret_version(&self, name: &str) -> FetchResult<Vec<u8>>;
}

/// Produces an authenticated [`SecretManagerApi`] for one resolution pass
pub trait SecretManagerConnector: Send + Sync {
    fn connect(&self) -> FetchResult<Box<dyn SecretManagerApi>>;
}

#[derive(Debug, Clone, Deserialize)]
struct SecretManagerConfig {
    secret: String,
    #[serde(default)]
    base64: bool,
}

/// Full version resource name for a configured secret reference
///
/// - `projects/p/secrets/s/versions/3` is used as-is
/// - `projects/p/secrets/s` becomes `projects/p/secrets/s/versions/latest`
pub fn version_name(secret: &str) -> String {
    if secret.contains("/versions/") {
        secret.to_string()
    } else {
        format!("{}/versions/latest", secret.trim_end_matches('/'))
    }
}

/// Resolves `google_secret_manager` tags
pub struct SecretManagerBackend {
    connector: Arc<dyn SecretManagerConnector>,
}

impl SecretManagerBackend {
    pub fn new(connector: Arc<dyn SecretManagerConnector>) -> Self {
        Self { connector }
    }

    /// Connect to the REST API with the configured credentials
    pub fn from_settings(settings: &SecretManagerSettings) -> Self {
        Self::new(Arc::new(RestSecretManagerConnector::new(settings.clone())))
    }
}

impl std::fmt::Debug for SecretManagerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretManagerBackend").finish_non_exhaustive()
    }
}

impl Backend for SecretManagerBackend {
    type Session = Box<dyn SecretManagerApi>;

    fn kind(&self) -> ProviderKind {
        ProviderKind::GoogleSecretManager
    }

    fn create_session(&self) -> FetchResult<Box<dyn SecretManagerApi>> {
        self.connector.connect()
    }

    fn fetch(&self, config: &Document, session: &Box<dyn SecretManagerApi>) -> FetchResult<Document> {
        let config: SecretManagerConfig = parse_config(self.kind(), config)?;
        let payload = session.access_secret_version(&version_name(&config.secret))?;
        if config.base64 {
            let decoded = decode_base64(&payload)?;
            Ok(Document::Text(String::from_utf8(decoded)?))
        } else {
            Ok(Document::Bytes(payload))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::error::FetchError;
    use crate::backends::mock::MockSecretManager;

    const LATEST: &str = "projects/p/secrets/kafka/versions/latest";

    fn fetch(manager: &MockSecretManager, yaml: &str) -> FetchResult<Document> {
        let backend = SecretManagerBackend::new(Arc::new(manager.clone()));
        let session = backend.create_session()?;
        backend.fetch(&Document::from_yaml_str(yaml).unwrap(), &session)
    }

    #[test]
    fn test_version_name() {
        assert_eq!(version_name("projects/p/secrets/kafka"), LATEST);
        assert_eq!(version_name("projects/p/secrets/kafka/"), LATEST);
        assert_eq!(
            version_name("projects/p/secrets/kafka/versions/7"),
            "projects/p/secrets/kafka/versions/7"
        );
    }

    #[test]
    fn test_raw_payload_bytes() {
        let manager = MockSecretManager::new().with_version(LATEST, &[0, 1, 2]);
        let value = fetch(&manager, "secret: projects/p/secrets/kafka").unwrap();
        assert_eq!(value, Document::Bytes(vec![0, 1, 2]));
    }

    #[test]
    fn test_base64_payload_decodes_to_text() {
        let manager = MockSecretManager::new().with_version(LATEST, b"aHVudGVyMg==\n");
        let value = fetch(&manager, "{secret: projects/p/secrets/kafka, base64: true}").unwrap();
        assert_eq!(value, Document::from("hunter2"));
    }

    #[test]
    fn test_malformed_base64() {
        let manager = MockSecretManager::new().with_version(LATEST, b"%%%");
        let err = fetch(&manager, "{secret: projects/p/secrets/kafka, base64: true}").unwrap_err();
        assert!(matches!(err, FetchError::Base64(_)));
    }

    #[test]
    fn test_missing_secret_field() {
        let err = fetch(&MockSecretManager::new(), "base64: true").unwrap_err();
        assert!(matches!(
            err,
            FetchError::UnsupportedShape { provider: "google_secret_manager", .. }
        ));
    }

    #[test]
    fn test_not_found() {
        let err = fetch(&MockSecretManager::new(), "secret: projects/p/secrets/none").unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }
}
