//! Kubernetes Secret/ConfigMap backend
//!
//! ```yaml
//! kubernetes:
//!   secret:    { name, namespace, key, binary? }
//!   configmap: { name, namespace, key, binary? }
//! ```
//!
//! Secret data and ConfigMap `binaryData` arrive base64-decoded from the
//! API. ConfigMap `data` entries are used as stored, unless `binary` is set,
//! in which case the entry is read from `binaryData`.

mod client;

use std::sync::Arc;

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use serde::Deserialize;

use super::error::{FetchError, FetchResult};
use super::traits::{parse_config, Backend, ProviderKind};
use crate::config::KubernetesSettings;
use crate::document::Document;
use crate::properties::get_value;

pub use client::{KubeClientApi, KubeconfigConnector};

/// Read access to namespaced Secrets and ConfigMaps
pub trait KubeApi {
    fn read_secret(&self, namespace: &str, name: &str) -> FetchResult<Secret>;

    fn read_config_map(&self, namespace: &str, name: &str) -> FetchResult<ConfigMap>;
}

/// Produces an authenticated [`KubeApi`] for one resolution pass
pub trait ClusterConnector: Send + Sync {
    fn connect(&self) -> FetchResult<Box<dyn KubeApi>>;
}

#[derive(Debug, Clone, Deserialize)]
struct KubernetesConfig {
    secret: Option<ObjectRef>,
    configmap: Option<ObjectRef>,
}

#[derive(Debug, Clone, Deserialize)]
struct ObjectRef {
    name: String,
    namespace: String,
    key: String,
    #[serde(default)]
    binary: bool,
}

impl ObjectRef {
    /// Namespace must be a DNS-1123 label, name a DNS-1123 subdomain
    fn validate(&self) -> FetchResult<()> {
        if !is_dns_name(&self.namespace, 63, false) {
            return Err(FetchError::unsupported_shape(
                ProviderKind::Kubernetes.key(),
                format!("invalid namespace '{}'", self.namespace),
            ));
        }
        if !is_dns_name(&self.name, 253, true) {
            return Err(FetchError::unsupported_shape(
                ProviderKind::Kubernetes.key(),
                format!("invalid object name '{}'", self.name),
            ));
        }
        Ok(())
    }
}

fn is_dns_name(name: &str, max_len: usize, allow_dots: bool) -> bool {
    let alphanumeric = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    let inner = |c: char| alphanumeric(c) || c == '-' || (allow_dots && c == '.');
    !name.is_empty()
        && name.len() <= max_len
        && name.starts_with(alphanumeric)
        && name.ends_with(alphanumeric)
        && name.chars().all(inner)
}

/// Resolves `kubernetes` tags against a cluster
pub struct KubernetesBackend {
    connector: Arc<dyn ClusterConnector>,
}

impl KubernetesBackend {
    pub fn new(connector: Arc<dyn ClusterConnector>) -> Self {
        Self { connector }
    }

    /// Connect through kubeconfig (or the in-cluster service account)
    pub fn from_settings(settings: &KubernetesSettings) -> Self {
        Self::new(Arc::new(KubeconfigConnector::new(settings.clone())))
    }

    fn from_secret(&self, object: &ObjectRef, api: &dyn KubeApi) -> FetchResult<Document> {
        let secret = api.read_secret(&object.namespace, &object.name)?;
        let data = secret.data.unwrap_or_default();
        let bytes = |key: &str| -> FetchResult<Vec<u8>> {
            data.get(key).map(|value| value.0.clone()).ok_or_else(|| {
                FetchError::key_not_found(
                    key,
                    format!("secret {}/{}", object.namespace, object.name),
                )
            })
        };

        if object.binary {
            return bytes(&object.key).map(Document::Bytes);
        }
        get_value(&object.key, |key| {
            Ok(Document::Text(String::from_utf8(bytes(key)?)?))
        })
    }

    fn from_config_map(&self, object: &ObjectRef, api: &dyn KubeApi) -> FetchResult<Document> {
        let config_map = api.read_config_map(&object.namespace, &object.name)?;
        let location = || format!("configmap {}/{}", object.namespace, object.name);

        if object.binary {
            return config_map
                .binary_data
                .unwrap_or_default()
                .remove(&object.key)
                .map(|value| Document::Bytes(value.0))
                .ok_or_else(|| FetchError::key_not_found(&object.key, location()));
        }
        let data = config_map.data.unwrap_or_default();
        get_value(&object.key, |key| {
            data.get(key)
                .cloned()
                .map(Document::Text)
                .ok_or_else(|| FetchError::key_not_found(key, location()))
        })
    }
}

impl std::fmt::Debug for KubernetesBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubernetesBackend").finish_non_exhaustive()
    }
}

impl Backend for KubernetesBackend {
    type Session = Box<dyn KubeApi>;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Kubernetes
    }

    fn create_session(&self) -> FetchResult<Box<dyn KubeApi>> {
        self.connector.connect()
    }

    fn fetch(&self, config: &Document, session: &Box<dyn KubeApi>) -> FetchResult<Document> {
        let config: KubernetesConfig = parse_config(self.kind(), config)?;
        if let Some(secret) = &config.secret {
            secret.validate()?;
            self.from_secret(secret, session.as_ref())
        } else if let Some(configmap) = &config.configmap {
            configmap.validate()?;
            self.from_config_map(configmap, session.as_ref())
        } else {
            Err(FetchError::UnsupportedKind {
                provider: self.kind().key(),
                expected: "secret, configmap",
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::MockCluster;

    fn tag(yaml: &str) -> Document {
        Document::from_yaml_str(yaml).unwrap()
    }

    fn cluster() -> MockCluster {
        MockCluster::new()
            .with_secret("prod", "kafka", "password", b"hunter2")
            .with_secret("prod", "kafka", "client.properties", b"FOO=1\n#comment\nBAR=2\n")
            .with_secret("prod", "kafka", "keystore", &[0xff, 0x00, 0x10])
            .with_config_map_entry("prod", "brokers", "bootstrap", "b1:9093,b2:9093")
            .with_config_map_binary("prod", "brokers", "truststore", &[1, 2, 3])
    }

    fn fetch(cluster: &MockCluster, yaml: &str) -> FetchResult<Document> {
        let backend = KubernetesBackend::new(Arc::new(cluster.clone()));
        let session = backend.create_session()?;
        backend.fetch(&tag(yaml), &session)
    }

    #[test]
    fn test_secret_text_value() {
        let value = fetch(&cluster(), "secret: {name: kafka, namespace: prod, key: password}").unwrap();
        assert_eq!(value, Document::from("hunter2"));
    }

    #[test]
    fn test_secret_composite_key() {
        let cluster = cluster();
        let value = fetch(&cluster, "secret: {name: kafka, namespace: prod, key: 'client.properties:BAR'}").unwrap();
        assert_eq!(value, Document::from("2"));

        let err = fetch(&cluster, "secret: {name: kafka, namespace: prod, key: 'client.properties:BAZ'}").unwrap_err();
        assert!(matches!(err, FetchError::FieldNotFound { .. }));
    }

    #[test]
    fn test_secret_binary_returns_raw_bytes() {
        let value = fetch(
            &cluster(),
            "secret: {name: kafka, namespace: prod, key: keystore, binary: true}",
        )
        .unwrap();
        assert_eq!(value, Document::Bytes(vec![0xff, 0x00, 0x10]));
    }

    #[test]
    fn test_secret_non_utf8_text_fails() {
        let err = fetch(&cluster(), "secret: {name: kafka, namespace: prod, key: keystore}").unwrap_err();
        assert!(matches!(err, FetchError::Utf8(_)));
    }

    #[test]
    fn test_configmap_text_is_not_decoded() {
        let value = fetch(&cluster(), "configmap: {name: brokers, namespace: prod, key: bootstrap}").unwrap();
        assert_eq!(value, Document::from("b1:9093,b2:9093"));
    }

    #[test]
    fn test_configmap_binary_reads_binary_data() {
        let value = fetch(
            &cluster(),
            "configmap: {name: brokers, namespace: prod, key: truststore, binary: true}",
        )
        .unwrap();
        assert_eq!(value, Document::Bytes(vec![1, 2, 3]));
    }

    #[test]
    fn test_missing_key_and_object() {
        let cluster = cluster();
        let err = fetch(&cluster, "configmap: {name: brokers, namespace: prod, key: nope}").unwrap_err();
        assert!(matches!(err, FetchError::KeyNotFound { key, .. } if key == "nope"));

        let err = fetch(&cluster, "secret: {name: other, namespace: prod, key: x}").unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));

        let err = fetch(&cluster, "secret: {name: kafka, namespace: staging, key: password}").unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }

    #[test]
    fn test_unsupported_kind() {
        let err = fetch(&cluster(), "service: {name: kafka}").unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedKind { provider: "kubernetes", .. }));
    }

    #[test]
    fn test_missing_required_field() {
        let err = fetch(&cluster(), "secret: {name: kafka, namespace: prod}").unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedShape { provider: "kubernetes", .. }));
    }

    #[test]
    fn test_object_names_are_validated() {
        let cluster = cluster();
        for yaml in [
            "secret: {name: kafka/../admin, namespace: prod, key: password}",
            "secret: {name: kafka, namespace: 'prod/secrets', key: password}",
            "configmap: {name: 'brokers?watch=1', namespace: prod, key: bootstrap}",
            "configmap: {name: brokers, namespace: dev.prod, key: bootstrap}",
            "secret: {name: Kafka, namespace: prod, key: password}",
            "secret: {name: '', namespace: prod, key: password}",
        ] {
            let err = fetch(&cluster, yaml).unwrap_err();
            assert!(
                matches!(err, FetchError::UnsupportedShape { provider: "kubernetes", .. }),
                "{}: {:?}",
                yaml,
                err
            );
        }

        let value = fetch(&cluster, "secret: {name: kafka, namespace: prod, key: password}");
        assert!(value.is_ok());
        assert!(is_dns_name("kafka-client.tls", 253, true));
        assert!(!is_dns_name("-kafka", 253, true));
    }

    #[test]
    fn test_session_is_created_by_connector() {
        let cluster = cluster();
        let backend = KubernetesBackend::new(Arc::new(cluster.clone()));
        assert_eq!(cluster.connections(), 0);
        let _session = backend.create_session().unwrap();
        assert_eq!(cluster.connections(), 1);
    }
}
