//! In-memory connectors for testing
//!
//! Stand-ins for a cluster and for Secret Manager that need no network and
//! count how many sessions were opened, so callers can assert that a backend
//! was (or was not) touched during a resolution pass.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::ByteString;
use parking_lot::Mutex;

use super::error::{FetchError, FetchResult};
use super::kubernetes::{ClusterConnector, KubeApi};
use super::secret_manager::{SecretManagerApi, SecretManagerConnector};

#[derive(Debug, Default)]
struct ClusterState {
    secrets: Mutex<HashMap<(String, String), Secret>>,
    config_maps: Mutex<HashMap<(String, String), ConfigMap>>,
    connect_error: Option<String>,
    connections: AtomicUsize,
}

/// In-memory cluster
///
/// Clones share state, so a test can hand one clone to the backend and keep
/// another to add objects or inspect `connections()`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use kafka_config_core::backends::{KubernetesBackend, MockCluster};
///
/// let cluster = MockCluster::new().with_secret("prod", "kafka", "password", b"hunter2");
/// let backend = KubernetesBackend::new(Arc::new(cluster.clone()));
/// assert_eq!(cluster.connections(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockCluster {
    state: Arc<ClusterState>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cluster whose sessions can never be opened
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            state: Arc::new(ClusterState {
                connect_error: Some(message.into()),
                ..Default::default()
            }),
        }
    }

    /// Add a Secret entry
    pub fn with_secret(self, namespace: &str, name: &str, key: &str, value: &[u8]) -> Self {
        self.state
            .secrets
            .lock()
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .data
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), ByteString(value.to_vec()));
        self
    }

    /// Add a ConfigMap `data` entry
    pub fn with_config_map_entry(self, namespace: &str, name: &str, key: &str, value: &str) -> Self {
        self.state
            .config_maps
            .lock()
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .data
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Add a ConfigMap `binaryData` entry
    pub fn with_config_map_binary(self, namespace: &str, name: &str, key: &str, value: &[u8]) -> Self {
        self.state
            .config_maps
            .lock()
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .binary_data
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), ByteString(value.to_vec()));
        self
    }

    /// Number of sessions opened so far
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }
}

impl ClusterConnector for MockCluster {
    fn connect(&self) -> FetchResult<Box<dyn KubeApi>> {
        self.state.connections.fetch_add(1, Ordering::SeqCst);
        match &self.state.connect_error {
            Some(message) => Err(FetchError::Connection(message.clone())),
            None => Ok(Box::new(MockClusterSession {
                state: Arc::clone(&self.state),
            })),
        }
    }
}

struct MockClusterSession {
    state: Arc<ClusterState>,
}

impl KubeApi for MockClusterSession {
    fn read_secret(&self, namespace: &str, name: &str) -> FetchResult<Secret> {
        self.state
            .secrets
            .lock()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("secret {}/{}", namespace, name)))
    }

    fn read_config_map(&self, namespace: &str, name: &str) -> FetchResult<ConfigMap> {
        self.state
            .config_maps
            .lock()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("configmap {}/{}", namespace, name)))
    }
}

#[derive(Debug, Default)]
struct SecretManagerState {
    versions: Mutex<BTreeMap<String, Vec<u8>>>,
    connections: AtomicUsize,
    accesses: AtomicUsize,
}

/// In-memory Secret Manager keyed by full version resource name
#[derive(Debug, Clone, Default)]
pub struct MockSecretManager {
    state: Arc<SecretManagerState>,
}

impl MockSecretManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret version payload, e.g.
    /// `projects/p/secrets/kafka/versions/latest`
    pub fn with_version(self, name: &str, payload: &[u8]) -> Self {
        self.state
            .versions
            .lock()
            .insert(name.to_string(), payload.to_vec());
        self
    }

    /// Number of sessions opened so far
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Number of payload reads so far
    pub fn accesses(&self) -> usize {
        self.state.accesses.load(Ordering::SeqCst)
    }
}

impl SecretManagerConnector for MockSecretManager {
    fn connect(&self) -> FetchResult<Box<dyn SecretManagerApi>> {
        self.state.connections.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSecretManagerSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockSecretManagerSession {
    state: Arc<SecretManagerState>,
}

impl SecretManagerApi for MockSecretManagerSession {
    fn access_secret_version(&self, name: &str) -> FetchResult<Vec<u8>> {
        self.state.accesses.fetch_add(1, Ordering::SeqCst);
        self.state
            .versions
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(name.to_string()))
    }
}
