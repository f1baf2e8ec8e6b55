//! Provider backends
//!
//! One backend per provider tag kind. Each turns the config stored under its
//! tag into a concrete scalar value, sharing one session per resolution pass.

mod error;
mod file;
mod kubernetes;
pub mod mock;
mod secret_manager;
mod traits;
mod value;

pub use error::{FetchError, FetchResult};
pub use file::FileBackend;
pub use kubernetes::{
    ClusterConnector, KubeApi, KubeClientApi, KubeconfigConnector, KubernetesBackend,
};
pub use mock::{MockCluster, MockSecretManager};
pub use secret_manager::{
    version_name, RestSecretManagerApi, RestSecretManagerConnector, SecretManagerApi,
    SecretManagerBackend, SecretManagerConnector,
};
pub use traits::{Backend, ProviderKind};
pub use value::ValueBackend;
