//! Settings and document loading
//!
//! - `ResolverSettings`: how backends reach their services (YAML + env)
//! - `load_document`: YAML or JSON input documents

mod document;
mod error;
mod settings;

pub use document::{load_document, DocumentFormat};
pub use error::{ConfigError, ConfigResult};
pub use settings::{
    FileSettings, KubernetesSettings, ResolverSettings, SecretManagerSettings,
    DEFAULT_SECRET_MANAGER_ENDPOINT, DEFAULT_TIMEOUT_SECS, ENV_ACCESS_TOKEN, ENV_BASE_DIR,
    ENV_CREDENTIALS, ENV_KUBECONFIG, ENV_KUBE_CONTEXT, ENV_SECRET_MANAGER_ENDPOINT,
};
