//! Resolver settings
//!
//! Settings only describe how backends reach their services. They never
//! change resolution semantics.
//!
//! ```yaml
//! kubernetes:
//!   kubeconfig: ~/.kube/staging
//!   context: staging
//!   timeout_secs: 10
//! secret_manager:
//!   endpoint: https://secretmanager.googleapis.com/v1
//!   credentials_file: /etc/gcp/kafka-reader.json
//! file:
//!   base_dir: /etc/kafka
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};

pub const DEFAULT_SECRET_MANAGER_ENDPOINT: &str = "https://secretmanager.googleapis.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_KUBECONFIG: &str = "KAFKA_CONFIG_KUBECONFIG";
pub const ENV_KUBE_CONTEXT: &str = "KAFKA_CONFIG_KUBE_CONTEXT";
pub const ENV_SECRET_MANAGER_ENDPOINT: &str = "KAFKA_CONFIG_SECRET_MANAGER_ENDPOINT";
pub const ENV_ACCESS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
pub const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_BASE_DIR: &str = "KAFKA_CONFIG_BASE_DIR";

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_endpoint() -> String {
    DEFAULT_SECRET_MANAGER_ENDPOINT.to_string()
}

/// How to reach the cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesSettings {
    /// Kubeconfig path, or a path list merged the way `$KUBECONFIG` is.
    /// When unset, `$KUBECONFIG`, `~/.kube/config`, then the in-cluster
    /// service account are tried
    pub kubeconfig: Option<PathBuf>,
    /// Context overriding `current-context`
    pub context: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for KubernetesSettings {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl KubernetesSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// How to reach Secret Manager
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretManagerSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// OAuth access token, used as-is when set
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    /// Service account key file; application default credentials when unset
    pub credentials_file: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SecretManagerSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            access_token: None,
            credentials_file: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SecretManagerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for SecretManagerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretManagerSettings")
            .field("endpoint", &self.endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("credentials_file", &self.credentials_file)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    /// Base for relative `file` paths; the working directory when unset
    pub base_dir: Option<PathBuf>,
}

/// Settings for every backend of a [`Resolver`](crate::resolver::Resolver)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    pub kubernetes: KubernetesSettings,
    pub secret_manager: SecretManagerSettings,
    pub file: FileSettings,
}

impl ResolverSettings {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_env(|name| std::env::var(name).ok())
    }

    /// Read a YAML settings file, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Ok(Self::parse(&content)?.with_env(|name| std::env::var(name).ok()))
    }

    /// Parse YAML settings without consulting the environment
    pub fn parse(yaml: &str) -> ConfigResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply overrides from `lookup`; empty values are ignored
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(path) = var(ENV_KUBECONFIG) {
            self.kubernetes.kubeconfig = Some(PathBuf::from(path));
        }
        if let Some(context) = var(ENV_KUBE_CONTEXT) {
            self.kubernetes.context = Some(context);
        }
        if let Some(endpoint) = var(ENV_SECRET_MANAGER_ENDPOINT) {
            self.secret_manager.endpoint = endpoint;
        }
        if let Some(token) = var(ENV_ACCESS_TOKEN) {
            self.secret_manager.access_token = Some(token);
        }
        if let Some(path) = var(ENV_CREDENTIALS) {
            self.secret_manager.credentials_file = Some(PathBuf::from(path));
        }
        if let Some(dir) = var(ENV_BASE_DIR) {
            self.file.base_dir = Some(PathBuf::from(dir));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = ResolverSettings::default();
        assert_eq!(settings.secret_manager.endpoint, DEFAULT_SECRET_MANAGER_ENDPOINT);
        assert_eq!(settings.kubernetes.timeout(), Duration::from_secs(30));
        assert!(settings.kubernetes.kubeconfig.is_none());
        assert!(settings.file.base_dir.is_none());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let settings = ResolverSettings::parse(
            "kubernetes:\n  context: staging\nfile:\n  base_dir: /etc/kafka\n",
        )
        .unwrap();
        assert_eq!(settings.kubernetes.context.as_deref(), Some("staging"));
        assert_eq!(settings.kubernetes.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(settings.file.base_dir, Some(PathBuf::from("/etc/kafka")));
        assert_eq!(settings.secret_manager.endpoint, DEFAULT_SECRET_MANAGER_ENDPOINT);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(ResolverSettings::parse("  \n").unwrap(), ResolverSettings::default());
    }

    #[test]
    fn test_parse_rejects_bad_yaml() {
        assert!(matches!(
            ResolverSettings::parse("kubernetes: [1, 2"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let settings = ResolverSettings::parse("kubernetes:\n  context: from-file\n")
            .unwrap()
            .with_env(env(&[
                (ENV_KUBE_CONTEXT, "from-env"),
                (ENV_KUBECONFIG, "/tmp/kubeconfig"),
                (ENV_ACCESS_TOKEN, "ya29.token"),
                (ENV_CREDENTIALS, "/etc/gcp/sa.json"),
                (ENV_SECRET_MANAGER_ENDPOINT, "http://localhost:9090/v1"),
                (ENV_BASE_DIR, ""),
            ]));

        assert_eq!(settings.kubernetes.context.as_deref(), Some("from-env"));
        assert_eq!(settings.kubernetes.kubeconfig, Some(PathBuf::from("/tmp/kubeconfig")));
        assert_eq!(settings.secret_manager.access_token.as_deref(), Some("ya29.token"));
        assert_eq!(
            settings.secret_manager.credentials_file,
            Some(PathBuf::from("/etc/gcp/sa.json"))
        );
        assert_eq!(settings.secret_manager.endpoint, "http://localhost:9090/v1");
        assert!(settings.file.base_dir.is_none());
    }

    #[test]
    fn test_access_token_is_redacted() {
        let mut settings = SecretManagerSettings::default();
        settings.access_token = Some("ya29.secret".into());
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("ya29.secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = ResolverSettings::load(dir.path().join("settings.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, "kubernetes:\n  timeout_secs: 5\n").unwrap();
        let settings = ResolverSettings::load(&path).unwrap();
        assert_eq!(settings.kubernetes.timeout(), Duration::from_secs(5));
    }
}
