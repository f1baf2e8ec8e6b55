//! Kubernetes API access through `kube`

use std::ffi::OsStr;
use std::path::Path;

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::config::{KubeConfigOptions, Kubeconfig, KubeconfigError};
use kube::{Api, Client, Config};
use tokio::runtime::Runtime;

use super::{ClusterConnector, KubeApi};
use crate::backends::error::{FetchError, FetchResult};
use crate::backends::traits::session_runtime;
use crate::config::KubernetesSettings;

const SERVICE: &str = "Kubernetes";

/// A `kube` client plus the runtime that drives it
///
/// Lives for one resolution pass; every read blocks on the owned runtime.
pub struct KubeClientApi {
    client: Client,
    runtime: Runtime,
}

impl KubeClientApi {
    fn get<K>(&self, api: Api<K>, name: &str, what: String) -> FetchResult<K>
    where
        K: Clone + serde::de::DeserializeOwned + std::fmt::Debug,
    {
        self.runtime
            .block_on(api.get(name))
            .map_err(|e| api_error(e, &what))
    }
}

fn api_error(error: kube::Error, what: &str) -> FetchError {
    match error {
        kube::Error::Api(response) => {
            FetchError::from_status(SERVICE, response.code, what, response.message)
        }
        other => FetchError::Kube(other),
    }
}

impl KubeApi for KubeClientApi {
    fn read_secret(&self, namespace: &str, name: &str) -> FetchResult<Secret> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        self.get(api, name, format!("secret {}/{}", namespace, name))
    }

    fn read_config_map(&self, namespace: &str, name: &str) -> FetchResult<ConfigMap> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        self.get(api, name, format!("configmap {}/{}", namespace, name))
    }
}

/// Connects using kubeconfig, falling back to the in-cluster service account
///
/// With `kubeconfig` set, every file in the path list is read and merged
/// (first definition of a name wins). Otherwise `$KUBECONFIG`,
/// `~/.kube/config` and the pod's service account are inferred in that order.
#[derive(Debug, Clone, Default)]
pub struct KubeconfigConnector {
    settings: KubernetesSettings,
}

impl KubeconfigConnector {
    pub fn new(settings: KubernetesSettings) -> Self {
        Self { settings }
    }

    async fn config(&self) -> FetchResult<Config> {
        let options = KubeConfigOptions {
            context: self.settings.context.clone(),
            ..Default::default()
        };

        let mut config = match (&self.settings.kubeconfig, &options.context) {
            (Some(paths), _) => {
                let kubeconfig = merge_kubeconfigs(paths.as_os_str())?;
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| FetchError::Connection(format!("invalid kubeconfig: {}", e)))?
            }
            (None, Some(_)) => Config::from_kubeconfig(&options)
                .await
                .map_err(|e| FetchError::Connection(format!("invalid kubeconfig: {}", e)))?,
            (None, None) => Config::infer().await.map_err(|e| {
                FetchError::Connection(format!("no usable cluster configuration: {}", e))
            })?,
        };

        let timeout = self.settings.timeout();
        config.connect_timeout = Some(timeout);
        config.read_timeout = Some(timeout);
        Ok(config)
    }
}

/// Read and merge a `$KUBECONFIG`-style path list
fn merge_kubeconfigs(paths: &OsStr) -> FetchResult<Kubeconfig> {
    let mut merged: Option<Kubeconfig> = None;
    for path in std::env::split_paths(paths).filter(|p| !p.as_os_str().is_empty()) {
        let next = Kubeconfig::read_from(&path).map_err(|e| kubeconfig_error(&path, e))?;
        merged = Some(match merged {
            Some(kubeconfig) => kubeconfig
                .merge(next)
                .map_err(|e| kubeconfig_error(&path, e))?,
            None => next,
        });
    }
    merged.ok_or_else(|| FetchError::Connection("empty kubeconfig path list".to_string()))
}

fn kubeconfig_error(path: &Path, error: KubeconfigError) -> FetchError {
    FetchError::Connection(format!("kubeconfig {}: {}", path.display(), error))
}

impl ClusterConnector for KubeconfigConnector {
    fn connect(&self) -> FetchResult<Box<dyn KubeApi>> {
        let runtime = session_runtime()?;

        let client = runtime.block_on(async {
            let config = self.config().await?;
            Client::try_from(config).map_err(FetchError::Kube)
        })?;
        Ok(Box::new(KubeClientApi { client, runtime }))
    }
}
