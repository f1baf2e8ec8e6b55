//! REST client for Secret Manager v1

use std::path::Path;

use reqwest::Client;
use serde::Deserialize;
use tokio::runtime::Runtime;
use yup_oauth2::authenticator::ApplicationDefaultCredentialsTypes;
use yup_oauth2::{
    AccessToken, ApplicationDefaultCredentialsAuthenticator, ApplicationDefaultCredentialsFlowOpts,
    ServiceAccountAuthenticator,
};

use super::{SecretManagerApi, SecretManagerConnector};
use crate::backends::error::{FetchError, FetchResult};
use crate::backends::traits::{decode_base64, session_runtime};
use crate::config::SecretManagerSettings;

const SERVICE: &str = "Secret Manager";
const SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

#[derive(Debug, Deserialize)]
struct AccessResponse {
    payload: Payload,
}

#[derive(Debug, Deserialize)]
struct Payload {
    /// Base64 of the stored bytes
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// `GET {endpoint}/{name}:access` with an OAuth bearer token
pub struct RestSecretManagerApi {
    client: Client,
    runtime: Runtime,
    endpoint: String,
    token: String,
}

impl RestSecretManagerApi {
    pub fn new(
        runtime: Runtime,
        client: Client,
        endpoint: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            runtime,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    async fn access(&self, name: &str) -> FetchResult<Vec<u8>> {
        let response = self
            .client
            .get(format!("{}/{}:access", self.endpoint, name))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(FetchError::from_status(SERVICE, status.as_u16(), name, message));
        }

        let access: AccessResponse = response.json().await?;
        decode_base64(access.payload.data)
    }
}

impl SecretManagerApi for RestSecretManagerApi {
    fn access_secret_version(&self, name: &str) -> FetchResult<Vec<u8>> {
        self.runtime.block_on(self.access(name))
    }
}

/// Builds a [`RestSecretManagerApi`] with an OAuth access token
///
/// Token sources, first match wins: the configured `access_token`, the
/// configured service account key file, then application default credentials
/// (`$GOOGLE_APPLICATION_CREDENTIALS` or the GCE metadata server).
#[derive(Debug, Clone, Default)]
pub struct RestSecretManagerConnector {
    settings: SecretManagerSettings,
}

impl RestSecretManagerConnector {
    pub fn new(settings: SecretManagerSettings) -> Self {
        Self { settings }
    }

    async fn token(&self) -> FetchResult<String> {
        if let Some(token) = &self.settings.access_token {
            return Ok(token.clone());
        }
        let request = async {
            match &self.settings.credentials_file {
                Some(path) => service_account_token(path).await,
                None => default_credentials_token().await,
            }
        };
        tokio::time::timeout(self.settings.timeout(), request)
            .await
            .map_err(|_| FetchError::Authentication("timed out requesting an access token".into()))?
    }
}

async fn service_account_token(path: &Path) -> FetchResult<String> {
    let source = format!("service account key {}", path.display());
    let key = yup_oauth2::read_service_account_key(path)
        .await
        .map_err(|e| FetchError::Authentication(format!("failed to read {}: {}", source, e)))?;
    let auth = ServiceAccountAuthenticator::builder(key)
        .build()
        .await
        .map_err(|e| FetchError::Authentication(format!("{}: {}", source, e)))?;
    access_token(auth.token(SCOPES).await, &source)
}

async fn default_credentials_token() -> FetchResult<String> {
    let source = "application default credentials";
    let opts = ApplicationDefaultCredentialsFlowOpts::default();
    let auth = match ApplicationDefaultCredentialsAuthenticator::builder(opts).await {
        ApplicationDefaultCredentialsTypes::ServiceAccount(builder) => builder.build().await,
        ApplicationDefaultCredentialsTypes::InstanceMetadata(builder) => builder.build().await,
    }
    .map_err(|e| FetchError::Authentication(format!("{}: {}", source, e)))?;
    access_token(auth.token(SCOPES).await, source)
}

fn access_token(
    token: Result<AccessToken, yup_oauth2::Error>,
    source: &str,
) -> FetchResult<String> {
    let token = token.map_err(|e| FetchError::Authentication(format!("{}: {}", source, e)))?;
    token
        .token()
        .map(str::to_string)
        .ok_or_else(|| FetchError::Authentication(format!("{} returned no access token", source)))
}

impl SecretManagerConnector for RestSecretManagerConnector {
    fn connect(&self) -> FetchResult<Box<dyn SecretManagerApi>> {
        let runtime = session_runtime()?;
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(self.settings.timeout())
            .build()?;
        let token = runtime.block_on(self.token())?;
        Ok(Box::new(RestSecretManagerApi::new(
            runtime,
            client,
            &self.settings.endpoint,
            token,
        )))
    }
}
