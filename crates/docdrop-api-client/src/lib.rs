//! HTTP clients for the docdrop collaborators.
//!
//! [`ApiClient`] talks to the signing backend with configurable auth (Bearer
//! token or X-API-Key); [`StorageClient`] performs the direct PUT to a signed
//! URL; [`identity`] turns a bearer token into a [`Session`](docdrop_core::Session).

pub mod api;
pub mod identity;
pub mod storage;

use anyhow::{Context, Result};
use docdrop_core::{Auth, ClientConfig};
use reqwest::Client;
use std::time::Duration;

pub use storage::StorageClient;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// HTTP client for the signing backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    signing_path: String,
}

impl ApiClient {
    pub fn new(base_url: String, signing_path: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            signing_path,
        })
    }

    /// Client for `base_url` with the default signing path and timeout.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::new(
            base_url.into(),
            "/generate-signed-url/".to_string(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(
            config.api_url.clone(),
            config.signing_path.clone(),
            config.http_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn signing_url(&self) -> String {
        self.build_url(&self.signing_path)
    }

    fn apply_auth(request: reqwest::RequestBuilder, auth: &Auth) -> reqwest::RequestBuilder {
        match auth {
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
            Auth::XApiKey(key) => request.header("X-API-Key", key.as_str()),
        }
    }

    /// Raw client for custom requests. Caller must apply auth.
    pub fn client(&self) -> &Client {
        &self.client
    }
}
