//! Direct writes to object storage through a signed URL.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use docdrop_core::{ObjectWriter, UploadAuthorization, UploadError};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

/// Performs the single PUT allowed by an [`UploadAuthorization`].
///
/// Sends no credentials of its own: the signed URL is the only authority.
#[derive(Clone, Debug)]
pub struct StorageClient {
    client: Client,
}

impl StorageClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create storage HTTP client")?;

        Ok(Self { client })
    }

    /// PUT `payload` to the signed URL. Any 2xx is success; otherwise the
    /// response body is read as plain text since storage error bodies are
    /// not guaranteed to be JSON.
    pub async fn put_signed(
        &self,
        authorization: UploadAuthorization,
        content_type: &str,
        payload: Bytes,
    ) -> Result<(), UploadError> {
        let size = payload.len();
        let response = self
            .client
            .put(&authorization.signed_url)
            .header(CONTENT_TYPE, content_type)
            .body(payload)
            .send()
            .await
            .map_err(|e| UploadError::StorageTransport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                url = %authorization.redacted_url(),
                "Storage rejected signed upload"
            );
            return Err(UploadError::StorageRejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(
            url = %authorization.redacted_url(),
            size_bytes = size,
            "Stored object via signed URL"
        );
        Ok(())
    }
}

#[async_trait]
impl ObjectWriter for StorageClient {
    async fn put_object(
        &self,
        authorization: UploadAuthorization,
        content_type: &str,
        payload: Bytes,
    ) -> Result<(), UploadError> {
        self.put_signed(authorization, content_type, payload).await
    }
}
