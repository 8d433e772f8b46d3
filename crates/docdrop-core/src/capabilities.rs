//! Capability traits for the upload workflow's collaborators
//!
//! The workflow controller receives one handle per collaborator at
//! construction: where the session comes from, who signs upload URLs, who
//! performs the storage write and, optionally, where upload records go.
//! Production implementations live in `docdrop-api-client` and `docdrop-db`;
//! tests substitute their own.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use tokio::sync::watch;

use crate::error::{StoreError, UploadError};
use crate::models::{Auth, NewUploadRecord, Session, UploadAuthorization, UploadRecord};

/// Live sequence of record snapshots, most recent first.
pub type RecordFeed = BoxStream<'static, Result<Vec<UploadRecord>, StoreError>>;

/// Source of session-change notifications from the identity provider.
pub trait SessionSource: Send + Sync {
    /// Receiver holding the current session and notified on every change.
    /// Dropping the receiver unsubscribes.
    fn subscribe(&self) -> watch::Receiver<Option<Session>>;
}

/// Trusted backend that mints signed upload URLs.
#[async_trait]
pub trait UploadSigner: Send + Sync {
    /// Request permission to write `file_name` with `content_type`.
    async fn request_authorization(
        &self,
        file_name: &str,
        content_type: &str,
        credential: &Auth,
    ) -> Result<UploadAuthorization, UploadError>;
}

/// Object storage accepting a single direct write per authorization.
#[async_trait]
pub trait ObjectWriter: Send + Sync {
    /// Write `payload` to the authorized location. The authorization is
    /// consumed by the attempt, whatever its outcome.
    async fn put_object(
        &self,
        authorization: UploadAuthorization,
        content_type: &str,
        payload: Bytes,
    ) -> Result<(), UploadError>;
}

/// Append-only store of upload records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a record; the store assigns `id` and `created_at`.
    async fn append(&self, record: NewUploadRecord) -> Result<UploadRecord, StoreError>;

    /// Most recent records first, at most `limit` of them.
    async fn list_recent(&self, limit: i64) -> Result<Vec<UploadRecord>, StoreError>;

    /// Live query: yields the current snapshot, then a fresh one after every
    /// change. Dropping the stream unsubscribes.
    async fn watch_recent(&self, limit: i64) -> Result<RecordFeed, StoreError>;
}
