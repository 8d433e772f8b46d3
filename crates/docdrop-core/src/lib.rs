//! Docdrop Core Library
//!
//! This crate provides the domain models, error types, configuration and
//! capability traits shared by every docdrop component. The upload workflow
//! itself lives in `docdrop-services`; the concrete collaborators (signing
//! backend, object storage, metadata store) implement the traits defined here.

pub mod capabilities;
pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use capabilities::{ObjectWriter, RecordFeed, RecordStore, SessionSource, UploadSigner};
pub use config::{AuthStrategy, ClientConfig, RecordBackend};
pub use error::{ErrorMetadata, LogLevel, StoreError, UploadError};
pub use models::{
    Auth, NewUploadRecord, PendingSelection, Session, UploadAuthorization, UploadRecord,
    WorkflowStatus,
};
