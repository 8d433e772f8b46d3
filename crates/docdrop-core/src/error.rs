//! Error types module
//!
//! `UploadError` covers every way a submission can end without success. It is
//! split along the collaborator that failed: local preconditions, the signing
//! backend, the storage service, the metadata store and the identity provider.
//! A signing failure is never reported as a storage failure and vice versa.
//!
//! `StoreError` is the metadata store's own error; `From<sqlx::Error>` is gated
//! behind the `sqlx` feature.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like a missing selection
    Debug,
    /// Warning level - for rejections by a collaborator
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error is presented to the user.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "STORAGE_REJECTED")
    fn error_code(&self) -> &'static str;

    /// Whether re-submitting the same selection may succeed
    fn is_recoverable(&self) -> bool;

    /// Human-readable reason shown as the workflow status
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file selected")]
    NoFileSelected,

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("An upload is already in progress")]
    UploadInProgress,

    #[error("Failed to get signed URL: {status} {detail}")]
    AuthorizationRejected { status: u16, detail: String },

    #[error("Failed to reach signing service: {0}")]
    AuthorizationTransport(String),

    #[error("Invalid signing response: {0}")]
    InvalidAuthorization(String),

    #[error("Failed to upload file to storage: {status} - {body}")]
    StorageRejected { status: u16, body: String },

    #[error("Failed to reach storage service: {0}")]
    StorageTransport(String),

    #[error("Failed to record upload: {0}")]
    Metadata(#[from] StoreError),

    #[error("Identity error: {0}")]
    Identity(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Metadata store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Record feed error: {0}")]
    Feed(String),

    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for StoreError {
    fn from(err: SqlxError) -> Self {
        StoreError::Database(err)
    }
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn upload_error_static_metadata(err: &UploadError) -> (&'static str, bool, LogLevel) {
    match err {
        UploadError::NoFileSelected => ("NO_FILE_SELECTED", false, LogLevel::Debug),
        UploadError::AuthenticationRequired => {
            ("AUTHENTICATION_REQUIRED", false, LogLevel::Debug)
        }
        UploadError::UploadInProgress => ("UPLOAD_IN_PROGRESS", true, LogLevel::Debug),
        UploadError::AuthorizationRejected { status, .. } => (
            "AUTHORIZATION_REJECTED",
            *status >= 500 || *status == 429,
            LogLevel::Warn,
        ),
        UploadError::AuthorizationTransport(_) => {
            ("AUTHORIZATION_UNREACHABLE", true, LogLevel::Error)
        }
        UploadError::InvalidAuthorization(_) => {
            ("INVALID_AUTHORIZATION", false, LogLevel::Error)
        }
        UploadError::StorageRejected { status, .. } => (
            "STORAGE_REJECTED",
            *status >= 500 || *status == 429,
            LogLevel::Warn,
        ),
        UploadError::StorageTransport(_) => ("STORAGE_UNREACHABLE", true, LogLevel::Error),
        UploadError::Metadata(_) => ("METADATA_APPEND_FAILED", true, LogLevel::Warn),
        UploadError::Identity(_) => ("IDENTITY_ERROR", false, LogLevel::Warn),
        UploadError::Config(_) => ("CONFIG_ERROR", false, LogLevel::Error),
    }
}

impl UploadError {
    /// True for failures detected before any network call
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            UploadError::NoFileSelected
                | UploadError::AuthenticationRequired
                | UploadError::UploadInProgress
        )
    }

    /// True for failures reported by or while reaching the signing backend
    pub fn is_authorization_failure(&self) -> bool {
        matches!(
            self,
            UploadError::AuthorizationRejected { .. }
                | UploadError::AuthorizationTransport(_)
                | UploadError::InvalidAuthorization(_)
        )
    }

    /// True for failures of the direct write to storage
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            UploadError::StorageRejected { .. } | UploadError::StorageTransport(_)
        )
    }
}

impl ErrorMetadata for UploadError {
    fn error_code(&self) -> &'static str {
        upload_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        upload_error_static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        upload_error_static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            UploadError::NoFileSelected => "no file selected".to_string(),
            UploadError::AuthenticationRequired => "authentication required".to_string(),
            UploadError::UploadInProgress => "upload already in progress".to_string(),
            UploadError::AuthorizationRejected { detail, .. } => detail.clone(),
            UploadError::AuthorizationTransport(ref msg) => {
                format!("could not reach signing service: {}", msg)
            }
            UploadError::InvalidAuthorization(ref msg) => {
                format!("invalid signing response: {}", msg)
            }
            UploadError::StorageRejected { status, body } => format!("{} - {}", status, body),
            UploadError::StorageTransport(ref msg) => {
                format!("could not reach storage service: {}", msg)
            }
            UploadError::Metadata(_) => "failed to record upload".to_string(),
            UploadError::Identity(ref msg) => msg.clone(),
            UploadError::Config(ref msg) => msg.clone(),
        }
    }
}
