use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PendingSelection, Session};

/// Metadata entry describing a completed upload. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: Uuid,
    pub user_id: String,
    pub file_name: String,
    pub file_type: String,
    pub storage_path: String,
    /// Assigned by the metadata store
    pub created_at: DateTime<Utc>,
}

/// Append payload for the metadata store; `id` and `created_at` are
/// assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUploadRecord {
    pub user_id: String,
    pub file_name: String,
    pub file_type: String,
    pub storage_path: String,
}

impl NewUploadRecord {
    /// Record for a selection that was just written to storage by `session`.
    pub fn for_upload(session: &Session, selection: &PendingSelection, storage_prefix: &str) -> Self {
        Self {
            user_id: session.user_id.clone(),
            file_name: selection.name.clone(),
            file_type: selection.content_type.clone(),
            storage_path: storage_path_for(storage_prefix, &selection.name),
        }
    }
}

/// Storage location reference derived from the file name.
pub fn storage_path_for(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", prefix, file_name)
    }
}
