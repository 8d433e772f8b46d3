//! Wiring and formatting helpers for the `docdrop` binary.

use anyhow::{Context, Result};
use docdrop_api_client::{ApiClient, StorageClient};
use docdrop_core::{
    AuthStrategy, ClientConfig, PendingSelection, RecordBackend, RecordStore, Session,
    UploadRecord,
};
use docdrop_db::{setup_database, InMemoryRecordStore, UploadRecordRepository};
use docdrop_services::{SessionHub, UploadWorkflow, WorkflowCollaborators, WorkflowOptions};
use std::path::Path;
use std::sync::Arc;

const FILE_NAME_WIDTH: usize = 32;
const TYPE_WIDTH: usize = 24;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Content type for `path`, guessed from its extension.
pub fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Read a local file into a selection. `content_type` overrides the guess.
pub async fn load_selection(path: &Path, content_type: Option<&str>) -> Result<PendingSelection> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Not a file path: {}", path.display()))?
        .to_string();

    let payload = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let content_type = match content_type {
        Some(ct) => ct.to_string(),
        None => guess_content_type(path),
    };

    Ok(PendingSelection::new(name, content_type, payload))
}

/// Identity for this process: the configured device user in api-key mode,
/// the token's subject in bearer mode.
pub fn session_hub(config: &ClientConfig) -> Result<SessionHub> {
    match (&config.auth, config.session_token.as_deref()) {
        (AuthStrategy::BearerToken, Some(token)) => {
            SessionHub::from_bearer_token(token).context("Failed to establish session from token")
        }
        (AuthStrategy::BearerToken, None) => Ok(SessionHub::new()),
        (AuthStrategy::StaticKey(_), _) => Ok(SessionHub::signed_in(Session::anonymous_device(
            config.user_id.clone(),
        ))),
    }
}

/// Metadata store selected by `DOCDROP_RECORDS`.
pub async fn record_store(config: &ClientConfig) -> Result<Option<Arc<dyn RecordStore>>> {
    let store: Option<Arc<dyn RecordStore>> = match config.record_backend {
        RecordBackend::None => None,
        RecordBackend::Memory => Some(Arc::new(InMemoryRecordStore::new())),
        RecordBackend::Postgres => {
            let pool = setup_database(config).await?;
            Some(Arc::new(UploadRecordRepository::new(pool)))
        }
    };
    tracing::debug!(backend = %config.record_backend, "Record store selected");
    Ok(store)
}

pub async fn build_workflow(config: &ClientConfig) -> Result<UploadWorkflow> {
    let sessions = session_hub(config)?;
    let signer = ApiClient::from_config(config)?;
    let writer = StorageClient::new(config.http_timeout())?;
    let records = record_store(config).await?;

    Ok(UploadWorkflow::new(
        WorkflowCollaborators {
            sessions: Arc::new(sessions),
            signer: Arc::new(signer),
            writer: Arc::new(writer),
            records,
        },
        config.auth.clone(),
        WorkflowOptions::from_config(config),
    ))
}

/// Plain-text table of records, most recent first.
pub fn format_record_table(records: &[UploadRecord]) -> String {
    if records.is_empty() {
        return "No uploads recorded.".to_string();
    }

    let mut out = format!(
        "{:<19}  {:<12}  {:<name$}  {:<ty$}  {}\n",
        "UPLOADED",
        "USER",
        "FILE",
        "TYPE",
        "PATH",
        name = FILE_NAME_WIDTH,
        ty = TYPE_WIDTH,
    );
    for record in records {
        out.push_str(&format!(
            "{:<19}  {:<12}  {:<name$}  {:<ty$}  {}\n",
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            truncate_string(&record.user_id, 12),
            truncate_string(&record.file_name, FILE_NAME_WIDTH),
            truncate_string(&record.file_type, TYPE_WIDTH),
            record.storage_path,
            name = FILE_NAME_WIDTH,
            ty = TYPE_WIDTH,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::io::Write;

    fn config(vars: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
    }

    #[test]
    fn truncate_string_counts_characters() {
        assert_eq!(truncate_string("résumé-final.pdf", 9), "résumé...");
    }

    #[test]
    fn content_type_guessed_from_extension() {
        assert_eq!(guess_content_type(Path::new("invoice.pdf")), "application/pdf");
        assert_eq!(guess_content_type(Path::new("photo.PNG")), "image/png");
        assert_eq!(
            guess_content_type(Path::new("blob.unknownext")),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn load_selection_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.pdf");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"%PDF-1.4").unwrap();

        let selection = load_selection(&path, None).await.unwrap();
        assert_eq!(selection.name, "invoice.pdf");
        assert_eq!(selection.content_type, "application/pdf");
        assert_eq!(selection.size(), 8);

        let selection = load_selection(&path, Some("text/plain")).await.unwrap();
        assert_eq!(selection.content_type, "text/plain");
    }

    #[tokio::test]
    async fn load_selection_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_selection(&dir.path().join("missing.pdf"), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn api_key_mode_signs_in_device_user() {
        let hub = session_hub(&config(&[("DOCDROP_API_KEY", "k"), ("DOCDROP_USER_ID", "kiosk-7")]))
            .unwrap();
        assert_eq!(hub.current().unwrap().user_id, "kiosk-7");
    }

    #[tokio::test]
    async fn memory_backend_builds_store() {
        let cfg = config(&[("DOCDROP_API_KEY", "k"), ("DOCDROP_RECORDS", "memory")]);
        assert!(record_store(&cfg).await.unwrap().is_some());

        let cfg = config(&[("DOCDROP_API_KEY", "k")]);
        assert!(record_store(&cfg).await.unwrap().is_none());
    }

    #[test]
    fn record_table_lists_rows() {
        let records = vec![UploadRecord {
            id: uuid::Uuid::nil(),
            user_id: "u1".to_string(),
            file_name: "invoice.pdf".to_string(),
            file_type: "application/pdf".to_string(),
            storage_path: "uploads/invoice.pdf".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap(),
        }];

        let table = format_record_table(&records);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("UPLOADED"));
        assert!(lines[1].starts_with("2024-06-01 12:30:00"));
        assert!(lines[1].contains("invoice.pdf"));
        assert!(lines[1].ends_with("uploads/invoice.pdf"));

        assert_eq!(format_record_table(&[]), "No uploads recorded.");
    }
}
