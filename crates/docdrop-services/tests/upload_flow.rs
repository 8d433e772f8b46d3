//! End-to-end submissions against mock signing and storage servers.

use docdrop_api_client::{ApiClient, StorageClient};
use docdrop_core::{AuthStrategy, PendingSelection, RecordStore, Session, WorkflowStatus};
use docdrop_db::InMemoryRecordStore;
use docdrop_services::{SessionHub, UploadWorkflow, WorkflowCollaborators, WorkflowOptions};
use mockito::{Matcher, Server};
use std::sync::Arc;
use std::time::Duration;

const PAYLOAD: &str = "%PDF-1.4 test document";

fn workflow(server: &Server, store: &InMemoryRecordStore) -> UploadWorkflow {
    let hub = Arc::new(SessionHub::signed_in(Session::anonymous_device("u1")));
    let signer = ApiClient::with_base_url(server.url()).unwrap();
    let writer = StorageClient::new(Duration::from_secs(5)).unwrap();

    UploadWorkflow::new(
        WorkflowCollaborators {
            sessions: hub,
            signer: Arc::new(signer),
            writer: Arc::new(writer),
            records: Some(Arc::new(store.clone())),
        },
        AuthStrategy::StaticKey("secret".to_string()),
        WorkflowOptions::default(),
    )
}

fn invoice() -> PendingSelection {
    PendingSelection::new("invoice.pdf", "application/pdf", PAYLOAD.as_bytes().to_vec())
}

fn signing_query() -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("file_name".into(), "invoice.pdf".into()),
        Matcher::UrlEncoded("content_type".into(), "application/pdf".into()),
    ])
}

#[tokio::test]
async fn invoice_upload_succeeds_and_is_recorded() {
    let mut server = Server::new_async().await;
    let signed_url = format!("{}/bucket/invoice.pdf?sig=abc", server.url());

    let signing = server
        .mock("POST", "/generate-signed-url/")
        .match_query(signing_query())
        .match_header("x-api-key", "secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"signed_url":"{}","file_name":"invoice.pdf"}}"#,
            signed_url
        ))
        .create_async()
        .await;
    let storage = server
        .mock("PUT", "/bucket/invoice.pdf")
        .match_query(Matcher::UrlEncoded("sig".into(), "abc".into()))
        .match_header("content-type", "application/pdf")
        .match_body(PAYLOAD)
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let store = InMemoryRecordStore::new();
    let workflow = workflow(&server, &store);
    workflow.select_file(invoice());

    let status = workflow.submit_upload().await;

    assert_eq!(status, WorkflowStatus::success("invoice.pdf"));
    signing.assert_async().await;
    storage.assert_async().await;

    let records = store.list_recent(10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user_id, "u1");
    assert_eq!(records[0].file_type, "application/pdf");
    assert_eq!(records[0].storage_path, "uploads/invoice.pdf");
}

#[tokio::test]
async fn quota_rejection_never_reaches_storage() {
    let mut server = Server::new_async().await;

    let signing = server
        .mock("POST", "/generate-signed-url/")
        .match_query(signing_query())
        .with_status(403)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail":"quota exceeded"}"#)
        .create_async()
        .await;
    let storage = server
        .mock("PUT", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let store = InMemoryRecordStore::new();
    let workflow = workflow(&server, &store);
    workflow.select_file(invoice());

    let status = workflow.submit_upload().await;

    assert_eq!(status, WorkflowStatus::failed("quota exceeded"));
    signing.assert_async().await;
    storage.assert_async().await;
    assert!(store.is_empty());
}

#[tokio::test]
async fn storage_error_is_reported_and_not_recorded() {
    let mut server = Server::new_async().await;
    let signed_url = format!("{}/bucket/invoice.pdf?sig=abc", server.url());

    server
        .mock("POST", "/generate-signed-url/")
        .match_query(signing_query())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"signed_url":"{}"}}"#, signed_url))
        .create_async()
        .await;
    server
        .mock("PUT", "/bucket/invoice.pdf")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let store = InMemoryRecordStore::new();
    let workflow = workflow(&server, &store);
    workflow.select_file(invoice());

    let status = workflow.submit_upload().await;

    assert_eq!(status, WorkflowStatus::failed("500 - internal error"));
    assert_eq!(
        status.to_string(),
        "An error occurred: 500 - internal error"
    );
    assert!(store.is_empty());
}

#[tokio::test]
async fn unreachable_backend_fails_the_submission() {
    let store = InMemoryRecordStore::new();
    let hub = Arc::new(SessionHub::signed_in(Session::anonymous_device("u1")));
    let workflow = UploadWorkflow::new(
        WorkflowCollaborators {
            sessions: hub,
            // Port 9 (discard) is not served locally.
            signer: Arc::new(ApiClient::with_base_url("http://127.0.0.1:9").unwrap()),
            writer: Arc::new(StorageClient::new(Duration::from_secs(5)).unwrap()),
            records: Some(Arc::new(store.clone())),
        },
        AuthStrategy::StaticKey("secret".to_string()),
        WorkflowOptions::default(),
    );
    workflow.select_file(invoice());

    let status = workflow.submit_upload().await;

    assert!(status.failure_reason().is_some());
    assert!(store.is_empty());
}

#[tokio::test]
async fn backend_validation_messages_pass_through() {
    let cases = [
        ("../escape.pdf", "application/pdf", 400, "Invalid file name."),
        ("notes.txt", "text/plain", 400, "Unsupported content type: text/plain"),
        ("invoice.pdf", "application/pdf", 401, "Invalid API Key"),
    ];

    for (file_name, content_type, status_code, detail) in cases {
        let mut server = Server::new_async().await;
        let signing = server
            .mock("POST", "/generate-signed-url/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("file_name".into(), file_name.into()),
                Matcher::UrlEncoded("content_type".into(), content_type.into()),
            ]))
            .with_status(status_code)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"detail":"{}"}}"#, detail))
            .create_async()
            .await;
        let storage = server
            .mock("PUT", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let store = InMemoryRecordStore::new();
        let workflow = workflow(&server, &store);
        workflow.select_file(PendingSelection::new(
            file_name,
            content_type,
            PAYLOAD.as_bytes().to_vec(),
        ));

        let status = workflow.submit_upload().await;

        assert_eq!(status, WorkflowStatus::failed(detail), "{}", file_name);
        signing.assert_async().await;
        storage.assert_async().await;
        assert!(store.is_empty());
    }
}
