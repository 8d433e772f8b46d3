//! Upload workflow controller
//!
//! One submission runs: selection check, session check, signed URL request,
//! direct storage write, then a best-effort metadata append. Every step is
//! awaited in order; a failure ends the submission with a `Failed` status and
//! the next call to [`UploadWorkflow::submit_upload`] starts over.

use docdrop_core::{
    AuthStrategy, ClientConfig, ErrorMetadata, LogLevel, NewUploadRecord, ObjectWriter,
    PendingSelection, RecordStore, Session, SessionSource, UploadError, UploadRecord,
    UploadSigner, WorkflowStatus,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::feed::RecordFeedObserver;
use crate::session::SessionObserver;

const DEFAULT_STORAGE_PREFIX: &str = "uploads";
const DEFAULT_RECORD_FEED_LIMIT: i64 = 50;

/// Capability handles the controller works with.
pub struct WorkflowCollaborators {
    pub sessions: Arc<dyn SessionSource>,
    pub signer: Arc<dyn UploadSigner>,
    pub writer: Arc<dyn ObjectWriter>,
    /// Metadata store; `None` skips the record step
    pub records: Option<Arc<dyn RecordStore>>,
}

#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    /// Answer a submission made while another is running with
    /// `Failed("upload already in progress")`
    pub reject_concurrent_submissions: bool,
    /// Prefix of the storage path stored in each record
    pub storage_prefix: String,
    /// Size of the live record list. `None` disables the feed observer.
    pub record_feed_limit: Option<i64>,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            reject_concurrent_submissions: false,
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
            record_feed_limit: Some(DEFAULT_RECORD_FEED_LIMIT),
        }
    }
}

impl WorkflowOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            reject_concurrent_submissions: config.reject_concurrent_submissions,
            storage_prefix: config.storage_prefix.clone(),
            record_feed_limit: Some(config.record_feed_limit),
        }
    }
}

/// Clears the in-flight flag when the submission ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Controller behind the upload form.
///
/// Holds the pending selection, the status of the latest submission, the
/// current session and the recent upload records, and exposes them read-only
/// to the presentation layer. Must be created inside a tokio runtime: the
/// session and record feed observers run as tasks.
pub struct UploadWorkflow {
    signer: Arc<dyn UploadSigner>,
    writer: Arc<dyn ObjectWriter>,
    records: Option<Arc<dyn RecordStore>>,
    auth: AuthStrategy,
    options: WorkflowOptions,
    selection: Arc<watch::Sender<Option<PendingSelection>>>,
    status: watch::Sender<WorkflowStatus>,
    in_flight: AtomicBool,
    session_observer: SessionObserver,
    feed_observer: Option<RecordFeedObserver>,
}

impl UploadWorkflow {
    pub fn new(
        collaborators: WorkflowCollaborators,
        auth: AuthStrategy,
        options: WorkflowOptions,
    ) -> Self {
        let (selection, _) = watch::channel(None);
        let selection = Arc::new(selection);
        let (status, _) = watch::channel(WorkflowStatus::Idle);

        let cleared = selection.clone();
        let session_observer = SessionObserver::spawn(collaborators.sessions.as_ref(), move || {
            if cleared.send_replace(None).is_some() {
                tracing::info!("Session ended, pending selection cleared");
            }
        });

        let feed_observer = match (&collaborators.records, options.record_feed_limit) {
            (Some(store), Some(limit)) => Some(RecordFeedObserver::spawn(store.clone(), limit)),
            _ => None,
        };

        Self {
            signer: collaborators.signer,
            writer: collaborators.writer,
            records: collaborators.records,
            auth,
            options,
            selection,
            status,
            in_flight: AtomicBool::new(false),
            session_observer,
            feed_observer,
        }
    }

    /// Replace the pending selection and reset the status.
    pub fn select_file(&self, candidate: PendingSelection) {
        tracing::debug!(
            file_name = %candidate.name,
            content_type = %candidate.content_type,
            size = candidate.size(),
            "File selected"
        );
        self.selection.send_replace(Some(candidate));
        self.status.send_replace(WorkflowStatus::Idle);
    }

    pub fn clear_selection(&self) {
        self.selection.send_replace(None);
    }

    pub fn selection(&self) -> Option<PendingSelection> {
        self.selection.borrow().clone()
    }

    pub fn status(&self) -> WorkflowStatus {
        self.status.borrow().clone()
    }

    /// Status receiver; each new status replaces the previous one
    pub fn subscribe_status(&self) -> watch::Receiver<WorkflowStatus> {
        self.status.subscribe()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.session_observer.current()
    }

    /// Latest record snapshot, most recent first. Empty without a feed.
    pub fn records(&self) -> Vec<UploadRecord> {
        self.feed_observer
            .as_ref()
            .map(RecordFeedObserver::records)
            .unwrap_or_default()
    }

    pub fn subscribe_records(&self) -> Option<watch::Receiver<Vec<UploadRecord>>> {
        self.feed_observer.as_ref().map(RecordFeedObserver::subscribe)
    }

    /// Stop observing the session and the record feed.
    pub fn shutdown(&self) {
        self.session_observer.shutdown();
        if let Some(feed) = &self.feed_observer {
            feed.shutdown();
        }
    }

    /// Run one upload attempt for the pending selection and return its
    /// terminal status (also published on the status channel).
    #[tracing::instrument(skip_all)]
    pub async fn submit_upload(&self) -> WorkflowStatus {
        let _in_flight = if self.options.reject_concurrent_submissions {
            match InFlight::acquire(&self.in_flight) {
                Some(guard) => Some(guard),
                None => {
                    let err = UploadError::UploadInProgress;
                    log_failure(&err);
                    return WorkflowStatus::failed(err.client_message());
                }
            }
        } else {
            None
        };

        self.publish(WorkflowStatus::Validating);

        match self.transfer().await {
            Ok((session, selection)) => {
                tracing::info!(
                    file_name = %selection.name,
                    user_id = %session.user_id,
                    size = selection.size(),
                    "File uploaded"
                );
                let status = WorkflowStatus::success(selection.name.clone());
                self.publish(status.clone());
                self.record_upload(&session, &selection).await;
                status
            }
            Err(err) => {
                log_failure(&err);
                let status = WorkflowStatus::failed(err.client_message());
                self.publish(status.clone());
                status
            }
        }
    }

    /// Preconditions, authorization and storage write. Returns the session
    /// snapshot and selection the upload was made with.
    async fn transfer(&self) -> Result<(Session, PendingSelection), UploadError> {
        let selection = self.selection().ok_or(UploadError::NoFileSelected)?;
        let session = self
            .current_session()
            .ok_or(UploadError::AuthenticationRequired)?;
        let credential = self
            .auth
            .credential_for(&session)
            .ok_or(UploadError::AuthenticationRequired)?;

        self.publish(WorkflowStatus::RequestingAuthorization);
        let authorization = self
            .signer
            .request_authorization(&selection.name, &selection.content_type, &credential)
            .await?;
        tracing::debug!(url = %authorization.redacted_url(), "Upload authorized");

        self.publish(WorkflowStatus::Uploading);
        self.writer
            .put_object(
                authorization,
                &selection.content_type,
                selection.payload.clone(),
            )
            .await?;

        Ok((session, selection))
    }

    async fn record_upload(&self, session: &Session, selection: &PendingSelection) {
        let Some(store) = &self.records else {
            return;
        };

        let record = NewUploadRecord::for_upload(session, selection, &self.options.storage_prefix);
        match store.append(record).await {
            Ok(created) => {
                tracing::debug!(record_id = %created.id, "Upload recorded");
            }
            Err(e) => {
                let err = UploadError::Metadata(e);
                tracing::warn!(
                    error = %err,
                    error_code = err.error_code(),
                    file_name = %selection.name,
                    "Upload succeeded but could not be recorded"
                );
            }
        }
    }

    fn publish(&self, status: WorkflowStatus) {
        self.status.send_replace(status);
    }
}

fn log_failure(err: &UploadError) {
    let error_code = err.error_code();
    match err.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %err, error_code = error_code, "Upload failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %err, error_code = error_code, "Upload failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %err, error_code = error_code, "Upload failed");
        }
    }
}
