//! Session plumbing between the identity provider and the workflow.

use docdrop_api_client::identity::session_from_token;
use docdrop_core::{Session, SessionSource, UploadError};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// In-process identity adapter: holds the current session and notifies
/// subscribers on sign-in and sign-out.
pub struct SessionHub {
    sender: watch::Sender<Option<Session>>,
}

impl SessionHub {
    /// Hub with no session (anonymous)
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    /// Hub that starts with `session` already established
    pub fn signed_in(session: Session) -> Self {
        let (sender, _) = watch::channel(Some(session));
        Self { sender }
    }

    /// Hub signed in with the session carried by a bearer token
    pub fn from_bearer_token(token: &str) -> Result<Self, UploadError> {
        Ok(Self::signed_in(session_from_token(token)?))
    }

    pub fn sign_in(&self, session: Session) {
        tracing::info!(user_id = %session.user_id, "Session established");
        self.sender.send_replace(Some(session));
    }

    pub fn sign_out(&self) {
        if let Some(previous) = self.sender.send_replace(None) {
            tracing::info!(user_id = %previous.user_id, "Session ended");
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.sender.borrow().clone()
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionSource for SessionHub {
    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.sender.subscribe()
    }
}

/// Forwards session changes from a [`SessionSource`] into a local cell.
///
/// `on_sign_out` runs each time the session of a user ends: when the session
/// becomes absent, and when it is replaced by another user's session. A
/// sign-out immediately followed by a sign-in may reach the observer as a
/// single change, so the user switch counts as a sign-out too. The subscription ends on [`shutdown`](Self::shutdown), on drop, or when the
/// source goes away.
pub struct SessionObserver {
    current: Arc<watch::Sender<Option<Session>>>,
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl SessionObserver {
    pub fn spawn<F>(source: &dyn SessionSource, on_sign_out: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let mut receiver = source.subscribe();
        let initial = receiver.borrow_and_update().clone();
        let (current, _) = watch::channel(initial);
        let current = Arc::new(current);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let mirror = current.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    changed = receiver.changed() => {
                        if changed.is_err() {
                            tracing::debug!("Session source closed");
                            break;
                        }
                        let session = receiver.borrow_and_update().clone();
                        let signed_out = match (&*mirror.borrow(), &session) {
                            (Some(prev), Some(next)) => prev.user_id != next.user_id,
                            (Some(_), None) => true,
                            (None, _) => false,
                        };
                        // Runs before the new session is visible to readers.
                        if signed_out {
                            on_sign_out();
                        }
                        mirror.send_replace(session);
                    }
                }
            }
            tracing::debug!("Session observer stopped");
        });

        Self {
            current,
            shutdown_tx,
            handle,
        }
    }

    /// Latest session seen
    pub fn current(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }

    /// Unsubscribe from the source. Later session changes are ignored.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.try_send(());
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for SessionObserver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
