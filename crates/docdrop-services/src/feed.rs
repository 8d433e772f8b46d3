//! Live list of upload records for the presentation layer.

use docdrop_core::{RecordStore, UploadRecord};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Delay before subscribing again after `watch_recent` failed
const SUBSCRIBE_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Keeps the latest snapshot of a [`RecordStore`] live query in memory,
/// most recent record first.
///
/// A failed snapshot is logged and the previous one is kept. A failed
/// subscription is retried until it succeeds or the observer shuts down. The
/// subscription ends on [`shutdown`](Self::shutdown), on drop, or when the feed ends.
pub struct RecordFeedObserver {
    snapshot: Arc<watch::Sender<Vec<UploadRecord>>>,
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl RecordFeedObserver {
    pub fn spawn(store: Arc<dyn RecordStore>, limit: i64) -> Self {
        Self::spawn_with_retry_delay(store, limit, SUBSCRIBE_RETRY_DELAY)
    }

    pub fn spawn_with_retry_delay(
        store: Arc<dyn RecordStore>,
        limit: i64,
        retry_delay: Duration,
    ) -> Self {
        let (snapshot, _) = watch::channel(Vec::new());
        let snapshot = Arc::new(snapshot);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let latest = snapshot.clone();
        let handle = tokio::spawn(async move {
            let mut feed = loop {
                let subscription = tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => return,
                    subscription = store.watch_recent(limit) => subscription,
                };
                match subscription {
                    Ok(feed) => break feed,
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            retry_in_ms = retry_delay.as_millis() as u64,
                            "Failed to subscribe to record feed, will retry"
                        );
                        tokio::select! {
                            biased;
                            _ = shutdown_rx.recv() => return,
                            _ = tokio::time::sleep(retry_delay) => {}
                        }
                    }
                }
            };

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    next = feed.next() => match next {
                        Some(Ok(records)) => {
                            tracing::debug!(count = records.len(), "Record feed snapshot");
                            latest.send_replace(records);
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Record feed error, keeping last snapshot");
                        }
                        None => {
                            tracing::debug!("Record feed ended");
                            break;
                        }
                    },
                }
            }
        });

        Self {
            snapshot,
            shutdown_tx,
            handle,
        }
    }

    /// Latest snapshot, most recent first
    pub fn records(&self) -> Vec<UploadRecord> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<UploadRecord>> {
        self.snapshot.subscribe()
    }

    /// Unsubscribe from the store. The last snapshot stays readable.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.try_send(());
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for RecordFeedObserver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
