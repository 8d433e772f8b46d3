//! Process-local record store.

use async_trait::async_trait;
use chrono::Utc;
use docdrop_core::{NewUploadRecord, RecordFeed, RecordStore, StoreError, UploadRecord};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Record store kept in memory, newest record first.
///
/// `created_at` never decreases from one append to the next, even if the
/// wall clock steps backwards.
#[derive(Clone)]
pub struct InMemoryRecordStore {
    records: Arc<watch::Sender<Vec<UploadRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        let (records, _) = watch::channel(Vec::new());
        Self {
            records: Arc::new(records),
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_limit(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn append(&self, record: NewUploadRecord) -> Result<UploadRecord, StoreError> {
        let mut created = UploadRecord {
            id: Uuid::new_v4(),
            user_id: record.user_id,
            file_name: record.file_name,
            file_type: record.file_type,
            storage_path: record.storage_path,
            created_at: Utc::now(),
        };

        self.records.send_modify(|records| {
            if let Some(latest) = records.first() {
                if latest.created_at > created.created_at {
                    created.created_at = latest.created_at;
                }
            }
            records.insert(0, created.clone());
        });

        tracing::debug!(record_id = %created.id, "Upload record stored in memory");
        Ok(created)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<UploadRecord>, StoreError> {
        Ok(self
            .records
            .borrow()
            .iter()
            .take(clamp_limit(limit))
            .cloned()
            .collect())
    }

    async fn watch_recent(&self, limit: i64) -> Result<RecordFeed, StoreError> {
        let limit = clamp_limit(limit);
        let receiver = self.records.subscribe();

        let feed = futures::stream::unfold((receiver, true), move |(mut receiver, first)| async move {
            if !first && receiver.changed().await.is_err() {
                return None;
            }
            let snapshot: Vec<UploadRecord> = receiver
                .borrow_and_update()
                .iter()
                .take(limit)
                .cloned()
                .collect();
            Some((Ok(snapshot), (receiver, false)))
        })
        .boxed();

        Ok(feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(name: &str) -> NewUploadRecord {
        NewUploadRecord {
            user_id: "u1".to_string(),
            file_name: name.to_string(),
            file_type: "application/pdf".to_string(),
            storage_path: format!("uploads/{}", name),
        }
    }

    #[tokio::test]
    async fn append_assigns_id_and_timestamp() {
        let store = InMemoryRecordStore::new();
        let first = store.append(new_record("a.pdf")).await.unwrap();
        let second = store.append(new_record("b.pdf")).await.unwrap();

        assert_ne!(first.id, second.id);
        assert!(second.created_at >= first.created_at);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn list_recent_is_newest_first_and_limited() {
        let store = InMemoryRecordStore::new();
        for name in ["a.pdf", "b.pdf", "c.pdf"] {
            store.append(new_record(name)).await.unwrap();
        }

        let names: Vec<String> = store
            .list_recent(2)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.file_name)
            .collect();
        assert_eq!(names, vec!["c.pdf", "b.pdf"]);

        assert!(store.list_recent(-1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn watch_yields_current_snapshot_then_updates() {
        let store = InMemoryRecordStore::new();
        store.append(new_record("a.pdf")).await.unwrap();

        let mut feed = store.watch_recent(10).await.unwrap();
        let initial = feed.next().await.unwrap().unwrap();
        assert_eq!(initial.len(), 1);

        store.append(new_record("b.pdf")).await.unwrap();
        let updated = feed.next().await.unwrap().unwrap();
        assert_eq!(updated.len(), 2);
        assert_eq!(updated[0].file_name, "b.pdf");
    }

    #[tokio::test]
    async fn feed_ends_when_store_is_dropped() {
        let store = InMemoryRecordStore::new();
        let mut feed = store.watch_recent(10).await.unwrap();
        assert!(feed.next().await.unwrap().unwrap().is_empty());

        drop(store);
        assert!(feed.next().await.is_none());
    }
}
