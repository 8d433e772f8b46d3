use async_trait::async_trait;
use docdrop_core::{NewUploadRecord, RecordFeed, RecordStore, StoreError, UploadRecord};
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::feed_from_channel;

/// Channel name for PostgreSQL LISTEN/NOTIFY when a record is appended.
pub const RECORDS_NOTIFY_CHANNEL: &str = "docdrop_upload_records";

/// Delay before re-reading the feed after the listener connection failed
const LISTENER_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Repository for upload records
#[derive(Clone)]
pub struct UploadRecordRepository {
    pool: PgPool,
}

impl UploadRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a record and notify feed listeners. The notification is
    /// delivered on commit, so listeners never see an uncommitted row.
    #[tracing::instrument(skip(self, record), fields(file_name = %record.file_name))]
    pub async fn create_record(&self, record: NewUploadRecord) -> Result<UploadRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, UploadRecord>(
            r#"
            INSERT INTO upload_records (id, user_id, file_name, file_type, storage_path)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, file_name, file_type, storage_path, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.user_id)
        .bind(&record.file_name)
        .bind(&record.file_type)
        .bind(&record.storage_path)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(RECORDS_NOTIFY_CHANNEL)
            .bind(created.id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            record_id = %created.id,
            user_id = %created.user_id,
            "Upload record created"
        );
        Ok(created)
    }

    /// Most recent records first
    pub async fn list_records(&self, limit: i64) -> Result<Vec<UploadRecord>, StoreError> {
        let records = sqlx::query_as::<_, UploadRecord>(
            r#"
            SELECT id, user_id, file_name, file_type, storage_path, created_at
            FROM upload_records
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Live record feed: LISTEN on [`RECORDS_NOTIFY_CHANNEL`] and re-query on
    /// every notification. The listener task ends when the feed is dropped.
    pub async fn watch_records(&self, limit: i64) -> Result<RecordFeed, StoreError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(RECORDS_NOTIFY_CHANNEL).await?;

        // Snapshot taken after LISTEN so no append can fall between the two.
        let initial = self.list_records(limit).await?;

        let (tx, rx) = mpsc::channel(16);
        let repository = self.clone();
        tokio::spawn(async move {
            if tx.send(Ok(initial)).await.is_err() {
                return;
            }

            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    notification = listener.recv() => {
                        let snapshot = match notification {
                            Ok(_) => repository.list_records(limit).await,
                            Err(e) => {
                                tracing::warn!(error = %e, "Record feed listener failed, will retry");
                                tokio::time::sleep(LISTENER_RETRY_DELAY).await;
                                Err(StoreError::Feed(e.to_string()))
                            }
                        };
                        if tx.send(snapshot).await.is_err() {
                            break;
                        }
                    }
                }
            }

            tracing::debug!("Record feed listener stopped");
        });

        Ok(feed_from_channel(rx))
    }
}

#[async_trait]
impl RecordStore for UploadRecordRepository {
    async fn append(&self, record: NewUploadRecord) -> Result<UploadRecord, StoreError> {
        self.create_record(record).await
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<UploadRecord>, StoreError> {
        self.list_records(limit).await
    }

    async fn watch_recent(&self, limit: i64) -> Result<RecordFeed, StoreError> {
        self.watch_records(limit).await
    }
}
