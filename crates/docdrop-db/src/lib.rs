//! Metadata store for upload records
//!
//! `UploadRecordRepository` persists records in PostgreSQL and serves the live
//! record feed through LISTEN/NOTIFY. `InMemoryRecordStore` keeps records in
//! process memory for deployments without a database and for tests. Both
//! implement [`docdrop_core::RecordStore`].

pub mod memory;
pub mod pool;
pub mod records;

pub use memory::InMemoryRecordStore;
pub use pool::{run_migrations, setup_database, MIGRATOR};
pub use records::{UploadRecordRepository, RECORDS_NOTIFY_CHANNEL};

use docdrop_core::{RecordFeed, StoreError};
use futures::StreamExt;
use tokio::sync::mpsc;

/// Adapt a snapshot channel into a [`RecordFeed`]. Dropping the feed drops
/// the receiver, which lets the producing task observe `closed()` and stop.
pub(crate) fn feed_from_channel(
    receiver: mpsc::Receiver<Result<Vec<docdrop_core::UploadRecord>, StoreError>>,
) -> RecordFeed {
    futures::stream::unfold(receiver, |mut receiver| async move {
        receiver.recv().await.map(|item| (item, receiver))
    })
    .boxed()
}
