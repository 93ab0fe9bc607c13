use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::calendar::Document;
use crate::storage::{DocumentStore, StoreError};

/// Fire-and-forget writer in front of a [`DocumentStore`].
///
/// Each call to [`SyncEngine::persist`] spawns an independent write of a full
/// document snapshot. Writes are never awaited by the caller, never retried and
/// never cancelled: dropping the engine detaches pending writes instead of
/// aborting them. Spawned writes take turns on the store, and a snapshot older
/// than one already stored is dropped. Failures are logged and counted.
pub struct SyncEngine {
    store: Arc<dyn DocumentStore>,
    in_flight: Vec<JoinHandle<()>>,
    issued: u64,
    last_stored: Arc<Mutex<u64>>,
    failures: Arc<AtomicUsize>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            in_flight: Vec::new(),
            issued: 0,
            last_stored: Arc::new(Mutex::new(0)),
            failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn fetch(&self) -> Result<Document, StoreError> {
        self.store.read().await
    }

    pub fn persist(&mut self, document: Document) {
        self.in_flight.retain(|handle| !handle.is_finished());

        self.issued += 1;
        let write_id = self.issued;
        let store = Arc::clone(&self.store);
        let last_stored = Arc::clone(&self.last_stored);
        let failures = Arc::clone(&self.failures);

        self.in_flight.push(tokio::spawn(async move {
            let mut last_stored = last_stored.lock().await;
            if *last_stored > write_id {
                tracing::debug!("Skipping write #{}, #{} already stored", write_id, *last_stored);
                return;
            }

            match store.write(&document).await {
                Ok(()) => {
                    *last_stored = write_id;
                    tracing::debug!("Write #{} to {} completed", write_id, store.describe());
                }
                Err(e) => {
                    failures.fetch_add(1, Ordering::Relaxed);
                    tracing::error!("Write #{} to {} failed: {}", write_id, store.describe(), e);
                }
            }
        }));
    }

    /// Waits for every write issued so far.
    pub async fn settle(&mut self) {
        for handle in std::mem::take(&mut self.in_flight) {
            if let Err(e) = handle.await {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!("Write task aborted: {}", e);
            }
        }
    }

    pub fn writes_issued(&self) -> u64 {
        self.issued
    }

    pub fn failed_writes(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }
}
