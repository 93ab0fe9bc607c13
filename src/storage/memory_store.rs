use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::calendar::Document;
use crate::storage::store::{DocumentStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    document: RwLock<Option<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: Document) -> Self {
        Self {
            document: RwLock::new(Some(document)),
        }
    }

    pub async fn snapshot(&self) -> Option<Document> {
        self.document.read().await.clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self) -> Result<Document, StoreError> {
        let mut guard = self.document.write().await;
        Ok(guard.get_or_insert_with(Document::default).clone())
    }

    async fn write(&self, document: &Document) -> Result<(), StoreError> {
        *self.document.write().await = Some(document.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Calendar;

    #[tokio::test]
    async fn read_initializes_default_document() {
        let store = MemoryStore::new();
        assert!(store.snapshot().await.is_none());

        let document = store.read().await.unwrap();

        assert_eq!(document, Document::default());
        assert_eq!(store.snapshot().await, Some(Document::default()));
    }

    #[tokio::test]
    async fn write_replaces_whole_document() {
        let mut first = Document::default();
        first.calendars.push(Calendar::new("Work", "#000000"));
        let store = MemoryStore::with_document(first);

        store.write(&Document::default()).await.unwrap();

        assert!(store.read().await.unwrap().calendars.is_empty());
    }
}
