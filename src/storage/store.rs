use async_trait::async_trait;
use thiserror::Error;

use crate::calendar::Document;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid document: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote store responded with status {status}: {body}")]
    Remote { status: u16, body: String },
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Whole-document persistence.
///
/// `read` never reports a missing document: it creates, persists and returns
/// `Document::default()` instead. `write` always replaces the full document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read(&self) -> Result<Document, StoreError>;

    async fn write(&self, document: &Document) -> Result<(), StoreError>;

    fn describe(&self) -> String;
}
