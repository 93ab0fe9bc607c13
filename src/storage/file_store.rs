use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::calendar::Document;
use crate::storage::store::{DocumentStore, StoreError};

pub const DATA_FILE_NAME: &str = "tinymonth-data.json";

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn create_default(&self) -> Result<Document, StoreError> {
        let document = Document::default();
        tracing::info!("No data file at {}, creating default document", self.path.display());
        self.write(&document).await?;
        Ok(document)
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn read(&self) -> Result<Document, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let document = Document::from_json(&content)?;
                tracing::debug!(
                    "Read {} calendars and {} assigned dates from {}",
                    document.calendars.len(),
                    document.assignments.len(),
                    self.path.display()
                );
                Ok(document)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => self.create_default().await,
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, document: &Document) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = document.to_json()?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Calendar;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn store_in(temp_dir: &TempDir) -> FileStore {
        FileStore::new(temp_dir.path().join("data").join(DATA_FILE_NAME))
    }

    #[tokio::test]
    async fn read_creates_default_document_when_missing() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        let document = store.read().await.unwrap();

        assert_eq!(document, Document::default());
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn default_file_has_documented_shape() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        store.read().await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["calendars"], serde_json::json!([]));
        assert_eq!(json["assignments"], serde_json::json!({}));
        assert_eq!(json["activeId"], serde_json::Value::Null);
        assert_eq!(json["version"], 1);
    }

    #[tokio::test]
    async fn write_then_read_returns_same_document() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut document = Document::default();
        document.calendars.push(Calendar::new("Lanzarote", "#ff9900"));
        document.assignments.insert(date, vec!["lanzarote".to_string()]);
        document.active_id = Some("lanzarote".to_string());

        store.write(&document).await.unwrap();
        let loaded = store.read().await.unwrap();

        assert_eq!(loaded, document);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();

        let result = store.read().await;

        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
