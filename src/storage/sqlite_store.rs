use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};

use crate::calendar::Document;
use crate::storage::store::{DocumentStore, StoreError};

const DOCUMENT_ROW: i64 = 1;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::new(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::new(Connection::open_in_memory()?)
    }

    fn initialize(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS document (
                id INTEGER PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn store_document(conn: &Connection, document: &Document) -> Result<(), StoreError> {
        let data = serde_json::to_string(document)?;
        conn.execute(
            "INSERT OR REPLACE INTO document (id, data, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![DOCUMENT_ROW, &data, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn load_document(conn: &Connection) -> Result<Option<Document>, StoreError> {
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM document WHERE id = ?1",
                [DOCUMENT_ROW],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(data) => Ok(Some(Document::from_json(&data)?)),
            None => Ok(None),
        }
    }

    #[cfg(test)]
    fn table_exists(&self, table_name: &str) -> bool {
        let Ok(conn) = self.conn.lock() else {
            return false;
        };
        let result: rusqlite::Result<i32> = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [table_name],
            |row| row.get(0),
        );
        result.unwrap_or(0) > 0
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn read(&self) -> Result<Document, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        match Self::load_document(&conn)? {
            Some(document) => Ok(document),
            None => {
                tracing::info!("No document row in sqlite store, creating default document");
                let document = Document::default();
                Self::store_document(&conn, &document)?;
                Ok(document)
            }
        }
    }

    async fn write(&self, document: &Document) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        Self::store_document(&conn, document)
    }

    fn describe(&self) -> String {
        "sqlite".to_string()
    }
}
