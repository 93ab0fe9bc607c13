pub mod config;
pub mod csv_import;
pub mod file_store;
pub mod memory_store;
pub mod sqlite_store;
pub mod store;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use sqlite_store::SqliteStore;
pub use store::{DocumentStore, StoreError};
