pub mod remote_store;
pub mod server;
pub mod sync_engine;

pub use remote_store::RemoteStore;
pub use sync_engine::SyncEngine;
