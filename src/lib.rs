pub mod app;
pub mod calendar;
pub mod input;
pub mod storage;
pub mod sync;

pub use app::{AppError, AppState, Lifecycle};
pub use calendar::{Calendar, Document, Holiday};
pub use input::DragSelector;
