pub mod drag_select;

pub use drag_select::{DragSelector, DragState};
