pub mod events;
pub mod window;

pub use events::EventHistory;
pub use window::{render_rows, RowLabel, WindowRow};
