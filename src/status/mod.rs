pub mod page;
pub mod server;

pub use page::{render_page, StatusView};
pub use server::{build_router, serve, StatusState};
