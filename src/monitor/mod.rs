pub mod controller;
pub mod ticker;

pub use controller::{MonitorController, MonitorOptions};
pub use ticker::{run_tick, ticker_loop};
