pub mod monitor;

pub use monitor::{check_once, network_loop, probe, NetworkStatus};
