fn main() {
    if let Err(err) = motion_monitor_lib::run() {
        log::error!("motion monitor stopped: {err:#}");
        std::process::exit(1);
    }
}
