//! Logging setup plus per-module switchable logging macros.
//!
//! Modules that want a local on/off switch define the flag first:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_info, log_warn};
//!
//! log_info!("flushed {} bins", 3);
//! ```

use log::LevelFilter;

/// Install `env_logger` for the process. `RUST_LOG` takes precedence over the
/// default `info` level.
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .try_init();
}

/// Info log gated on the calling module's `ENABLE_LOGS` const.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Debug log gated on the calling module's `ENABLE_LOGS` const.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Warn log gated on the calling module's `ENABLE_LOGS` const.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Errors are always emitted; failed writes must never disappear silently.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

#[cfg(test)]
mod tests {
    const ENABLE_LOGS: bool = false;

    #[test]
    fn macros_work_as_match_arms() {
        let outcomes: [Result<u32, &str>; 2] = [Ok(1), Err("disk full")];
        for outcome in outcomes {
            match outcome {
                Ok(n) => crate::log_info!("wrote {n}"),
                Err(err) => crate::log_error!("write failed: {err}"),
            }
            match outcome {
                Ok(n) => crate::log_debug!("wrote {n}"),
                Err(err) => crate::log_warn!("write failed: {err}"),
            }
        }
    }
}
