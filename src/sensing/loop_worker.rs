use std::{thread, time::Duration};

use anyhow::{Context, Result};

use super::sensor::MotionSensor;
use crate::activity_log::format::TIMESTAMP_FORMAT;
use crate::monitor::MonitorController;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Blocking sensor loop: one recorded event per motion-start edge. Only
/// returns when the sensor fails, which is fatal for the process.
pub fn sensing_loop<S: MotionSensor>(
    mut sensor: S,
    controller: MonitorController,
    settle: Duration,
) -> Result<()> {
    log_info!(
        "PIR watcher started, letting the sensor settle for {}s",
        settle.as_secs()
    );
    thread::sleep(settle);

    loop {
        sensor
            .wait_for_motion()
            .context("motion sensor failed while waiting for motion")?;
        let at = controller.record_motion();
        log_info!("motion detected at {}", at.format(TIMESTAMP_FORMAT));

        // Hold here until the sensor clears so one presence counts once.
        sensor
            .wait_for_no_motion()
            .context("motion sensor failed while waiting for it to clear")?;
        log_debug!("motion cleared");
    }
}
