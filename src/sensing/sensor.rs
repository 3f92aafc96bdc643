use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use anyhow::{bail, Context, Result};

/// A PIR-style motion sensor. Both calls block until the edge is seen; there
/// is no timeout.
pub trait MotionSensor: Send {
    fn wait_for_motion(&mut self) -> Result<()>;
    fn wait_for_no_motion(&mut self) -> Result<()>;
}

/// Reads the sensor's digital output through a sysfs GPIO value file
/// (`/sys/class/gpio/gpioN/value`). `1` means motion.
#[derive(Debug, Clone)]
pub struct SysfsMotionSensor {
    value_path: PathBuf,
    poll_interval: Duration,
}

impl SysfsMotionSensor {
    pub fn new(value_path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            value_path: value_path.into(),
            poll_interval,
        }
    }

    pub fn value_path(&self) -> &Path {
        &self.value_path
    }

    fn read_level(&self) -> Result<bool> {
        let raw = fs::read_to_string(&self.value_path)
            .with_context(|| format!("failed to read GPIO value {}", self.value_path.display()))?;
        match raw.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => bail!(
                "unexpected GPIO value '{other}' in {}",
                self.value_path.display()
            ),
        }
    }

    fn wait_for_level(&self, level: bool) -> Result<()> {
        while self.read_level()? != level {
            thread::sleep(self.poll_interval);
        }
        Ok(())
    }
}

impl MotionSensor for SysfsMotionSensor {
    fn wait_for_motion(&mut self) -> Result<()> {
        self.wait_for_level(true)
    }

    fn wait_for_no_motion(&mut self) -> Result<()> {
        self.wait_for_level(false)
    }
}
