use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::binning::{BinWidth, InvalidBinWidth};

pub const CONFIG_ENV_VAR: &str = "MOTION_MONITOR_CONFIG";

const MAX_RETENTION_DAYS: u64 = 36_500;
/// The status page shows a full day, so less history than that would blank
/// part of it.
const MIN_MEMORY_WINDOW_HOURS: u64 = 24;
const MAX_MEMORY_WINDOW_HOURS: u64 = 24 * 366;
const MAX_PRUNE_STARTUP_DELAY_SECONDS: u64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    BinWidth(#[from] InvalidBinWidth),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("{name} is {value}, expected {min}..={max}")]
    OutOfRange {
        name: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
    #[error("invalid listen address '{0}'")]
    ListenAddr(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkSettings {
    /// `host:port` on the local network, e.g. the router's web UI.
    pub lan_target: String,
    /// `host:port` on the internet, e.g. a public DNS resolver.
    pub internet_target: String,
    pub check_interval_seconds: u64,
    pub timeout_millis: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            lan_target: "192.168.1.1:80".into(),
            internet_target: "1.1.1.1:53".into(),
            check_interval_seconds: 30,
            timeout_millis: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorSettings {
    pub bin_width_minutes: u32,
    pub retention_days: u32,
    pub memory_window_hours: u32,
    pub flush_interval_seconds: u64,
    pub prune_min_interval_hours: u32,
    pub prune_startup_delay_seconds: u64,
    pub log_path: PathBuf,
    pub listen_addr: String,
    pub gpio_pin: u32,
    pub sensor_value_path: Option<PathBuf>,
    pub sensor_poll_millis: u64,
    pub sensor_settle_seconds: u64,
    pub refresh_seconds: u32,
    pub network: Option<NetworkSettings>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            bin_width_minutes: 5,
            retention_days: 90,
            memory_window_hours: 48,
            flush_interval_seconds: 2,
            prune_min_interval_hours: 12,
            prune_startup_delay_seconds: 10,
            log_path: PathBuf::from("motion_log.txt"),
            listen_addr: "0.0.0.0:8080".into(),
            gpio_pin: 17,
            sensor_value_path: None,
            sensor_poll_millis: 50,
            sensor_settle_seconds: 2,
            refresh_seconds: 5,
            network: None,
        }
    }
}

impl MonitorSettings {
    /// Read settings from `path`; missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Settings file named by the first CLI argument, else by
    /// `MOTION_MONITOR_CONFIG`, else built-in defaults.
    pub fn from_args_or_env() -> Result<Self, ConfigError> {
        let path = std::env::args_os()
            .nth(1)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR))
            .map(PathBuf::from);

        match path {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(self) -> Result<ValidatedSettings, ConfigError> {
        let bin_width = BinWidth::new(self.bin_width_minutes)?;

        let positive = [
            ("flushIntervalSeconds", self.flush_interval_seconds),
            ("pruneMinIntervalHours", u64::from(self.prune_min_interval_hours)),
            ("sensorPollMillis", self.sensor_poll_millis),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }

        let bounded = [
            ("retentionDays", u64::from(self.retention_days), 0, MAX_RETENTION_DAYS),
            (
                "memoryWindowHours",
                u64::from(self.memory_window_hours),
                MIN_MEMORY_WINDOW_HOURS,
                MAX_MEMORY_WINDOW_HOURS,
            ),
            (
                "pruneStartupDelaySeconds",
                self.prune_startup_delay_seconds,
                0,
                MAX_PRUNE_STARTUP_DELAY_SECONDS,
            ),
        ];
        for (name, value, min, max) in bounded {
            if !(min..=max).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    name,
                    value,
                    min,
                    max,
                });
            }
        }

        if let Some(network) = &self.network {
            if network.check_interval_seconds == 0 {
                return Err(ConfigError::Zero("network.checkIntervalSeconds"));
            }
            if network.timeout_millis == 0 {
                return Err(ConfigError::Zero("network.timeoutMillis"));
            }
        }

        let listen_addr: SocketAddr = self
            .listen_addr
            .parse()
            .map_err(|_| ConfigError::ListenAddr(self.listen_addr.clone()))?;

        Ok(ValidatedSettings {
            bin_width,
            listen_addr,
            raw: self,
        })
    }
}

/// Settings that passed validation, with the derived typed values.
#[derive(Debug, Clone)]
pub struct ValidatedSettings {
    pub bin_width: BinWidth,
    pub listen_addr: SocketAddr,
    pub raw: MonitorSettings,
}

impl ValidatedSettings {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.raw.flush_interval_seconds)
    }

    pub fn memory_window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.raw.memory_window_hours))
    }

    pub fn prune_min_interval(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.raw.prune_min_interval_hours))
    }

    pub fn prune_startup_delay(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.raw.prune_startup_delay_seconds as i64)
    }

    pub fn sensor_value_path(&self) -> PathBuf {
        self.raw
            .sensor_value_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("/sys/class/gpio/gpio{}/value", self.raw.gpio_pin)))
    }
}
