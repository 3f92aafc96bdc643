use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("bin width must be between 1 and 1440 minutes and divide 1440 evenly, got {0}")]
pub struct InvalidBinWidth(pub u32);

/// Width of one time-of-day bucket, in minutes. Always divides a day evenly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinWidth(u32);

impl BinWidth {
    pub fn new(minutes: u32) -> Result<Self, InvalidBinWidth> {
        if minutes == 0 || minutes > MINUTES_PER_DAY || MINUTES_PER_DAY % minutes != 0 {
            return Err(InvalidBinWidth(minutes));
        }
        Ok(Self(minutes))
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    pub fn duration(self) -> Duration {
        Duration::minutes(i64::from(self.0))
    }

    pub fn bins_per_day(self) -> u32 {
        MINUTES_PER_DAY / self.0
    }

    pub fn last_index(self) -> u32 {
        self.bins_per_day() - 1
    }

    /// Bin-of-day index for a time of day. Seconds are ignored.
    pub fn index_of_time(self, time: NaiveTime) -> u32 {
        (time.hour() * 60 + time.minute()) / self.0
    }

    pub fn index_of(self, instant: NaiveDateTime) -> BinId {
        BinId {
            day: instant.date(),
            index: self.index_of_time(instant.time()),
        }
    }

    /// Time of day at which bin `index` opens.
    pub fn slot_start(self, index: u32) -> NaiveTime {
        NaiveTime::MIN + Duration::minutes(i64::from(index * self.0))
    }

    /// Half-open wall-clock interval covered by `bin`. The end of the last bin
    /// of a day is midnight of the next day.
    pub fn bounds(self, bin: BinId) -> (NaiveDateTime, NaiveDateTime) {
        let start = bin.day.and_time(self.slot_start(bin.index));
        (start, start + self.duration())
    }
}

impl Default for BinWidth {
    fn default() -> Self {
        Self(5)
    }
}

/// One bin on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BinId {
    pub day: NaiveDate,
    pub index: u32,
}
