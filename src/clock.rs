use std::sync::Mutex;

use chrono::{Duration, Local, NaiveDateTime};

use crate::utils::lock_or_recover;

/// Source of local wall-clock time. No timezone conversion happens anywhere in
/// the crate, so instants are plain `NaiveDateTime`s.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: NaiveDateTime) {
        *lock_or_recover(&self.now) = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = lock_or_recover(&self.now);
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *lock_or_recover(&self.now)
    }
}
