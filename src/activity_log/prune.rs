use chrono::{Duration, NaiveDateTime};

use super::format::parse_line;

/// Outcome of one retention pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneReport {
    pub removed: usize,
    pub kept: usize,
    pub cutoff: NaiveDateTime,
}

pub fn retention_cutoff(now: NaiveDateTime, retention_days: u32) -> NaiveDateTime {
    now - Duration::days(i64::from(retention_days))
}

/// Split raw `lines` into those that survive the cutoff and a count of the
/// dropped ones. Undated lines are headers and always survive, as do lines
/// that are not valid UTF-8; those are kept byte for byte.
pub fn retain_recent<'a>(lines: &[&'a [u8]], cutoff: NaiveDateTime) -> (Vec<&'a [u8]>, usize) {
    let mut kept = Vec::with_capacity(lines.len());
    let mut removed = 0;

    for &raw in lines {
        let timestamp = std::str::from_utf8(raw)
            .ok()
            .and_then(|line| parse_line(line).timestamp());
        match timestamp {
            Some(ts) if ts < cutoff => removed += 1,
            _ => kept.push(raw),
        }
    }

    (kept, removed)
}

/// Rate limit for pruning: one pass shortly after startup, then at most once
/// per `min_interval`.
#[derive(Debug, Clone)]
pub struct PruneSchedule {
    started_at: NaiveDateTime,
    startup_delay: Duration,
    min_interval: Duration,
    last_attempt: Option<NaiveDateTime>,
}

impl PruneSchedule {
    pub fn new(started_at: NaiveDateTime, startup_delay: Duration, min_interval: Duration) -> Self {
        Self {
            started_at,
            startup_delay,
            min_interval,
            last_attempt: None,
        }
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        match self.last_attempt {
            None => now >= self.started_at + self.startup_delay,
            Some(last) => now - last >= self.min_interval,
        }
    }

    /// Record a pass, successful or not. A failed pass waits for the next slot.
    pub fn mark_attempted(&mut self, now: NaiveDateTime) {
        self.last_attempt = Some(now);
    }

    pub fn last_attempt(&self) -> Option<NaiveDateTime> {
        self.last_attempt
    }
}
