use std::collections::BTreeMap;
use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::activity_log::format::DATE_FORMAT;
use crate::binning::BinWidth;

const WINDOW_HOURS: i64 = 24;

/// Which day a row's count belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowLabel {
    Date(NaiveDate),
    /// The slot's time of day has not come around since startup.
    Unknown,
}

impl fmt::Display for RowLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowLabel::Date(day) => write!(f, "{}", day.format(DATE_FORMAT)),
            RowLabel::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowRow {
    pub index: u32,
    pub label: RowLabel,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub count: u32,
}

/// Last-24-hours activity, one row per time-of-day bin from midnight on.
///
/// Each row shows the most recent day that bin saw motion inside the window.
/// Silent bins show zero for the most recent day the slot occurred while the
/// monitor was running.
pub fn render_rows(
    now: NaiveDateTime,
    events: &[NaiveDateTime],
    width: BinWidth,
    started_at: NaiveDateTime,
) -> Vec<WindowRow> {
    let since = now - Duration::hours(WINDOW_HOURS);

    // (index, day) ordered so the latest day of each index is visited last.
    let mut groups: BTreeMap<(u32, NaiveDate), u32> = BTreeMap::new();
    for &event in events.iter().filter(|&&e| e > since && e <= now) {
        let bin = width.index_of(event);
        *groups.entry((bin.index, bin.day)).or_insert(0) += 1;
    }

    let mut latest: BTreeMap<u32, (NaiveDate, u32)> = BTreeMap::new();
    for ((index, day), count) in groups {
        latest.insert(index, (day, count));
    }

    (0..width.bins_per_day())
        .map(|index| {
            let start = width.slot_start(index);
            let (label, count) = match latest.get(&index) {
                Some(&(day, count)) => (RowLabel::Date(day), count),
                None => (last_occurrence(index, now, width, started_at), 0),
            };
            WindowRow {
                index,
                label,
                start,
                end: start + width.duration(),
                count,
            }
        })
        .collect()
}

fn last_occurrence(
    index: u32,
    now: NaiveDateTime,
    width: BinWidth,
    started_at: NaiveDateTime,
) -> RowLabel {
    let slot = width.slot_start(index);
    let day = if slot <= now.time() {
        now.date()
    } else {
        now.date() - Duration::days(1)
    };

    if day.and_time(slot) + width.duration() > started_at {
        RowLabel::Date(day)
    } else {
        RowLabel::Unknown
    }
}
