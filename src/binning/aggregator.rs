use std::collections::{BTreeMap, VecDeque};
use std::ops::Range;

use chrono::{NaiveDate, NaiveDateTime};

use super::indexer::{BinId, BinWidth};

/// A bin whose interval has closed, with its final count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishedBin {
    pub bin: BinId,
    pub count: u32,
}

/// Counts and flush progress for one calendar day.
#[derive(Debug, Clone)]
struct DayTable {
    day: NaiveDate,
    counts: BTreeMap<u32, u32>,
    /// Last bin index written to the log; `None` until the first one is.
    cursor: Option<u32>,
}

impl DayTable {
    fn new(day: NaiveDate, cursor: Option<u32>) -> Self {
        Self {
            day,
            counts: BTreeMap::new(),
            cursor,
        }
    }

    fn next_unflushed(&self) -> u32 {
        self.cursor.map_or(0, |c| c + 1)
    }

    fn count(&self, index: u32) -> u32 {
        self.counts.get(&index).copied().unwrap_or(0)
    }

    fn finished(&self, range: Range<u32>) -> impl Iterator<Item = FinishedBin> + '_ {
        range.map(move |index| FinishedBin {
            bin: BinId {
                day: self.day,
                index,
            },
            count: self.count(index),
        })
    }

    fn advance(&mut self, index: u32) {
        if self.cursor.map_or(true, |c| index > c) {
            self.cursor = Some(index);
        }
    }
}

/// Per-day motion counts plus how far they have been written out.
///
/// When the day changes the old table is parked in `closed` until every one of
/// its bins has been committed, so a failed write at midnight never loses the
/// tail of the previous day.
#[derive(Debug, Clone)]
pub struct EventAggregator {
    width: BinWidth,
    active: DayTable,
    closed: VecDeque<DayTable>,
}

impl EventAggregator {
    pub fn new(width: BinWidth, now: NaiveDateTime) -> Self {
        Self::resume(width, now, None)
    }

    /// Start with the flush cursor already at `cursor`, e.g. recovered from the
    /// log after a restart.
    pub fn resume(width: BinWidth, now: NaiveDateTime, cursor: Option<u32>) -> Self {
        Self {
            width,
            active: DayTable::new(now.date(), cursor),
            closed: VecDeque::new(),
        }
    }

    pub fn width(&self) -> BinWidth {
        self.width
    }

    pub fn active_day(&self) -> NaiveDate {
        self.active.day
    }

    pub fn flush_cursor(&self) -> Option<u32> {
        self.active.cursor
    }

    pub fn count(&self, bin: BinId) -> u32 {
        if bin.day == self.active.day {
            return self.active.count(bin.index);
        }
        self.closed
            .iter()
            .find(|table| table.day == bin.day)
            .map_or(0, |table| table.count(bin.index))
    }

    /// Move to `now`'s day if it is later than the active one. Returns whether
    /// the active day changed.
    pub fn roll_if_needed(&mut self, now: NaiveDateTime) -> bool {
        let today = now.date();
        if today <= self.active.day {
            return false;
        }

        let previous = std::mem::replace(&mut self.active, DayTable::new(today, None));
        if previous.cursor != Some(self.width.last_index()) {
            self.closed.push_back(previous);
        }
        true
    }

    /// Count one motion event. Events dated before the active day cannot be
    /// binned any more and are rejected.
    pub fn record(&mut self, instant: NaiveDateTime) -> Option<BinId> {
        self.roll_if_needed(instant);
        if instant.date() != self.active.day {
            return None;
        }

        let bin = self.width.index_of(instant);
        *self.active.counts.entry(bin.index).or_insert(0) += 1;
        Some(bin)
    }

    /// Bin indices of the active day that have closed by `now` and were not yet
    /// written. The bin containing `now` is still open and never included.
    pub fn peek_finished_bins(&self, now: NaiveDateTime) -> Range<u32> {
        let start = self.active.next_unflushed();
        let end = match now.date().cmp(&self.active.day) {
            std::cmp::Ordering::Less => start,
            std::cmp::Ordering::Equal => self.width.index_of_time(now.time()),
            std::cmp::Ordering::Greater => self.width.bins_per_day(),
        };
        start..end.max(start)
    }

    /// Counts for `range` on the active day. Silent bins come back as zero.
    pub fn take_finished_counts(&self, range: Range<u32>) -> Vec<FinishedBin> {
        self.active.finished(range).collect()
    }

    /// Everything that is due for the log at `now`, oldest first: leftover bins
    /// of closed days, then the finished bins of the active day.
    pub fn finished_bins(&self, now: NaiveDateTime) -> Vec<FinishedBin> {
        let last = self.width.bins_per_day();
        let mut due: Vec<FinishedBin> = self
            .closed
            .iter()
            .flat_map(|table| table.finished(table.next_unflushed()..last))
            .collect();
        due.extend(self.take_finished_counts(self.peek_finished_bins(now)));
        due
    }

    /// Mark `bin` as written. Closed days are dropped once fully written.
    pub fn commit(&mut self, bin: BinId) {
        if bin.day == self.active.day {
            self.active.advance(bin.index);
            return;
        }

        let last = self.width.last_index();
        if let Some(table) = self.closed.iter_mut().find(|t| t.day == bin.day) {
            table.advance(bin.index);
        }
        self.closed.retain(|table| table.cursor != Some(last));
    }
}
