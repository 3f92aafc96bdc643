use std::collections::VecDeque;

use chrono::{Duration, NaiveDateTime};

/// Recent motion instants in arrival order, trimmed to a fixed window.
#[derive(Debug, Clone)]
pub struct EventHistory {
    window: Duration,
    events: VecDeque<NaiveDateTime>,
}

impl EventHistory {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            events: VecDeque::new(),
        }
    }

    pub fn push(&mut self, instant: NaiveDateTime) {
        self.events.push_back(instant);
        self.prune(instant);
    }

    /// Drop everything older than the window before `now`.
    pub fn prune(&mut self, now: NaiveDateTime) {
        let oldest_allowed = now - self.window;
        while self
            .events
            .front()
            .is_some_and(|&front| front < oldest_allowed)
        {
            self.events.pop_front();
        }
    }

    pub fn last(&self) -> Option<NaiveDateTime> {
        self.events.back().copied()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn snapshot(&self) -> Vec<NaiveDateTime> {
        self.events.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn push_trims_entries_outside_window() {
        let mut history = EventHistory::new(Duration::hours(48));
        history.push(at(1, 0));
        history.push(at(2, 12));
        assert_eq!(history.len(), 2);

        history.push(at(3, 1));
        assert_eq!(history.snapshot(), vec![at(2, 12), at(3, 1)]);
        assert_eq!(history.last(), Some(at(3, 1)));
    }

    #[test]
    fn boundary_entry_survives() {
        let mut history = EventHistory::new(Duration::hours(48));
        history.push(at(1, 0));
        history.push(at(3, 0));
        assert_eq!(history.len(), 2);

        history.prune(at(3, 1));
        assert_eq!(history.snapshot(), vec![at(3, 0)]);
    }

    #[test]
    fn empty_history_has_no_last() {
        let history = EventHistory::new(Duration::hours(1));
        assert!(history.is_empty());
        assert_eq!(history.last(), None);
    }
}
