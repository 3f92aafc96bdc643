use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;

use super::aggregator::EventAggregator;
use crate::activity_log::{bin_summary_line, LineSink, SinkError};
use crate::utils::lock_or_recover;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Writes finished bins from the aggregator to the activity log, each exactly
/// once and in order.
///
/// A pass plans under the aggregator lock, writes with the lock released, and
/// commits each bin only after its line was appended. A failed append stops
/// the pass; the same bin is retried on the next one.
pub struct BinLogFlusher {
    aggregator: Arc<Mutex<EventAggregator>>,
    sink: Arc<dyn LineSink>,
    // Serializes whole passes so the tick and the event trigger cannot both
    // write the same planned bin.
    pass: Mutex<()>,
}

impl BinLogFlusher {
    pub fn new(aggregator: Arc<Mutex<EventAggregator>>, sink: Arc<dyn LineSink>) -> Self {
        Self {
            aggregator,
            sink,
            pass: Mutex::new(()),
        }
    }

    /// One reconciliation pass at `now`. Returns the number of lines written.
    /// Append failures are returned, not logged; the caller reports them.
    pub fn reconcile(&self, now: NaiveDateTime) -> Result<usize, SinkError> {
        let _pass = lock_or_recover(&self.pass);

        let (width, due) = {
            let mut aggregator = lock_or_recover(&self.aggregator);
            aggregator.roll_if_needed(now);
            (aggregator.width(), aggregator.finished_bins(now))
        };

        let mut written = 0;
        for finished in due {
            let line = bin_summary_line(width, finished.bin, finished.count);
            self.sink.append(&line)?;
            lock_or_recover(&self.aggregator).commit(finished.bin);
            written += 1;
        }

        if written > 0 {
            log_debug!("flushed {} bins at {}", written, now);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity_log::parse_line;
    use crate::binning::BinWidth;
    use chrono::{Duration, NaiveDate};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[derive(Default)]
    struct MemorySink {
        lines: Mutex<Vec<String>>,
        failing: AtomicBool,
        slow: AtomicBool,
    }

    impl MemorySink {
        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl LineSink for MemorySink {
        fn append(&self, line: &str) -> Result<(), SinkError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(SinkError::Append {
                    path: "memory".into(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            if self.slow.load(Ordering::SeqCst) {
                thread::sleep(std::time::Duration::from_micros(50));
            }
            self.lines.lock().unwrap().push(line.to_string());
            Ok(())
        }
    }

    fn at(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn setup(
        width: u32,
        start: NaiveDateTime,
        cursor: Option<u32>,
    ) -> (Arc<Mutex<EventAggregator>>, Arc<MemorySink>, BinLogFlusher) {
        let width = BinWidth::new(width).unwrap();
        let aggregator = Arc::new(Mutex::new(EventAggregator::resume(width, start, cursor)));
        let sink = Arc::new(MemorySink::default());
        let flusher = BinLogFlusher::new(aggregator.clone(), sink.clone());
        (aggregator, sink, flusher)
    }

    fn summed_counts(lines: &[String]) -> u32 {
        lines
            .iter()
            .filter_map(|line| {
                let rest = line.split("Detected ").nth(1)?;
                rest.split_whitespace().next()?.parse::<u32>().ok()
            })
            .sum()
    }

    #[test]
    fn bin_is_written_once_after_it_closes() {
        let (aggregator, sink, flusher) = setup(5, at(10, 10, 0, 0), Some(119));
        aggregator.lock().unwrap().record(at(10, 10, 2, 0));
        aggregator.lock().unwrap().record(at(10, 10, 2, 30));

        assert_eq!(flusher.reconcile(at(10, 10, 4, 0)).unwrap(), 0);
        assert!(sink.lines().is_empty());

        assert_eq!(flusher.reconcile(at(10, 10, 6, 0)).unwrap(), 1);
        assert_eq!(
            sink.lines(),
            vec!["2024-05-10 10:00 - 10:05: Detected  2 motion events.".to_string()]
        );
    }

    #[test]
    fn second_pass_with_same_now_writes_nothing() {
        let (aggregator, sink, flusher) = setup(5, at(10, 8, 0, 0), None);
        aggregator.lock().unwrap().record(at(10, 8, 1, 0));

        let first = flusher.reconcile(at(10, 9, 0, 0)).unwrap();
        assert_eq!(first, 108);
        assert_eq!(flusher.reconcile(at(10, 9, 0, 0)).unwrap(), 0);
        assert_eq!(sink.lines().len(), 108);
    }

    #[test]
    fn idle_day_logs_every_bin_with_zero() {
        let (_aggregator, sink, flusher) = setup(60, at(10, 0, 0, 0), None);

        for hour in 0..24 {
            flusher.reconcile(at(10, hour, 30, 0)).unwrap();
        }
        flusher.reconcile(at(11, 0, 0, 5)).unwrap();

        let lines = sink.lines();
        assert_eq!(lines.len(), 24);
        assert!(lines.iter().all(|l| l.ends_with("Detected  0 motion events.")));
        assert!(lines[0].starts_with("2024-05-10 00:00 - 01:00"));
        assert!(lines[23].starts_with("2024-05-10 23:00 - 00:00"));
    }

    #[test]
    fn every_bin_flushed_once_in_order_and_counts_conserved() {
        let (aggregator, sink, flusher) = setup(15, at(10, 0, 0, 0), None);
        let mut now = at(10, 0, 0, 0);
        let mut recorded = 0;

        // An event every 7 minutes and a pass every minute, across the whole day.
        while now < at(11, 0, 0, 0) {
            if (now - at(10, 0, 0, 0)).num_minutes() % 7 == 0 {
                aggregator.lock().unwrap().record(now);
                recorded += 1;
            }
            flusher.reconcile(now).unwrap();
            now += Duration::minutes(1);
        }
        flusher.reconcile(at(11, 0, 0, 1)).unwrap();

        let lines = sink.lines();
        assert_eq!(lines.len(), 96);
        assert_eq!(summed_counts(&lines), recorded);

        let starts: Vec<NaiveDateTime> = lines
            .iter()
            .map(|l| parse_line(l).timestamp().unwrap())
            .collect();
        assert!(starts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn rollover_flushes_rest_of_old_day_before_new_day() {
        let (aggregator, sink, flusher) = setup(5, at(10, 23, 40, 0), Some(283));
        aggregator.lock().unwrap().record(at(10, 23, 57, 0));
        aggregator.lock().unwrap().record(at(11, 0, 2, 0));

        flusher.reconcile(at(11, 0, 11, 0)).unwrap();

        let lines = sink.lines();
        assert_eq!(
            lines,
            vec![
                "2024-05-10 23:40 - 23:45: Detected  0 motion events.".to_string(),
                "2024-05-10 23:45 - 23:50: Detected  0 motion events.".to_string(),
                "2024-05-10 23:50 - 23:55: Detected  0 motion events.".to_string(),
                "2024-05-10 23:55 - 00:00: Detected  1 motion events.".to_string(),
                "2024-05-11 00:00 - 00:05: Detected  1 motion events.".to_string(),
                "2024-05-11 00:05 - 00:10: Detected  0 motion events.".to_string(),
            ]
        );
        assert_eq!(aggregator.lock().unwrap().flush_cursor(), Some(1));
    }

    #[test]
    fn failed_append_retries_same_bin_next_pass() {
        let (aggregator, sink, flusher) = setup(5, at(10, 10, 0, 0), Some(119));
        aggregator.lock().unwrap().record(at(10, 10, 1, 0));

        sink.failing.store(true, Ordering::SeqCst);
        assert!(matches!(
            flusher.reconcile(at(10, 10, 11, 0)),
            Err(SinkError::Append { .. })
        ));
        assert_eq!(aggregator.lock().unwrap().flush_cursor(), Some(119));

        sink.failing.store(false, Ordering::SeqCst);
        assert_eq!(flusher.reconcile(at(10, 10, 11, 0)).unwrap(), 2);
        assert_eq!(
            sink.lines(),
            vec![
                "2024-05-10 10:00 - 10:05: Detected  1 motion events.".to_string(),
                "2024-05-10 10:05 - 10:10: Detected  0 motion events.".to_string(),
            ]
        );
    }

    #[test]
    fn failure_across_midnight_keeps_old_day_counts() {
        let (aggregator, sink, flusher) = setup(5, at(10, 23, 50, 0), Some(285));
        aggregator.lock().unwrap().record(at(10, 23, 56, 0));

        sink.failing.store(true, Ordering::SeqCst);
        assert!(flusher.reconcile(at(11, 0, 1, 0)).is_err());

        sink.failing.store(false, Ordering::SeqCst);
        aggregator.lock().unwrap().record(at(11, 0, 3, 0));
        flusher.reconcile(at(11, 0, 6, 0)).unwrap();

        assert_eq!(
            sink.lines(),
            vec![
                "2024-05-10 23:50 - 23:55: Detected  0 motion events.".to_string(),
                "2024-05-10 23:55 - 00:00: Detected  1 motion events.".to_string(),
                "2024-05-11 00:00 - 00:05: Detected  1 motion events.".to_string(),
            ]
        );
    }

    #[test]
    fn concurrent_passes_write_each_bin_once() {
        let (aggregator, sink, flusher) = setup(1, at(10, 0, 0, 0), None);
        sink.slow.store(true, Ordering::SeqCst);
        let flusher = Arc::new(flusher);

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let flusher = Arc::clone(&flusher);
                let aggregator = Arc::clone(&aggregator);
                thread::spawn(move || {
                    for minute in 0..=360 {
                        let now = at(10, 0, 0, worker) + Duration::minutes(minute);
                        if minute % 3 == 0 {
                            aggregator.lock().unwrap().record(now);
                        }
                        flusher.reconcile(now).unwrap();
                    }
                })
            })
            .collect();
        for handle in workers {
            handle.join().unwrap();
        }

        let lines = sink.lines();
        let unique: HashSet<&String> = lines.iter().collect();
        assert_eq!(lines.len(), 360);
        assert_eq!(unique.len(), 360);

        let starts: Vec<NaiveDateTime> = lines
            .iter()
            .map(|l| parse_line(l).timestamp().unwrap())
            .collect();
        assert!(starts.windows(2).all(|w| w[0] < w[1]));
    }
}
