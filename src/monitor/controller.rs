use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDateTime};

use crate::{
    activity_log::{
        annotation_line, header_line, last_logged_bin, FileLogSink, LineSink, PruneReport,
        SinkError,
    },
    binning::{BinLogFlusher, BinWidth, EventAggregator},
    clock::Clock,
    history::{render_rows, EventHistory, WindowRow},
    utils::lock_or_recover,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy)]
pub struct MonitorOptions {
    pub bin_width: BinWidth,
    pub memory_window: Duration,
    pub retention_days: u32,
}

/// Shared handle to the monitor's state. Cloning is cheap; every clone sees the
/// same aggregator, history and log file.
#[derive(Clone)]
pub struct MonitorController {
    aggregator: Arc<Mutex<EventAggregator>>,
    history: Arc<Mutex<EventHistory>>,
    flusher: Arc<BinLogFlusher>,
    sink: Arc<FileLogSink>,
    clock: Arc<dyn Clock>,
    options: MonitorOptions,
    started_at: NaiveDateTime,
}

impl MonitorController {
    /// Open the activity log and pick up where a previous run left off today.
    pub fn start(
        options: MonitorOptions,
        sink: Arc<FileLogSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SinkError> {
        let started_at = clock.now();

        if sink.ensure_header(&header_line(options.bin_width))? {
            log_info!("created activity log at {}", sink.path().display());
        }

        let lines = sink.read_lines()?;
        let cursor = last_logged_bin(
            lines.iter().map(String::as_str),
            started_at.date(),
            options.bin_width,
        );
        if let Some(index) = cursor {
            log_info!("resuming after bin #{} of {}", index, started_at.date());
        }

        sink.append(&annotation_line(
            started_at,
            "START",
            &format!(
                "motion monitor started (bin width {} min)",
                options.bin_width.minutes()
            ),
        ))?;

        let aggregator = Arc::new(Mutex::new(EventAggregator::resume(
            options.bin_width,
            started_at,
            cursor,
        )));
        let flusher = Arc::new(BinLogFlusher::new(aggregator.clone(), sink.clone()));

        Ok(Self {
            aggregator,
            history: Arc::new(Mutex::new(EventHistory::new(options.memory_window))),
            flusher,
            sink,
            clock,
            options,
            started_at,
        })
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn started_at(&self) -> NaiveDateTime {
        self.started_at
    }

    pub fn bin_width(&self) -> BinWidth {
        self.options.bin_width
    }

    /// Count a motion start at the current time, then flush anything that
    /// closed meanwhile. The clock is read under the aggregator lock so
    /// concurrent callers always record in time order.
    pub fn record_motion(&self) -> NaiveDateTime {
        let now = {
            let mut aggregator = lock_or_recover(&self.aggregator);
            let now = self.clock.now();
            if aggregator.record(now).is_none() {
                log_warn!(
                    "motion at {} predates active day {}; not binned",
                    now,
                    aggregator.active_day()
                );
            }
            lock_or_recover(&self.history).push(now);
            now
        };

        if let Err(err) = self.reconcile() {
            log_error!("flush after motion failed, the ticker will retry: {err}");
        }
        now
    }

    /// One flush pass at the current time.
    pub fn reconcile(&self) -> Result<usize, SinkError> {
        self.flusher.reconcile(self.clock.now())
    }

    pub fn prune(&self) -> Result<PruneReport, SinkError> {
        self.sink.prune(self.options.retention_days, self.clock.now())
    }

    /// Append a `KIND: message` line stamped with the current time.
    pub fn annotate(&self, kind: &str, message: &str) -> Result<(), SinkError> {
        self.sink
            .append(&annotation_line(self.clock.now(), kind, message))
    }

    pub fn last_motion(&self) -> Option<NaiveDateTime> {
        lock_or_recover(&self.history).last()
    }

    /// Rolling 24-hour view for display. Reads the history only.
    pub fn status_rows(&self) -> Vec<WindowRow> {
        let now = self.clock.now();
        let events = {
            let mut history = lock_or_recover(&self.history);
            history.prune(now);
            history.snapshot()
        };
        render_rows(now, &events, self.options.bin_width, self.started_at)
    }
}
