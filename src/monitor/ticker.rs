use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::MonitorController;
use crate::activity_log::PruneSchedule;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Periodic flush + prune loop. Runs for the lifetime of the process; the tick
/// alone is enough to get every bin into the log, motion or not.
pub async fn ticker_loop(controller: MonitorController, interval: Duration, mut schedule: PruneSchedule) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    log_info!("flush ticker started ({}s interval)", interval.as_secs());
    loop {
        ticker.tick().await;
        run_tick(&controller, &mut schedule).await;
    }
}

/// One tick: reconcile the log, then prune if the schedule allows.
pub async fn run_tick(controller: &MonitorController, schedule: &mut PruneSchedule) {
    let flush_handle = controller.clone();
    match tokio::task::spawn_blocking(move || flush_handle.reconcile()).await {
        Ok(Ok(_)) => {}
        Ok(Err(err)) => log_error!("periodic flush failed, retrying next tick: {err}"),
        Err(join_err) => log_error!("flush worker join failed: {join_err:?}"),
    }

    let now = controller.now();
    if !schedule.is_due(now) {
        return;
    }
    schedule.mark_attempted(now);

    let prune_handle = controller.clone();
    match tokio::task::spawn_blocking(move || prune_handle.prune()).await {
        Ok(Ok(report)) => log_info!(
            "retention pass removed {} lines, kept {}",
            report.removed,
            report.kept
        ),
        Ok(Err(err)) => log_warn!("log prune failed, retrying at next scheduled pass: {err}"),
        Err(join_err) => log_error!("prune worker join failed: {join_err:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity_log::FileLogSink;
    use crate::binning::BinWidth;
    use crate::clock::ManualClock;
    use crate::monitor::MonitorOptions;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::Arc;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 10)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[tokio::test]
    async fn tick_flushes_idle_bins_and_prunes_once_after_startup() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(at(0, 0, 0)));
        let sink = Arc::new(FileLogSink::new(dir.path().join("motion_log.txt")));
        let controller = MonitorController::start(
            MonitorOptions {
                bin_width: BinWidth::new(60).unwrap(),
                memory_window: chrono::Duration::hours(48),
                retention_days: 90,
            },
            sink.clone(),
            clock.clone(),
        )
        .unwrap();
        let mut schedule = PruneSchedule::new(
            controller.started_at(),
            chrono::Duration::seconds(10),
            chrono::Duration::hours(12),
        );

        clock.set(at(0, 0, 5));
        run_tick(&controller, &mut schedule).await;
        assert_eq!(schedule.last_attempt(), None);

        clock.set(at(3, 0, 0));
        run_tick(&controller, &mut schedule).await;
        assert_eq!(schedule.last_attempt(), Some(at(3, 0, 0)));

        clock.set(at(4, 0, 0));
        run_tick(&controller, &mut schedule).await;

        let lines = sink.read_lines().unwrap();
        let bins: Vec<&String> = lines.iter().filter(|l| l.contains("Detected")).collect();
        assert_eq!(bins.len(), 4);
        assert!(bins.iter().all(|l| l.ends_with("Detected  0 motion events.")));
        assert_eq!(lines.iter().filter(|l| l.contains(" PRUNE: ")).count(), 1);
    }
}
