pub mod activity_log;
pub mod binning;
pub mod clock;
pub mod history;
pub mod monitor;
pub mod network;
pub mod sensing;
pub mod settings;
pub mod status;
pub mod utils;

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use tokio::sync::watch;

use activity_log::{FileLogSink, PruneSchedule};
use clock::{Clock, LocalClock};
use monitor::{ticker_loop, MonitorController, MonitorOptions};
use network::{network_loop, NetworkStatus};
use sensing::{sensing_loop, SysfsMotionSensor};
use settings::{MonitorSettings, ValidatedSettings};
use status::StatusState;

/// Process entry point: load settings, then run the sensor, ticker, network
/// monitor and status page until one of them fails.
pub fn run() -> Result<()> {
    utils::logging::init_logging();

    log::info!("Motion monitor starting up...");

    let settings = MonitorSettings::from_args_or_env()?
        .validate()
        .context("invalid settings")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let result = runtime.block_on(serve_forever(settings));
    // The sensor worker blocks in a read loop; do not wait for it.
    runtime.shutdown_background();
    result
}

async fn serve_forever(settings: ValidatedSettings) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(LocalClock);
    let sink = Arc::new(FileLogSink::new(settings.raw.log_path.clone()));

    let controller = MonitorController::start(
        MonitorOptions {
            bin_width: settings.bin_width,
            memory_window: settings.memory_window(),
            retention_days: settings.raw.retention_days,
        },
        sink,
        clock,
    )
    .context("failed to open activity log")?;

    let schedule = PruneSchedule::new(
        controller.started_at(),
        settings.prune_startup_delay(),
        settings.prune_min_interval(),
    );
    tokio::spawn(ticker_loop(
        controller.clone(),
        settings.flush_interval(),
        schedule,
    ));

    let network_rx = settings.raw.network.clone().map(|network| {
        let (status_tx, status_rx) = watch::channel(NetworkStatus::Unknown);
        tokio::spawn(network_loop(network, controller.clone(), status_tx));
        status_rx
    });

    let sensor = SysfsMotionSensor::new(
        settings.sensor_value_path(),
        Duration::from_millis(settings.raw.sensor_poll_millis),
    );
    log::info!("reading motion sensor at {}", sensor.value_path().display());
    let settle = Duration::from_secs(settings.raw.sensor_settle_seconds);
    let sensor_task = tokio::task::spawn_blocking({
        let controller = controller.clone();
        move || sensing_loop(sensor, controller, settle)
    });

    let status = StatusState::new(controller, network_rx, settings.raw.refresh_seconds);
    let server = status::serve(settings.listen_addr, status);

    tokio::select! {
        joined = sensor_task => match joined {
            Ok(Ok(())) => bail!("sensor loop exited unexpectedly"),
            Ok(Err(err)) => Err(err.context("motion sensor unavailable")),
            Err(join_err) => Err(anyhow!("sensor worker panicked: {join_err}")),
        },
        served = server => served,
    }
}
