use std::time::Duration;

use serde::Serialize;
use tokio::{net::TcpStream, sync::watch, time::MissedTickBehavior};

use crate::monitor::MonitorController;
use crate::settings::NetworkSettings;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NetworkStatus {
    /// No check has completed yet.
    Unknown,
    Online,
    InternetDown,
    LanDown,
    Offline,
}

impl NetworkStatus {
    pub fn from_probes(lan_reachable: bool, internet_reachable: bool) -> Self {
        match (lan_reachable, internet_reachable) {
            (true, true) => NetworkStatus::Online,
            (true, false) => NetworkStatus::InternetDown,
            (false, true) => NetworkStatus::LanDown,
            (false, false) => NetworkStatus::Offline,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            NetworkStatus::Unknown => "not checked yet",
            NetworkStatus::Online => "LAN and internet reachable",
            NetworkStatus::InternetDown => "LAN reachable, internet unreachable",
            NetworkStatus::LanDown => "LAN target unreachable, internet reachable",
            NetworkStatus::Offline => "LAN and internet unreachable",
        }
    }
}

/// TCP connect to `target` (`host:port`), bounded by `timeout`.
pub async fn probe(target: &str, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect(target)).await,
        Ok(Ok(_))
    )
}

pub async fn check_once(settings: &NetworkSettings) -> NetworkStatus {
    let timeout = Duration::from_millis(settings.timeout_millis);
    let (lan, internet) = tokio::join!(
        probe(&settings.lan_target, timeout),
        probe(&settings.internet_target, timeout)
    );
    NetworkStatus::from_probes(lan, internet)
}

/// Publish `status` and note it in the activity log if it differs from the
/// last published one. Returns whether it changed.
pub async fn publish(
    controller: &MonitorController,
    status_tx: &watch::Sender<NetworkStatus>,
    status: NetworkStatus,
) -> bool {
    if *status_tx.borrow() == status {
        return false;
    }

    log_info!("network status changed: {}", status.describe());
    let handle = controller.clone();
    match tokio::task::spawn_blocking(move || handle.annotate("NETWORK", status.describe())).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => log_warn!("could not log network change: {err}"),
        Err(join_err) => log_error!("network annotation worker join failed: {join_err:?}"),
    }

    status_tx.send_replace(status);
    true
}

/// Reachability loop. Runs for the lifetime of the process.
pub async fn network_loop(
    settings: NetworkSettings,
    controller: MonitorController,
    status_tx: watch::Sender<NetworkStatus>,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(settings.check_interval_seconds));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    log_info!(
        "network monitor started (lan {}, internet {})",
        settings.lan_target,
        settings.internet_target
    );
    loop {
        ticker.tick().await;
        let status = check_once(&settings).await;
        publish(&controller, &status_tx, status).await;
    }
}
