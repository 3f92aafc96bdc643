use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{extract::State, response::Html, routing::get, Json, Router};
use tokio::sync::watch;

use super::page::{render_page, StatusView};
use crate::history::WindowRow;
use crate::monitor::MonitorController;
use crate::network::NetworkStatus;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Clone)]
pub struct StatusState {
    controller: MonitorController,
    network: Option<watch::Receiver<NetworkStatus>>,
    refresh_seconds: u32,
}

impl StatusState {
    pub fn new(
        controller: MonitorController,
        network: Option<watch::Receiver<NetworkStatus>>,
        refresh_seconds: u32,
    ) -> Self {
        Self {
            controller,
            network,
            refresh_seconds,
        }
    }

    pub fn view(&self) -> StatusView {
        StatusView {
            now: self.controller.now(),
            last_motion: self.controller.last_motion(),
            network: self.network.as_ref().map(|rx| *rx.borrow()),
            rows: self.controller.status_rows(),
            refresh_seconds: self.refresh_seconds,
        }
    }
}

pub fn build_router(state: StatusState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/rows.json", get(rows_json))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn index(State(state): State<StatusState>) -> Html<String> {
    Html(render_page(&state.view()))
}

async fn rows_json(State(state): State<StatusState>) -> Json<Vec<WindowRow>> {
    Json(state.controller.status_rows())
}

async fn healthz() -> &'static str {
    "ok"
}

/// Serve the status page until the listener fails.
pub async fn serve(addr: SocketAddr, state: StatusState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind status page on {addr}"))?;
    log_info!("status page listening on http://{addr}");

    axum::serve(listener, build_router(state))
        .await
        .context("status page server stopped")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity_log::FileLogSink;
    use crate::binning::BinWidth;
    use crate::clock::ManualClock;
    use crate::monitor::MonitorOptions;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn state(dir: &tempfile::TempDir, network: Option<watch::Receiver<NetworkStatus>>) -> StatusState {
        let clock = Arc::new(ManualClock::new(
            NaiveDate::from_ymd_opt(2024, 5, 10)
                .unwrap()
                .and_hms_opt(3, 0, 0)
                .unwrap(),
        ));
        let sink = Arc::new(FileLogSink::new(dir.path().join("motion_log.txt")));
        let controller = MonitorController::start(
            MonitorOptions {
                bin_width: BinWidth::new(30).unwrap(),
                memory_window: chrono::Duration::hours(48),
                retention_days: 90,
            },
            sink,
            clock,
        )
        .unwrap();
        StatusState::new(controller, network, 5)
    }

    #[tokio::test]
    async fn index_renders_current_view() {
        let dir = tempfile::tempdir().unwrap();
        let (_tx, rx) = watch::channel(NetworkStatus::Offline);
        let state = state(&dir, Some(rx));
        state.controller.record_motion();

        let Html(body) = index(State(state)).await;
        assert!(body.contains("2024-05-10 03:00:00"));
        assert!(body.contains("LAN and internet unreachable"));
    }

    #[tokio::test]
    async fn rows_json_has_one_row_per_bin() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir, None);

        let Json(rows) = rows_json(State(state)).await;
        assert_eq!(rows.len(), 48);
        assert_eq!(healthz().await, "ok");
    }
}
