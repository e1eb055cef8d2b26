//! HTTP routes. Handlers only read the last published snapshot; they never
//! sample, so a request costs the same no matter how slow collection is.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::ExposureNotReady;
use crate::lifecycle::Lifecycle;
use crate::state::SnapshotStore;
use crate::types::{fmt_float, MetricRecord};

pub const SERVICE_NAME: &str = "system-monitor-agent";

/// How long in-flight requests get to finish once shutdown starts.
pub const DRAIN_GRACE: Duration = Duration::from_secs(2);

const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

pub fn router(store: SnapshotStore) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/metrics", get(metrics_json))
        .route("/metrics/prometheus", get(metrics_prometheus))
        .with_state(store)
}

/// Serve until `lifecycle` stops, then stop accepting connections and let
/// in-flight requests finish.
pub async fn serve(
    listener: TcpListener,
    store: SnapshotStore,
    lifecycle: Lifecycle,
) -> std::io::Result<()> {
    axum::serve(listener, router(store))
        .with_graceful_shutdown(async move { lifecycle.stopped().await })
        .await
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}

async fn metrics_json(State(store): State<SnapshotStore>) -> Response {
    match store.read() {
        Some(record) => Json(&*record).into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": ExposureNotReady.to_string() })),
        )
            .into_response(),
    }
}

async fn metrics_prometheus(State(store): State<SnapshotStore>) -> Response {
    match store.read() {
        Some(record) => (
            [(header::CONTENT_TYPE, PLAIN_TEXT)],
            render_prometheus(&record),
        )
            .into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, PLAIN_TEXT)],
            format!("Error: {ExposureNotReady}"),
        )
            .into_response(),
    }
}

/// Prometheus text exposition: one gauge per headline percentage.
pub fn render_prometheus(record: &MetricRecord) -> String {
    let gauges = [
        (
            "system_cpu_usage",
            "CPU usage percentage",
            record.cpu.usage_percent,
        ),
        (
            "system_memory_usage_percent",
            "Memory usage percentage",
            record.memory.percent,
        ),
        (
            "system_disk_usage_percent",
            "Disk usage percentage",
            record.disk.percent,
        ),
    ];
    let mut lines = Vec::with_capacity(gauges.len() * 3);
    for (name, help, value) in gauges {
        lines.push(format!("# HELP {name} {help}"));
        lines.push(format!("# TYPE {name} gauge"));
        lines.push(format!("{name} {}", fmt_float(value)));
    }
    lines.join("\n")
}

/// Run `serve` on the current runtime, logging instead of failing.
pub fn spawn_server(
    listener: TcpListener,
    store: SnapshotStore,
    lifecycle: Lifecycle,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match listener.local_addr() {
            Ok(addr) => info!("API listening on http://{addr}"),
            Err(e) => warn!("API listener address unknown: {e}"),
        }
        if let Err(e) = serve(listener, store, lifecycle).await {
            warn!("API server exited: {e}");
        }
    })
}
