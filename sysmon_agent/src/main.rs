//! sysmon_agent: samples host resources on a fixed cadence, raises threshold
//! alerts and serves the latest snapshot over HTTP.

use anyhow::{anyhow, Context};
use std::env;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use sysmon_agent::alerts::AlertEvaluator;
use sysmon_agent::api::{self, DRAIN_GRACE};
use sysmon_agent::args::parse_args;
use sysmon_agent::collector::{spawn_collector, Collector, LoopTiming};
use sysmon_agent::config::AgentConfig;
use sysmon_agent::lifecycle::Lifecycle;
use sysmon_agent::logging::init_logging;
use sysmon_agent::notify::AlertDispatcher;
use sysmon_agent::probe::SysinfoProbe;
use sysmon_agent::sampler::Sampler;
use sysmon_agent::state::SnapshotStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            let code = if msg.starts_with("Usage:") { 0 } else { 2 };
            eprintln!("{msg}");
            std::process::exit(code);
        }
    };

    // Config problems are fatal before anything starts.
    let mut cfg = match AgentConfig::load(&parsed.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    if let Some(port) = parsed.port {
        cfg.api.port = port;
    }

    init_logging(&cfg).context("initializing logging")?;
    info!("Service started.");

    let lifecycle = Lifecycle::new();
    let store = SnapshotStore::new();

    info!("Starting API Server on port {}...", cfg.api.port);
    let addr = format!("{}:{}", cfg.api.host, cfg.api.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("cannot bind {addr}: {e}");
            return Err(e).with_context(|| format!("binding {addr}"));
        }
    };
    let server = api::spawn_server(listener, store.clone(), lifecycle.clone());

    let sampler = Sampler::new(
        SysinfoProbe::new(),
        Duration::from_millis(cfg.system.cpu_window_ms),
        cfg.system.disk_path.clone(),
    );
    let collector = spawn_collector(Collector::new(
        sampler,
        store,
        AlertEvaluator::new(cfg.alert_rules()),
        AlertDispatcher::from_config(&cfg.alerts),
        lifecycle.clone(),
        LoopTiming::every(cfg.system.update_interval),
    ))
    .context("spawning collector thread")?;

    let signals = {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move { lifecycle.listen_for_signals().await })
    };

    lifecycle.stopped().await;
    signals.abort();

    tokio::task::spawn_blocking(move || collector.join())
        .await?
        .map_err(|_| anyhow!("collector thread panicked"))?;

    if tokio::time::timeout(DRAIN_GRACE, server).await.is_err() {
        warn!("API server still busy after {DRAIN_GRACE:?}; exiting anyway");
    }
    info!("Service stopped gracefully.");
    Ok(())
}
