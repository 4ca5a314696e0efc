use anyhow::Result;
use console::style;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::{MonitorFlags, TrackerFlags};
use crate::core::activity::{self, simulator};
use crate::core::client::TrackerClient;
use crate::core::config::{self, MonitorConfig, TrackerConfig};
use crate::core::lifecycle::{LifecycleManager, wait_for_signal};
use crate::core::mirror::MirrorStore;
use crate::core::monitor::{Notifier, Poller, attach_poller};
use crate::core::terminal::{self, GuideSection};
use crate::interfaces::monitor::MonitorServer;
use crate::interfaces::tracker::TrackerServer;
use crate::logging::init_tracing;

const NOTIFIER_CAPACITY: usize = 64;

pub(crate) fn resolve_tracker_config(flags: &TrackerFlags) -> Result<TrackerConfig> {
    let mut config: TrackerConfig = config::load_file(flags.config.as_deref())?;
    config.apply_env(config::process_env)?;
    flags.apply(&mut config);
    Ok(config)
}

pub(crate) fn resolve_monitor_config(flags: &MonitorFlags) -> Result<MonitorConfig> {
    let mut config: MonitorConfig = config::load_file(flags.config.as_deref())?;
    config.apply_env(config::process_env)?;
    flags.apply(&mut config);
    Ok(config)
}

pub(crate) async fn run_tracker(flags: TrackerFlags) -> Result<()> {
    let config = resolve_tracker_config(&flags)?;
    init_tracing(&config.logging)?;

    let tracker = activity::shared_tracker(config.capacity);
    let mut lifecycle = LifecycleManager::new().await?;
    let shutdown = lifecycle.shutdown_token();
    lifecycle.attach(Arc::new(Mutex::new(TrackerServer::new(
        tracker.clone(),
        &config,
        shutdown,
    ))));
    if config.simulate {
        simulator::attach_simulator(&tracker, config.simulate_interval(), &mut lifecycle).await?;
    }
    lifecycle.start().await?;

    terminal::print_banner();
    GuideSection::new("Tracker")
        .status("API", &format!("http://{}", config.bind_addr()))
        .status("Environment", &config.environment)
        .status(
            "Simulator",
            if config.simulate { "enabled" } else { "disabled" },
        )
        .status(
            "Request tracking",
            if config.track_requests { "enabled" } else { "disabled" },
        )
        .blank()
        .info(&format!("Press {} to stop.", style("Ctrl+C").bold().yellow()))
        .print();
    println!();

    let signal = wait_for_signal().await;
    info!("{} signal received: closing HTTP server", signal);
    tracker
        .lock()
        .await
        .log("system", "tracker shutting down", json!({ "signal": signal }));
    lifecycle.shutdown().await
}

pub(crate) async fn run_monitor(flags: MonitorFlags) -> Result<()> {
    let config = resolve_monitor_config(&flags)?;
    init_tracing(&config.logging)?;

    let store = MirrorStore::open(&config.db_path).await?;
    let notifier = Notifier::new(NOTIFIER_CAPACITY);
    let client = TrackerClient::new(&config.tracker_url(), config.request_timeout())?;
    let poller = Arc::new(Poller::new(
        client,
        store.clone(),
        notifier.clone(),
        config.poll_limit,
    ));

    let mut lifecycle = LifecycleManager::new().await?;
    let shutdown = lifecycle.shutdown_token();
    lifecycle.attach(Arc::new(Mutex::new(MonitorServer::new(
        store, notifier, &config, shutdown,
    ))));
    attach_poller(
        poller,
        config.startup_delay(),
        config.poll_interval(),
        &mut lifecycle,
    )
    .await?;
    lifecycle.start().await?;

    terminal::print_banner();
    GuideSection::new("Monitor")
        .status("API", &format!("http://{}", config.bind_addr()))
        .status("Feed", &format!("ws://{}/ws", config.bind_addr()))
        .status("Tracker", &config.tracker_url())
        .status("Store", &config.db_path.display().to_string())
        .status("Interval", &format!("{}ms", config.poll_interval_ms))
        .blank()
        .info(&format!("Press {} to stop.", style("Ctrl+C").bold().yellow()))
        .print();
    println!();

    let signal = wait_for_signal().await;
    info!("{} signal received: stopping monitor", signal);
    lifecycle.shutdown().await
}
