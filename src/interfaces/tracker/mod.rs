mod handlers;
pub mod router;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::http::{BoundServer, serve};
use crate::core::activity::SharedTracker;
use crate::core::config::TrackerConfig;
use crate::core::lifecycle::LifecycleComponent;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct TrackerState {
    pub(crate) tracker: SharedTracker,
    pub(crate) environment: String,
    pub(crate) track_requests: bool,
    pub(crate) started: Instant,
    pub(crate) shutdown: CancellationToken,
}

impl TrackerState {
    pub fn new(
        tracker: SharedTracker,
        environment: &str,
        track_requests: bool,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            tracker,
            environment: environment.to_string(),
            track_requests,
            started: Instant::now(),
            shutdown,
        }
    }
}

/// The tracker's REST listener as a lifecycle component.
pub struct TrackerServer {
    state: TrackerState,
    bind_addr: String,
    server: Option<BoundServer>,
}

impl TrackerServer {
    pub fn new(tracker: SharedTracker, config: &TrackerConfig, shutdown: CancellationToken) -> Self {
        Self {
            state: TrackerState::new(
                tracker,
                &config.environment,
                config.track_requests,
                shutdown,
            ),
            bind_addr: config.bind_addr(),
            server: None,
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(|s| s.addr)
    }
}

#[async_trait]
impl LifecycleComponent for TrackerServer {
    async fn on_init(&mut self) -> Result<()> {
        info!("Tracker API initializing...");
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        let app = router::build_router(self.state.clone());
        let server = serve(
            "Tracker API",
            &self.bind_addr,
            app,
            self.state.shutdown.clone(),
        )
        .await?;

        info!("Environment: {}", self.state.environment);
        self.state.tracker.lock().await.log(
            "system",
            "tracker started",
            json!({ "port": server.addr.port() }),
        );
        self.server = Some(server);
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        info!("Tracker API shutting down...");
        if let Some(server) = self.server.take()
            && tokio::time::timeout(DRAIN_TIMEOUT, server.join()).await.is_err()
        {
            warn!("Tracker API did not drain within {:?}", DRAIN_TIMEOUT);
        }
        Ok(())
    }
}
