mod handlers;
pub mod router;

use anyhow::Result;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::http::{BoundServer, serve};
use crate::core::config::MonitorConfig;
use crate::core::lifecycle::LifecycleComponent;
use crate::core::mirror::MirrorStore;
use crate::core::monitor::Notifier;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct MonitorState {
    pub(crate) store: MirrorStore,
    pub(crate) notifier: Notifier,
    pub(crate) shutdown: CancellationToken,
}

/// Dashboard API and WebSocket feed. Owns the mirror store and closes it
/// last on shutdown.
pub struct MonitorServer {
    state: MonitorState,
    bind_addr: String,
    server: Option<BoundServer>,
}

impl MonitorServer {
    pub fn new(
        store: MirrorStore,
        notifier: Notifier,
        config: &MonitorConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            state: MonitorState {
                store,
                notifier,
                shutdown,
            },
            bind_addr: config.bind_addr(),
            server: None,
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(|s| s.addr)
    }
}

#[async_trait]
impl LifecycleComponent for MonitorServer {
    async fn on_init(&mut self) -> Result<()> {
        info!("Monitor API initializing...");
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        let app = router::build_router(self.state.clone());
        let server = serve(
            "Monitor API",
            &self.bind_addr,
            app,
            self.state.shutdown.clone(),
        )
        .await?;
        info!("Dashboard feed available at ws://{}/ws", server.addr);
        self.server = Some(server);
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        info!("Monitor API shutting down...");
        if let Some(server) = self.server.take()
            && tokio::time::timeout(DRAIN_TIMEOUT, server.join()).await.is_err()
        {
            warn!("Monitor API did not drain within {:?}", DRAIN_TIMEOUT);
        }
        self.state.store.close().await
    }
}
