use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::notifier::{BoardEvent, Notifier};
use crate::core::activity::{Activity, classify, timestamp_now};
use crate::core::client::{ClientError, HealthReport, StatusReport, TrackerClient};
use crate::core::lifecycle::LifecycleManager;
use crate::core::mirror::{MirrorStore, MirroredActivity, PollBatch};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Completed { activities: usize },
    /// A previous cycle was still in flight.
    Skipped,
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("tracker unavailable: {0}")]
    Upstream(#[from] ClientError),
    #[error("mirror write failed: {0}")]
    Store(anyhow::Error),
}

/// Pulls tracker state into the mirror and tells subscribers about it.
pub struct Poller {
    client: TrackerClient,
    store: MirrorStore,
    notifier: Notifier,
    limit: usize,
    in_flight: Mutex<()>,
}

impl Poller {
    pub fn new(client: TrackerClient, store: MirrorStore, notifier: Notifier, limit: usize) -> Self {
        Self {
            client,
            store,
            notifier,
            limit: limit.max(1),
            in_flight: Mutex::new(()),
        }
    }

    /// One fetch, classify, persist, notify cycle. Any upstream failure
    /// abandons the cycle before anything is written.
    pub async fn poll_once(&self) -> Result<PollOutcome, PollError> {
        let Ok(_in_flight) = self.in_flight.try_lock() else {
            debug!("Previous poll still running, skipping tick");
            return Ok(PollOutcome::Skipped);
        };

        let (list, health, status) = tokio::try_join!(
            self.client.list_activities(Some(self.limit), None),
            self.client.health(),
            self.client.status(),
        )?;

        let batch = build_batch(list.activities, &health, &status, timestamp_now());
        let written = self
            .store
            .apply_poll(&batch)
            .await
            .map_err(PollError::Store)?;

        self.notifier.publish(&BoardEvent::update(written));
        debug!(activities = written, metrics = batch.metrics.len(), "Poll cycle stored");
        Ok(PollOutcome::Completed {
            activities: written,
        })
    }

    async fn tick(&self) {
        match self.poll_once().await {
            Ok(PollOutcome::Completed { .. }) | Ok(PollOutcome::Skipped) => {}
            Err(e) => error!(tracker = %self.client.base_url(), "Poll failed: {}", e),
        }
    }
}

/// Classify every fetched activity and extract the metric samples.
fn build_batch(
    activities: Vec<Activity>,
    health: &HealthReport,
    status: &StatusReport,
    polled_at: String,
) -> PollBatch {
    let activities = activities
        .into_iter()
        .map(|activity| {
            let column = classify(&activity.status);
            MirroredActivity::new(activity, column, &polled_at)
        })
        .collect();

    PollBatch {
        metrics: extract_metrics(health, status),
        activities,
        polled_at,
    }
}

/// Numeric samples from the health and status reports. Missing fields are
/// skipped.
fn extract_metrics(health: &HealthReport, status: &StatusReport) -> Vec<(String, f64)> {
    let memory = health.memory.as_ref();
    let counts = status.activities.as_ref();

    [
        ("uptime", health.uptime),
        ("memory_rss_mb", memory.and_then(|m| m.rss).map(|b| b / BYTES_PER_MB)),
        (
            "memory_virtual_mb",
            memory.and_then(|m| m.virtual_size).map(|b| b / BYTES_PER_MB),
        ),
        ("activities_total", counts.and_then(|c| c.total)),
        ("activities_running", counts.and_then(|c| c.running)),
        ("activities_completed", counts.and_then(|c| c.completed)),
        ("activities_failed", counts.and_then(|c| c.failed)),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.filter(|v| v.is_finite()).map(|v| (name.to_string(), v)))
    .collect()
}

/// First poll after `startup_delay`, then every `interval`. Both stop once
/// the lifecycle's shutdown token fires.
pub async fn attach_poller(
    poller: Arc<Poller>,
    startup_delay: Duration,
    interval: Duration,
    lifecycle: &mut LifecycleManager,
) -> Result<()> {
    let shutdown = lifecycle.shutdown_token();

    let boot_poller = poller.clone();
    let boot_shutdown = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = boot_shutdown.cancelled() => {}
            _ = tokio::time::sleep(startup_delay) => boot_poller.tick().await,
        }
    });

    let job = tokio_cron_scheduler::Job::new_repeated_async(interval, move |_uuid, _l| {
        let poller = poller.clone();
        let shutdown = shutdown.clone();
        Box::pin(async move {
            if !shutdown.is_cancelled() {
                poller.tick().await;
            }
        })
    })?;
    lifecycle.scheduler.add(job).await?;

    info!(
        "Tracker poll scheduled every {}ms (first after {}ms)",
        interval.as_millis(),
        startup_delay.as_millis()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::{MemoryUsage, StatusCountsReport};
    use axum::{Json, Router, routing::get};
    use serde_json::json;

    async fn mock_tracker() -> String {
        let app = Router::new()
            .route(
                "/api/activities",
                get(|| async {
                    Json(json!({
                        "success": true,
                        "count": 3,
                        "activities": [
                            {"id": "a", "type": "t", "description": "d", "status": "running",
                             "timestamp": "2024-05-01T12:00:00.000Z", "metadata": {}},
                            {"id": "b", "type": "t", "description": "d", "status": "error",
                             "timestamp": "2024-05-01T12:00:01.000Z", "metadata": {},
                             "completedAt": "2024-05-01T12:00:02.000Z", "result": {"error": "x"}},
                            {"id": "c", "type": "t", "description": "d", "status": "queued",
                             "timestamp": "2024-05-01T12:00:03.000Z"}
                        ]
                    }))
                }),
            )
            .route(
                "/health",
                get(|| async {
                    Json(json!({"status": "healthy", "uptime": 12.5,
                                "memory": {"rss": 2097152.0, "virtual": 4194304.0}}))
                }),
            )
            .route(
                "/status",
                get(|| async {
                    Json(json!({"status": "running", "activities":
                        {"total": 3, "running": 1, "completed": 0, "failed": 0}}))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn poller_for(url: &str, store: MirrorStore, notifier: Notifier) -> Poller {
        let client = TrackerClient::new(url, Duration::from_secs(5)).unwrap();
        Poller::new(client, store, notifier, 100)
    }

    #[tokio::test]
    async fn successful_poll_mirrors_and_classifies_every_activity() {
        let url = mock_tracker().await;
        let store = MirrorStore::open_in_memory().unwrap();
        let notifier = Notifier::new(8);
        let mut rx = notifier.subscribe();
        let poller = poller_for(&url, store.clone(), notifier);

        let outcome = poller.poll_once().await.unwrap();
        assert_eq!(outcome, PollOutcome::Completed { activities: 3 });

        let rows = store.list_activities(None, 100).await.unwrap();
        let positions: Vec<(String, i64)> = rows
            .iter()
            .map(|r| (r.id.clone(), r.column_position))
            .collect();
        assert_eq!(
            positions,
            vec![
                ("c".to_string(), 0),
                ("b".to_string(), 3),
                ("a".to_string(), 1)
            ]
        );

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.metrics.get("memory_rss_mb"), Some(&2.0));
        assert_eq!(stats.metrics.get("activities_total"), Some(&3.0));

        let msg: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(msg["type"], "update");
        assert_eq!(msg["activities"], 3);
    }

    #[tokio::test]
    async fn failed_poll_leaves_store_untouched() {
        let store = MirrorStore::open_in_memory().unwrap();
        let notifier = Notifier::new(8);
        let mut rx = notifier.subscribe();
        let client = TrackerClient::new("127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let poller = Poller::new(client, store.clone(), notifier, 100);

        let before = store.stats().await.unwrap();
        assert!(matches!(
            poller.poll_once().await,
            Err(PollError::Upstream(_))
        ));
        assert_eq!(store.stats().await.unwrap(), before);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn overlapping_poll_is_skipped() {
        let store = MirrorStore::open_in_memory().unwrap();
        let poller = poller_for("127.0.0.1:9", store, Notifier::default());

        let _held = poller.in_flight.lock().await;
        assert_eq!(poller.poll_once().await.unwrap(), PollOutcome::Skipped);
    }

    #[test]
    fn metrics_skip_missing_fields() {
        let health = HealthReport {
            status: "healthy".to_string(),
            timestamp: None,
            uptime: Some(3.0),
            memory: Some(MemoryUsage {
                rss: Some(1048576.0),
                virtual_size: None,
            }),
        };
        let status = StatusReport {
            status: "running".to_string(),
            version: None,
            environment: None,
            activities: Some(StatusCountsReport {
                total: Some(4.0),
                ..StatusCountsReport::default()
            }),
        };

        let metrics = extract_metrics(&health, &status);
        assert_eq!(
            metrics,
            vec![
                ("uptime".to_string(), 3.0),
                ("memory_rss_mb".to_string(), 1.0),
                ("activities_total".to_string(), 4.0),
            ]
        );
    }
}
