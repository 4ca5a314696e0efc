use anyhow::Result;
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ActivityStatus, SharedTracker};
use crate::core::lifecycle::LifecycleManager;

const SYNTHETIC_KINDS: &[&str] = &["background_task", "scheduled_job", "maintenance"];
const MAX_RESOLVE_DELAY_MS: u64 = 5000;

/// Log one synthetic activity and resolve it after a random delay.
///
/// The resolution is abandoned if `shutdown` fires first.
pub async fn inject_synthetic(tracker: &SharedTracker, shutdown: &CancellationToken) {
    let (kind, delay) = {
        let mut rng = rand::thread_rng();
        let kind = SYNTHETIC_KINDS
            .choose(&mut rng)
            .copied()
            .unwrap_or("background_task");
        (kind, Duration::from_millis(rng.gen_range(0..MAX_RESOLVE_DELAY_MS)))
    };

    let activity = tracker.lock().await.log(
        kind,
        &format!("Executing {}", kind),
        json!({ "automatic": true }),
    );

    let tracker = tracker.clone();
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!(activity_id = %activity.id, "Shutdown before synthetic activity resolved");
            }
            _ = tokio::time::sleep(delay) => {
                resolve(&tracker, &activity.id).await;
            }
        }
    });
}

async fn resolve(tracker: &SharedTracker, id: &str) {
    let updated = tracker.lock().await.update(
        id,
        ActivityStatus::Completed,
        json!({ "success": true }),
    );
    if updated.is_none() {
        // Cleared or evicted while pending.
        warn!(activity_id = %id, "Synthetic activity vanished before completion");
    }
}

/// Attach the demo traffic generator to the lifecycle scheduler.
pub async fn attach_simulator(
    tracker: &SharedTracker,
    interval: Duration,
    lifecycle: &mut LifecycleManager,
) -> Result<()> {
    let tracker = tracker.clone();
    let shutdown = lifecycle.shutdown_token();

    let job = tokio_cron_scheduler::Job::new_repeated_async(interval, move |_uuid, _l| {
        let tracker = tracker.clone();
        let shutdown = shutdown.clone();
        Box::pin(async move {
            if !shutdown.is_cancelled() {
                inject_synthetic(&tracker, &shutdown).await;
            }
        })
    })?;
    lifecycle.scheduler.add(job).await?;

    tracing::info!(
        "Activity simulator scheduled every {}s",
        interval.as_secs_f64()
    );
    Ok(())
}
