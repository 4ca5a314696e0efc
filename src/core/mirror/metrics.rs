use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, params};
use std::collections::BTreeMap;

use super::types::{BoardStats, MetricSample};
use super::{MirrorStore, open_conn};
use crate::core::activity::format_timestamp;

pub const DEFAULT_METRICS_WINDOW_HOURS: u32 = 24;
const STATS_WINDOW_HOURS: i64 = 1;

impl MirrorStore {
    /// Samples newer than `hours` ago, newest first. Windows reaching past
    /// the earliest representable time return everything.
    pub async fn metrics_since(&self, hours: u32) -> Result<Vec<MetricSample>> {
        let cutoff = format_timestamp(
            Utc::now()
                .checked_sub_signed(Duration::hours(i64::from(hours)))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        );

        let mut guard = self.lock().await;
        let db = open_conn(&mut guard)?;
        let mut stmt = db.prepare(
            "SELECT id, timestamp, metric_name, metric_value FROM system_metrics
             WHERE timestamp > ?1 ORDER BY timestamp DESC, id DESC",
        )?;
        let samples = stmt
            .query_map(params![cutoff], |row| {
                Ok(MetricSample {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    metric_name: row.get(2)?,
                    metric_value: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(samples)
    }

    /// Row totals per status plus per-metric averages over the last hour.
    pub async fn stats(&self) -> Result<BoardStats> {
        let mut guard = self.lock().await;
        let db = open_conn(&mut guard)?;
        load_stats(db)
    }
}

pub(super) fn load_stats(db: &Connection) -> Result<BoardStats> {
    let cutoff = format_timestamp(Utc::now() - Duration::hours(STATS_WINDOW_HOURS));

    let total: i64 = db.query_row("SELECT COUNT(*) FROM activities", [], |row| row.get(0))?;

    let mut stmt = db.prepare("SELECT status, COUNT(*) FROM activities GROUP BY status")?;
    let by_status = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;

    let mut stmt = db.prepare(
        "SELECT metric_name, AVG(metric_value) FROM system_metrics
         WHERE timestamp > ?1 GROUP BY metric_name",
    )?;
    let metrics = stmt
        .query_map(params![cutoff], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;

    Ok(BoardStats {
        total,
        by_status,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mirror::activities::tests::row;
    use crate::core::mirror::types::PollBatch;

    fn ago(minutes: i64) -> String {
        format_timestamp(Utc::now() - Duration::minutes(minutes))
    }

    #[tokio::test]
    async fn stats_average_recent_samples_only() {
        let store = MirrorStore::open_in_memory().unwrap();
        store
            .apply_poll(&PollBatch {
                polled_at: ago(120),
                activities: vec![row("a", "running", 1, &ago(120))],
                metrics: vec![("uptime".to_string(), 1000.0)],
            })
            .await
            .unwrap();
        for (minutes, uptime) in [(10, 10.0), (5, 20.0)] {
            store
                .apply_poll(&PollBatch {
                    polled_at: ago(minutes),
                    activities: vec![row("b", "completed", 2, &ago(30))],
                    metrics: vec![("uptime".to_string(), uptime)],
                })
                .await
                .unwrap();
        }

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_status.get("running"), Some(&1));
        assert_eq!(stats.by_status.get("completed"), Some(&1));
        assert_eq!(stats.metrics.get("uptime"), Some(&15.0));

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["byStatus"]["completed"], 1);
    }

    #[tokio::test]
    async fn metrics_window_is_trailing_hours() {
        let store = MirrorStore::open_in_memory().unwrap();
        for minutes in [30 * 60, 90, 5] {
            store
                .apply_poll(&PollBatch {
                    polled_at: ago(minutes),
                    activities: Vec::new(),
                    metrics: vec![("activities_total".to_string(), minutes as f64)],
                })
                .await
                .unwrap();
        }

        let day = store.metrics_since(DEFAULT_METRICS_WINDOW_HOURS).await.unwrap();
        let values: Vec<f64> = day.iter().map(|s| s.metric_value).collect();
        assert_eq!(values, vec![5.0, 90.0]);

        let hour = store.metrics_since(1).await.unwrap();
        assert_eq!(hour.len(), 1);
        assert_eq!(hour[0].metric_name, "activities_total");
    }

    #[tokio::test]
    async fn oversized_window_returns_everything() {
        let store = MirrorStore::open_in_memory().unwrap();
        store
            .apply_poll(&PollBatch {
                polled_at: ago(30 * 24 * 60),
                activities: Vec::new(),
                metrics: vec![("uptime".to_string(), 1.0)],
            })
            .await
            .unwrap();

        let all = store.metrics_since(u32::MAX).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn empty_store_has_zero_stats() {
        let store = MirrorStore::open_in_memory().unwrap();
        assert_eq!(store.stats().await.unwrap(), BoardStats::default());
    }
}
