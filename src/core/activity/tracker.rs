use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use tracing::{debug, info};

use super::{Activity, ActivityStatus, timestamp_now};

pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Bounded, insertion-ordered log of activities.
///
/// Appends past `capacity` evict the oldest entry. Lookups are linear scans;
/// the log is small and mostly read from the tail.
#[derive(Debug)]
pub struct ActivityLog {
    entries: VecDeque<Activity>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ActivityLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn log(&mut self, kind: &str, description: &str, metadata: Value) -> Activity {
        let activity = Activity {
            id: uuid::Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            description: description.to_string(),
            metadata,
            status: ActivityStatus::Running,
            timestamp: timestamp_now(),
            completed_at: None,
            result: None,
        };

        self.entries.push_back(activity.clone());
        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                debug!(activity_id = %evicted.id, "Evicted oldest activity");
            }
        }

        info!(
            activity_id = %activity.id,
            kind = %activity.kind,
            description = %activity.description,
            "Activity logged"
        );
        activity
    }

    /// Set status, result and completion time. `None` when the id is unknown,
    /// in which case nothing changes.
    pub fn update(&mut self, id: &str, status: ActivityStatus, result: Value) -> Option<Activity> {
        let activity = self.entries.iter_mut().find(|a| a.id == id)?;
        activity.status = status;
        activity.result = Some(result);
        activity.completed_at = Some(timestamp_now());

        info!(
            activity_id = %activity.id,
            status = %activity.status,
            "Activity updated"
        );
        Some(activity.clone())
    }

    pub fn get(&self, id: &str) -> Option<Activity> {
        self.entries.iter().find(|a| a.id == id).cloned()
    }

    pub fn get_all(&self) -> Vec<Activity> {
        self.entries.iter().cloned().collect()
    }

    pub fn get_recent(&self, limit: usize) -> Vec<Activity> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn get_by_status(&self, status: &str) -> Vec<Activity> {
        self.entries
            .iter()
            .filter(|a| a.status.as_str() == status)
            .cloned()
            .collect()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts {
            total: self.entries.len(),
            ..StatusCounts::default()
        };
        for activity in &self.entries {
            match activity.status.as_str() {
                "running" => counts.running += 1,
                "completed" => counts.completed += 1,
                "failed" => counts.failed += 1,
                _ => {}
            }
        }
        counts
    }

    pub fn clear(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        info!(dropped, "Activity log cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::activity::empty_object;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn log_creates_running_activity() {
        let mut log = ActivityLog::default();
        let a = log.log("test", "d", json!({"k": "v"}));
        assert_eq!(a.status, ActivityStatus::Running);
        assert_eq!(a.kind, "test");
        assert_eq!(a.metadata["k"], "v");
        assert!(a.completed_at.is_none());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn ids_are_unique() {
        let mut log = ActivityLog::default();
        let ids: HashSet<String> = (0..200)
            .map(|i| log.log("t", &format!("d{i}"), empty_object()).id)
            .collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn eviction_keeps_most_recent_in_order() {
        let mut log = ActivityLog::default();
        for i in 0..(DEFAULT_CAPACITY + 250) {
            log.log("t", &format!("{i}"), empty_object());
        }
        assert_eq!(log.len(), DEFAULT_CAPACITY);

        let descriptions: Vec<usize> = log
            .get_all()
            .iter()
            .map(|a| a.description.parse().unwrap())
            .collect();
        let expected: Vec<usize> = (250..DEFAULT_CAPACITY + 250).collect();
        assert_eq!(descriptions, expected);
    }

    #[test]
    fn small_capacity_evicts_fifo() {
        let mut log = ActivityLog::with_capacity(3);
        let first = log.log("t", "1", empty_object());
        for d in ["2", "3", "4"] {
            log.log("t", d, empty_object());
        }
        assert!(log.get(&first.id).is_none());
        let descriptions: Vec<String> =
            log.get_all().into_iter().map(|a| a.description).collect();
        assert_eq!(descriptions, vec!["2", "3", "4"]);
    }

    #[test]
    fn update_sets_status_result_and_completion() {
        let mut log = ActivityLog::default();
        let a = log.log("test", "d", empty_object());
        let updated = log
            .update(&a.id, ActivityStatus::Completed, json!({"ok": true}))
            .unwrap();
        assert_eq!(updated.status, ActivityStatus::Completed);
        assert_eq!(updated.result, Some(json!({"ok": true})));
        assert!(updated.completed_at.is_some());
        assert_eq!(log.get(&a.id).unwrap(), updated);
    }

    #[test]
    fn update_unknown_id_changes_nothing() {
        let mut log = ActivityLog::default();
        log.log("t", "d", empty_object());
        let before = log.get_all();
        assert!(
            log.update("missing", ActivityStatus::Failed, json!({}))
                .is_none()
        );
        assert_eq!(log.get_all(), before);
    }

    #[test]
    fn repeated_identical_update_is_idempotent() {
        let mut log = ActivityLog::default();
        let a = log.log("t", "d", empty_object());
        let first = log
            .update(&a.id, ActivityStatus::Failed, json!({"error": "x"}))
            .unwrap();
        let second = log
            .update(&a.id, ActivityStatus::Failed, json!({"error": "x"}))
            .unwrap();
        assert_eq!(first.status, second.status);
        assert_eq!(first.result, second.result);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn get_recent_returns_tail_in_insertion_order() {
        let mut log = ActivityLog::default();
        for i in 0..10 {
            log.log("t", &i.to_string(), empty_object());
        }
        let recent: Vec<String> = log.get_recent(3).into_iter().map(|a| a.description).collect();
        assert_eq!(recent, vec!["7", "8", "9"]);
        assert_eq!(log.get_recent(50).len(), 10);
        assert!(log.get_recent(0).is_empty());
    }

    #[test]
    fn status_filters_partition_the_log() {
        let mut log = ActivityLog::default();
        let statuses = ["completed", "failed", "custom", "running"];
        for i in 0..40 {
            let a = log.log("t", &i.to_string(), empty_object());
            let status = statuses[i % statuses.len()];
            if status != "running" {
                log.update(&a.id, ActivityStatus::parse(status), empty_object());
            }
        }

        let distinct: HashSet<String> = log
            .get_all()
            .iter()
            .map(|a| a.status.as_str().to_string())
            .collect();
        let mut seen = HashSet::new();
        let mut total = 0;
        for status in &distinct {
            for a in log.get_by_status(status) {
                assert!(seen.insert(a.id), "activity listed twice");
                total += 1;
            }
        }
        assert_eq!(total, log.len());
    }

    #[test]
    fn counts_track_known_statuses() {
        let mut log = ActivityLog::default();
        let a = log.log("t", "a", empty_object());
        let b = log.log("t", "b", empty_object());
        log.log("t", "c", empty_object());
        log.update(&a.id, ActivityStatus::Completed, empty_object());
        log.update(&b.id, ActivityStatus::Failed, empty_object());
        assert_eq!(
            log.counts(),
            StatusCounts {
                total: 3,
                running: 1,
                completed: 1,
                failed: 1
            }
        );
    }

    #[test]
    fn clear_discards_everything() {
        let mut log = ActivityLog::default();
        for _ in 0..5 {
            log.log("t", "d", empty_object());
        }
        log.clear();
        assert!(log.is_empty());
        assert!(log.get_all().is_empty());
    }
}
