use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::core::activity::{Activity, Column};

/// An activity as persisted by the monitor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirroredActivity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub metadata: Value,
    pub status: String,
    pub timestamp: String,
    pub completed_at: Option<String>,
    pub result: Option<Value>,
    pub column_position: i64,
    pub synced_at: String,
}

impl MirroredActivity {
    pub fn new(activity: Activity, column: Column, synced_at: &str) -> Self {
        Self {
            id: activity.id,
            kind: activity.kind,
            description: activity.description,
            metadata: activity.metadata,
            status: activity.status.into(),
            timestamp: activity.timestamp,
            completed_at: activity.completed_at,
            result: activity.result,
            column_position: column.position(),
            synced_at: synced_at.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardColumn {
    pub id: i64,
    pub name: String,
    pub position: i64,
    pub color: Option<String>,
}

/// One consistent read of the board for a new subscriber.
#[derive(Debug, Clone)]
pub struct BoardSnapshot {
    pub activities: Vec<MirroredActivity>,
    pub columns: Vec<BoardColumn>,
    pub stats: BoardStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct KanbanColumn {
    #[serde(flatten)]
    pub column: BoardColumn,
    pub activities: Vec<MirroredActivity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    pub id: i64,
    pub timestamp: String,
    pub metric_name: String,
    pub metric_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardStats {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    /// Average of each metric over the last hour.
    pub metrics: BTreeMap<String, f64>,
}

/// Everything one successful poll writes, applied atomically.
#[derive(Debug, Clone, Default)]
pub struct PollBatch {
    pub polled_at: String,
    pub activities: Vec<MirroredActivity>,
    pub metrics: Vec<(String, f64)>,
}
