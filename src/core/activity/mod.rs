mod tracker;
pub mod simulator;
mod status;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

pub use tracker::{ActivityLog, DEFAULT_CAPACITY, StatusCounts};
pub use status::{ActivityStatus, Column, classify};

/// The tracker's log, shared between request handlers and background tasks.
pub type SharedTracker = Arc<Mutex<ActivityLog>>;

pub fn shared_tracker(capacity: usize) -> SharedTracker {
    Arc::new(Mutex::new(ActivityLog::with_capacity(capacity)))
}

/// A tracked unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(default = "empty_object")]
    pub metadata: Value,
    pub status: ActivityStatus,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

pub fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// RFC 3339 UTC with fixed millisecond precision, so timestamps compare
/// correctly as plain strings (SQLite relies on this).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn timestamp_now() -> String {
    format_timestamp(Utc::now())
}
