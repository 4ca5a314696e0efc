use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use rand::Rng;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::warn;

use super::super::TrackerState;
use crate::core::activity::{ActivityStatus, timestamp_now};
use crate::interfaces::error::ApiError;

const MIN_WORK_MS: u64 = 1000;
const MAX_WORK_MS: u64 = 3000;

#[derive(Debug, Default, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    task: Value,
    #[serde(default)]
    data: Value,
}

fn task_label(task: &Value) -> String {
    match task {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Log a `process` activity, simulate work, then complete it. A shutdown
/// during the work marks the activity failed instead.
pub async fn process_task(
    State(state): State<TrackerState>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let activity = state.tracker.lock().await.log(
        "process",
        &format!("Processing task: {}", task_label(&request.task)),
        json!({ "task": request.task, "data": request.data }),
    );

    let work = Duration::from_millis(rand::thread_rng().gen_range(MIN_WORK_MS..MAX_WORK_MS));
    tokio::select! {
        _ = tokio::time::sleep(work) => {}
        _ = state.shutdown.cancelled() => {
            let message = "Tracker shut down before the task finished";
            warn!(activity_id = %activity.id, "{}", message);
            state.tracker.lock().await.update(
                &activity.id,
                ActivityStatus::Failed,
                json!({ "error": message }),
            );
            return Err(ApiError::Internal(message.to_string()));
        }
    }

    let result = json!({
        "taskId": uuid::Uuid::new_v4().to_string(),
        "task": request.task,
        "processed": true,
        "timestamp": timestamp_now(),
    });

    let updated = state.tracker.lock().await.update(
        &activity.id,
        ActivityStatus::Completed,
        result.clone(),
    );
    if updated.is_none() {
        warn!(activity_id = %activity.id, "Process activity vanished before completion");
        return Err(ApiError::Internal(
            "Activity was removed before processing finished".to_string(),
        ));
    }

    Ok(Json(json!({ "success": true, "result": result })))
}
