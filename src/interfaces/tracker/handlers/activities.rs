use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::super::TrackerState;
use crate::core::activity::{Activity, ActivityStatus, empty_object};
use crate::interfaces::error::ApiError;

pub const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    limit: Option<String>,
    status: Option<String>,
}

/// `None` for absent, non-numeric or zero limits.
fn explicit_limit(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
}

pub async fn list_activities(
    State(state): State<TrackerState>,
    Query(query): Query<ListQuery>,
) -> Json<Value> {
    let limit = explicit_limit(query.limit.as_deref());
    let status = query.status.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let activities: Vec<Activity> = {
        let log = state.tracker.lock().await;
        match status {
            Some(status) => {
                let mut matches = log.get_by_status(status);
                if let Some(limit) = limit {
                    let skip = matches.len().saturating_sub(limit);
                    matches.drain(..skip);
                }
                matches
            }
            None => log.get_recent(limit.unwrap_or(DEFAULT_LIST_LIMIT)),
        }
    };

    Json(json!({
        "success": true,
        "count": activities.len(),
        "activities": activities,
    }))
}

pub async fn get_activity(
    State(state): State<TrackerState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let activity = state
        .tracker
        .lock()
        .await
        .get(&id)
        .ok_or_else(ApiError::activity_not_found)?;
    Ok(Json(json!({ "success": true, "activity": activity })))
}

#[derive(Debug, Deserialize)]
pub struct CreateActivityRequest {
    #[serde(rename = "type")]
    kind: Option<String>,
    description: Option<String>,
    metadata: Option<Value>,
}

pub async fn create_activity(
    State(state): State<TrackerState>,
    payload: Result<Json<CreateActivityRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(payload) = payload?;
    let kind = payload.kind.as_deref().unwrap_or_default();
    let description = payload.description.as_deref().unwrap_or_default();
    if kind.trim().is_empty() || description.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Type and description are required".to_string(),
        ));
    }

    let metadata = payload.metadata.unwrap_or_else(empty_object);
    let activity = state.tracker.lock().await.log(kind, description, metadata);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "activity": activity })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdateActivityRequest {
    status: Option<String>,
    result: Option<Value>,
}

pub async fn update_activity(
    State(state): State<TrackerState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateActivityRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload?;
    let Some(status) = payload.status.filter(|s| !s.trim().is_empty()) else {
        return Err(ApiError::BadRequest("Status is required".to_string()));
    };

    let activity = state
        .tracker
        .lock()
        .await
        .update(
            &id,
            ActivityStatus::from(status),
            payload.result.unwrap_or_else(empty_object),
        )
        .ok_or_else(ApiError::activity_not_found)?;
    Ok(Json(json!({ "success": true, "activity": activity })))
}

pub async fn clear_activities(State(state): State<TrackerState>) -> Json<Value> {
    state.tracker.lock().await.clear();
    Json(json!({ "success": true, "message": "Activities cleared" }))
}
