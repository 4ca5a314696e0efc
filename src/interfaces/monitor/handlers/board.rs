use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::super::MonitorState;
use crate::core::activity::timestamp_now;
use crate::core::mirror::DEFAULT_METRICS_WINDOW_HOURS;
use crate::interfaces::error::ApiError;

pub const DEFAULT_LIST_LIMIT: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    limit: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    hours: Option<String>,
}

fn positive<T: std::str::FromStr + PartialOrd + Default>(raw: Option<&str>) -> Option<T> {
    raw.and_then(|s| s.trim().parse::<T>().ok())
        .filter(|n| *n > T::default())
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "timestamp": timestamp_now() }))
}

pub async fn list_activities(
    State(state): State<MonitorState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = positive(query.limit.as_deref()).unwrap_or(DEFAULT_LIST_LIMIT);
    let status = query.status.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let activities = state.store.list_activities(status, limit).await?;
    Ok(Json(json!({
        "success": true,
        "count": activities.len(),
        "activities": activities,
    })))
}

pub async fn columns(State(state): State<MonitorState>) -> Result<Json<Value>, ApiError> {
    let columns = state.store.columns().await?;
    Ok(Json(json!({ "success": true, "columns": columns })))
}

pub async fn kanban(State(state): State<MonitorState>) -> Result<Json<Value>, ApiError> {
    let board = state.store.kanban().await?;
    Ok(Json(json!({ "success": true, "kanban": board })))
}

pub async fn stats(State(state): State<MonitorState>) -> Result<Json<Value>, ApiError> {
    let stats = state.store.stats().await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}

pub async fn metrics(
    State(state): State<MonitorState>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<Value>, ApiError> {
    let hours = positive(query.hours.as_deref()).unwrap_or(DEFAULT_METRICS_WINDOW_HOURS);
    let samples = state.store.metrics_since(hours).await?;
    Ok(Json(json!({
        "success": true,
        "hours": hours,
        "count": samples.len(),
        "metrics": samples,
    })))
}
