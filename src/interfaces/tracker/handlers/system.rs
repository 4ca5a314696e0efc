use axum::{Json, extract::State};
use serde_json::json;
use sysinfo::System;

use super::super::TrackerState;
use crate::core::activity::timestamp_now;
use crate::core::client::MemoryUsage;

pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn health(State(state): State<TrackerState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": timestamp_now(),
        "uptime": state.started.elapsed().as_secs_f64(),
        "memory": process_memory(),
    }))
}

pub async fn status(State(state): State<TrackerState>) -> Json<serde_json::Value> {
    let counts = state.tracker.lock().await.counts();
    Json(json!({
        "status": "running",
        "version": SERVICE_VERSION,
        "environment": state.environment,
        "activities": counts,
    }))
}

/// Resident and virtual size of this process in bytes.
fn process_memory() -> MemoryUsage {
    let Ok(pid) = sysinfo::get_current_pid() else {
        return MemoryUsage {
            rss: None,
            virtual_size: None,
        };
    };
    let mut sys = System::new();
    sys.refresh_process(pid);
    let process = sys.process(pid);
    MemoryUsage {
        rss: process.map(|p| p.memory() as f64),
        virtual_size: process.map(|p| p.virtual_memory() as f64),
    }
}
