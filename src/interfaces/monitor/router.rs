use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

use super::MonitorState;
use super::handlers::{board, ws};
use crate::interfaces::http::{permissive_cors, route_not_found, security_headers};

pub fn build_router(state: MonitorState) -> Router {
    Router::new()
        .route("/health", get(board::health))
        .route("/api/activities", get(board::list_activities))
        .route("/api/columns", get(board::columns))
        .route("/api/kanban", get(board::kanban))
        .route("/api/stats", get(board::stats))
        .route("/api/metrics", get(board::metrics))
        .route("/ws", get(ws::ws_handler))
        .fallback(route_not_found)
        .layer(middleware::from_fn(security_headers))
        .layer(permissive_cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::activity::format_timestamp;
    use crate::core::mirror::{MirrorStore, MirroredActivity, PollBatch};
    use crate::core::monitor::Notifier;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tokio_util::sync::CancellationToken;
    use tower::util::ServiceExt;

    fn test_state() -> MonitorState {
        MonitorState {
            store: MirrorStore::open_in_memory().unwrap(),
            notifier: Notifier::default(),
            shutdown: CancellationToken::new(),
        }
    }

    fn row(id: &str, status: &str, position: i64, minutes_ago: i64) -> MirroredActivity {
        let at = format_timestamp(chrono::Utc::now() - chrono::Duration::minutes(minutes_ago));
        MirroredActivity {
            id: id.to_string(),
            kind: "test".to_string(),
            description: "d".to_string(),
            metadata: json!({}),
            status: status.to_string(),
            timestamp: at.clone(),
            completed_at: None,
            result: None,
            column_position: position,
            synced_at: at,
        }
    }

    async fn seeded_state() -> MonitorState {
        let state = test_state();
        state
            .store
            .apply_poll(&PollBatch {
                polled_at: format_timestamp(chrono::Utc::now()),
                activities: vec![
                    row("a", "running", 1, 3),
                    row("b", "completed", 2, 2),
                    row("c", "failed", 3, 1),
                ],
                metrics: vec![("activities_total".to_string(), 3.0)],
            })
            .await
            .unwrap();
        state
    }

    async fn get_json(app: Router, path: &str) -> (StatusCode, Value) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body_bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));
        (status, json)
    }

    #[tokio::test]
    async fn health_is_served_without_a_store_read() {
        let (status, body) = get_json(build_router(test_state()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn activities_are_listed_newest_first() {
        let app = build_router(seeded_state().await);

        let (_, body) = get_json(app.clone(), "/api/activities").await;
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 3);
        assert_eq!(body["activities"][0]["id"], "c");
        assert_eq!(body["activities"][0]["columnPosition"], 3);

        let (_, body) = get_json(app.clone(), "/api/activities?status=completed").await;
        assert_eq!(body["count"], 1);

        let (_, body) = get_json(app, "/api/activities?limit=1").await;
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn board_views() {
        let app = build_router(seeded_state().await);

        let (_, body) = get_json(app.clone(), "/api/columns").await;
        assert_eq!(body["columns"].as_array().unwrap().len(), 4);
        assert_eq!(body["columns"][3]["color"], "#ef4444");

        let (_, body) = get_json(app.clone(), "/api/kanban").await;
        assert_eq!(body["kanban"][1]["activities"][0]["id"], "a");
        assert_eq!(body["kanban"][0]["activities"], json!([]));

        let (_, body) = get_json(app.clone(), "/api/stats").await;
        assert_eq!(body["stats"]["total"], 3);
        assert_eq!(body["stats"]["byStatus"]["failed"], 1);
        assert_eq!(body["stats"]["metrics"]["activities_total"], 3.0);

        let (_, body) = get_json(app.clone(), "/api/metrics?hours=junk").await;
        assert_eq!(body["hours"], 24);
        assert_eq!(body["count"], 1);
        assert_eq!(body["metrics"][0]["metricName"], "activities_total");
    }

    #[tokio::test]
    async fn huge_metrics_window_still_answers() {
        let app = build_router(seeded_state().await);
        let (status, body) = get_json(app, "/api/metrics?hours=4000000000").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hours"], 4_000_000_000u32);
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn closed_store_yields_500() {
        let state = test_state();
        state.store.close().await.unwrap();
        let (status, body) = get_json(build_router(state), "/api/stats").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (status, body) = get_json(build_router(test_state()), "/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Route not found");
    }
}
