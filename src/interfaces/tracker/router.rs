use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    routing::{get, post},
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use super::TrackerState;
use super::handlers::{activities, process, system};
use crate::core::activity::ActivityStatus;
use crate::interfaces::http::{permissive_cors, route_not_found, security_headers};

pub fn build_router(state: TrackerState) -> Router {
    let mut app = Router::new()
        .route("/health", get(system::health))
        .route("/status", get(system::status))
        .route(
            "/api/activities",
            get(activities::list_activities)
                .post(activities::create_activity)
                .delete(activities::clear_activities),
        )
        .route(
            "/api/activities/{id}",
            get(activities::get_activity).patch(activities::update_activity),
        )
        .route("/api/process", post(process::process_task))
        .fallback(route_not_found);

    if state.track_requests {
        app = app.layer(middleware::from_fn_with_state(state.clone(), track_request));
    }

    app.layer(middleware::from_fn(security_headers))
        .layer(permissive_cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Record each request as an `http_request` activity, completed with the
/// response status once the handler returns.
async fn track_request(
    State(state): State<TrackerState>,
    req: Request<Body>,
    next: Next,
) -> axum::response::Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let activity = state.tracker.lock().await.log(
        "http_request",
        &format!("{} {}", method, path),
        json!({ "method": method, "path": path, "userAgent": user_agent }),
    );

    let response = next.run(req).await;

    state.tracker.lock().await.update(
        &activity.id,
        ActivityStatus::Completed,
        json!({ "statusCode": response.status().as_u16() }),
    );
    response
}
