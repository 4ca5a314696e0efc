use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Body,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::IntoResponse,
};
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

pub(crate) async fn security_headers(req: Request<Body>, next: Next) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    response
}

/// Any origin may call the services; they carry no credentials.
pub(crate) fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

pub(crate) async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Route not found" })),
    )
}

/// Handle to a running HTTP listener.
pub struct BoundServer {
    pub addr: SocketAddr,
    task: JoinHandle<()>,
}

impl BoundServer {
    /// Wait for the listener task to drain after its shutdown token fired.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!("{} server task failed: {}", self.addr, e);
        }
    }
}

/// Bind `addr` and serve `app` until `shutdown` is cancelled. Bind errors are
/// returned so startup can abort.
pub(crate) async fn serve(
    name: &'static str,
    addr: &str,
    app: Router,
    shutdown: CancellationToken,
) -> Result<BoundServer> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("{} could not bind {}", name, addr))?;
    let local = listener.local_addr()?;
    info!("{} running at http://{}", name, local);

    let task = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await;
        if let Err(e) = result {
            error!("{} crashed: {}", name, e);
        }
    });

    Ok(BoundServer { addr: local, task })
}
