use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{http::StatusCode, middleware::from_fn, Router};
use runtime::ServerConfig;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

use crate::request_id;

/// Upper bound for any request body; uploads have their own, smaller limit.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Wrap module routes in the HTTP middleware stack.
///
/// Order from outermost to innermost:
/// SetRequestId -> PropagateRequestId -> push_req_id_to_extensions -> Trace -> Timeout -> CORS -> BodyLimit
pub fn build_app(routes: Router, server: &ServerConfig) -> Router {
    let mut router = routes.layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    if server.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    if server.timeout_sec > 0 {
        router = router.layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(server.timeout_sec),
        ));
    }

    let x_request_id = request_id::header();
    router
        .layer(request_id::create_trace_layer())
        .layer(from_fn(request_id::push_req_id_to_extensions))
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId))
}

pub fn bind_addr(server: &ServerConfig) -> Result<SocketAddr> {
    format!("{}:{}", server.host, server.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", server.host, server.port))
}

/// Serve `app` until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(app: Router, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("HTTP server bound on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!(e))
}
