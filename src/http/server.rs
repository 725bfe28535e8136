//! Routing tree assembly and per-connection serving.
//!
//! # Responsibilities
//! - Wrap the embedder's router with idle-reset and access logging
//! - Serve HTTP/1.1 and HTTP/2 on any accepted byte stream
//! - Close connections gracefully when their listener shuts down

use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::io::{AsyncRead, AsyncWrite};
use tower::ServiceExt;
use tower_http::trace::TraceLayer;

use super::middleware::idle_reset_middleware;
use crate::lifecycle::idle::IdleTimer;
use crate::net::listener::ListenerHandle;

/// Routes served when the embedder supplies none.
pub fn default_routes() -> Router {
    Router::new().route("/ping", get(|| async { "pong" }))
}

/// The tree shared by every listener: `router` behind the idle-reset
/// middleware, with request tracing outermost.
pub fn build_routing_tree(router: Router, idle: Arc<IdleTimer>) -> Router {
    router
        .layer(from_fn_with_state(idle, idle_reset_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Serve one connection until it closes or `handle` requests shutdown, in
/// which case in-flight requests finish before the connection closes.
pub async fn serve_connection<I>(io: I, app: Router, handle: Arc<ListenerHandle>)
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = hyper::service::service_fn(move |request: Request<Incoming>| app.clone().oneshot(request));
    let builder = auto::Builder::new(TokioExecutor::new());
    let connection = builder.serve_connection_with_upgrades(TokioIo::new(io), service);
    tokio::pin!(connection);

    tokio::select! {
        result = connection.as_mut() => {
            if let Err(error) = result {
                tracing::debug!(listener = %handle.kind(), error = %error, "Connection error");
            }
        }
        _ = handle.stopped() => {
            connection.as_mut().graceful_shutdown();
            if let Err(error) = connection.await {
                tracing::debug!(listener = %handle.kind(), error = %error, "Connection error during drain");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use std::time::Duration;

    #[tokio::test]
    async fn ping_answers_pong() {
        let idle = Arc::new(IdleTimer::default());
        let app = build_routing_tree(default_routes(), idle);

        let response = app
            .oneshot(axum::http::Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"pong");
    }

    #[tokio::test(start_paused = true)]
    async fn every_request_resets_idle_deadline() {
        let idle = Arc::new(IdleTimer::new(Duration::from_millis(100)));
        let fired = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        idle.arm(move || flag.store(true, std::sync::atomic::Ordering::SeqCst));
        let app = build_routing_tree(default_routes(), Arc::clone(&idle));

        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(70)).await;
            let request = axum::http::Request::get("/missing").body(Body::empty()).unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
        assert!(!fired.load(std::sync::atomic::Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(fired.load(std::sync::atomic::Ordering::SeqCst));
    }
}
