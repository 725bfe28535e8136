//! Idle-timer reset middleware.

use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

use crate::lifecycle::idle::IdleTimer;
use crate::observability::metrics;

/// Push the idle deadline forward before the request is handled.
pub async fn idle_reset_middleware(
    State(idle): State<Arc<IdleTimer>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    idle.reset();
    metrics::record_idle_reset();
    next.run(request).await
}
