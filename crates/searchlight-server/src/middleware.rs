//! Request logging middleware.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, info, warn};

use crate::routes::mcp::SESSION_ID_HEADER;
use crate::state::AppState;

/// How loudly a finished request is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Health probes; only visible with `--verbose`.
    Probe,
    Ok,
    Rejected,
    Failed,
}

impl Outcome {
    fn classify(path: &str, status: StatusCode) -> Self {
        if status.is_server_error() {
            Outcome::Failed
        } else if status.is_client_error() {
            Outcome::Rejected
        } else if path == "/health" {
            Outcome::Probe
        } else {
            Outcome::Ok
        }
    }
}

/// Logs method, path, session id, status and duration of every request.
///
/// For `GET /mcp` the duration is the time until the notification stream
/// opened, not its lifetime.
pub async fn request_logging_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.request_logging {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let session_id = request
        .headers()
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let started = Instant::now();
    let response = next.run(request).await;
    let duration_ms = started.elapsed().as_millis() as u64;
    let status = response.status().as_u16();
    let session_id = session_id.as_deref().unwrap_or("-");

    match Outcome::classify(&path, response.status()) {
        Outcome::Probe => debug!(%method, %path, status, duration_ms, "Health check"),
        Outcome::Ok => info!(%method, %path, session_id, status, duration_ms, "Request completed"),
        Outcome::Rejected => {
            warn!(%method, %path, session_id, status, duration_ms, "Request rejected")
        }
        Outcome::Failed => {
            error!(%method, %path, session_id, status, duration_ms, "Request failed")
        }
    }

    response
}
