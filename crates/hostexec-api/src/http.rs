//! HTTP transport.
//!
//! ## Endpoints
//!
//! - `POST /api/endpoints/:id/command` - run the uploaded `Script` file on an endpoint
//! - `GET /health` - Health check

use crate::error::ApiError;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use hostexec_core::{ExecRequest, Executor, Principal, ScriptPayload};
use hostexec_runtime::EndpointId;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Multipart form field carrying the script.
pub const SCRIPT_FIELD: &str = "Script";

/// Room for multipart boundaries and part headers on top of the script itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    executor: Arc<Executor>,
    max_script_bytes: usize,
}

impl AppState {
    /// Create handler state.
    pub fn new(executor: Arc<Executor>, max_script_bytes: usize) -> Self {
        Self {
            executor,
            max_script_bytes,
        }
    }
}

/// Build the HTTP router.
///
/// The returned router can be served directly with axum or composed
/// into a larger application.
pub fn build_router(state: AppState) -> Router {
    tracing::debug!("Building HTTP router");

    let body_limit = state.max_script_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/endpoints/:id/command", post(command_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    tracing::trace!("Health check request");
    Json(serde_json::json!({
        "status": "healthy",
        "service": "hostexec-api"
    }))
}

/// Run an uploaded script on an endpoint.
///
/// Responds `204 No Content` once the script container has started; the
/// script's own outcome is not awaited.
async fn command_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<StatusCode, ApiError> {
    let endpoint_id: EndpointId = id.parse().map_err(|e: std::num::ParseIntError| {
        ApiError::bad_request("Invalid endpoint identifier route variable", e.to_string())
    })?;
    let multipart = multipart
        .map_err(|e| ApiError::bad_request("Invalid request payload", e.body_text()))?;

    let script = read_script(multipart, state.max_script_bytes).await?;
    let principal = principal_from_headers(&headers);

    let report = state
        .executor
        .execute(ExecRequest::new(endpoint_id, script, principal))
        .await?;

    tracing::info!(
        execution_id = %report.execution_id,
        endpoint_id = %report.endpoint_id,
        container_id = %report.container,
        "Command accepted"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Pull the `Script` file out of the form.
async fn read_script(mut multipart: Multipart, max_bytes: usize) -> Result<ScriptPayload, ApiError> {
    let invalid = |details: String| ApiError::bad_request("Invalid request payload", details);
    let unreadable =
        |e: MultipartError| invalid(format!("Invalid Script file. Ensure that the file is uploaded correctly: {e}"));

    while let Some(field) = multipart.next_field().await.map_err(unreadable)? {
        if field.name() != Some(SCRIPT_FIELD) {
            continue;
        }

        let content = field.bytes().await.map_err(unreadable)?;
        if content.is_empty() {
            return Err(invalid("Script file is empty".to_string()));
        }
        if content.len() > max_bytes {
            return Err(invalid(format!(
                "Script file is {} bytes, limit is {max_bytes}",
                content.len()
            )));
        }
        return Ok(ScriptPayload::new(content));
    }

    Err(invalid(format!("Missing {SCRIPT_FIELD} file in form")))
}

/// `Authorization: Bearer <token>` or anonymous.
fn principal_from_headers(headers: &HeaderMap) -> Principal {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| Principal::Token(token.to_string()))
        .unwrap_or(Principal::Anonymous)
}

/// Start the HTTP server.
///
/// This function runs until the server is shut down via the provided
/// shutdown signal.
pub async fn serve(
    state: AppState,
    addr: std::net::SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let router = build_router(state);

    tracing::info!(%addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::debug!(%addr, "TCP listener bound");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_principal_from_bearer() {
        let mut headers = HeaderMap::new();
        assert_eq!(principal_from_headers(&headers), Principal::Anonymous);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer ops"));
        assert_eq!(
            principal_from_headers(&headers),
            Principal::Token("ops".to_string())
        );

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic b3BzOm9wcw=="));
        assert_eq!(principal_from_headers(&headers), Principal::Anonymous);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(principal_from_headers(&headers), Principal::Anonymous);
    }
}
