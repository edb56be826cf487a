//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use hostexec_core::{ExecError, StatusClass};
use serde::Serialize;

/// JSON body returned for every failed request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Short, stable description of what failed.
    pub message: String,
    /// Underlying cause.
    pub details: String,
}

/// An error ready to be rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    /// Create an error with an explicit status.
    pub fn new(status: StatusCode, message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                message: message.into(),
                details: details.into(),
            },
        }
    }

    /// 400 with the given message.
    pub fn bad_request(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, details)
    }

    /// HTTP status of the response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response body.
    pub fn body(&self) -> &ErrorBody {
        &self.body
    }
}

impl From<ExecError> for ApiError {
    fn from(err: ExecError) -> Self {
        let details = err.to_string();
        let (status, message) = match &err {
            ExecError::Validation(_) => (StatusCode::BAD_REQUEST, "Invalid request payload".to_string()),
            ExecError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "Unable to find an endpoint with the specified identifier".to_string(),
            ),
            ExecError::Lookup(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unable to find an endpoint with the specified identifier".to_string(),
            ),
            ExecError::AccessDenied { .. } => (
                StatusCode::FORBIDDEN,
                "Permission denied to access endpoint".to_string(),
            ),
            ExecError::InvalidConfig(_) | ExecError::Connection { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Command exec error".to_string(),
            ),
            ExecError::Runtime { stage, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Command exec ({stage}) error"),
            ),
        };
        debug_assert_eq!(
            status.is_client_error(),
            err.status_class() == StatusClass::ClientError
        );
        Self::new(status, message, details)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, message = %self.body.message, details = %self.body.details, "Request failed");
        } else {
            tracing::debug!(status = %self.status, message = %self.body.message, details = %self.body.details, "Request rejected");
        }
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostexec_core::Stage;
    use hostexec_runtime::{EndpointId, RuntimeError};

    #[test]
    fn test_stage_in_message() {
        let err: ApiError = ExecError::runtime(Stage::Inject, RuntimeError::Other("boom".into())).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body().message, "Command exec (inject) error");
        assert!(err.body().details.contains("boom"));
    }

    #[test]
    fn test_client_errors() {
        let err: ApiError = ExecError::NotFound(EndpointId::new(9)).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = ExecError::access_denied(EndpointId::new(9), "unknown token").into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.body().message, "Permission denied to access endpoint");
        assert!(err.body().details.contains("unknown token"));

        let err: ApiError = ExecError::Validation("empty".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_lookup_failure_is_server_error() {
        let err: ApiError = ExecError::Lookup("db down".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_body_serialization() {
        let body = ApiError::bad_request("Invalid request payload", "missing Script").body;
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["message"], "Invalid request payload");
        assert_eq!(json["details"], "missing Script");
    }
}
