use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use cpumon_core::MonitorError;
use serde::Serialize;
use tracing::{error, warn};

/// Message returned for every failure that is not the caller's fault.
pub const GENERIC_FAILURE: &str = "unexpected error, please try again";

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

/// Handler error: wraps [`MonitorError`] and maps it to a status code.
#[derive(Debug)]
pub struct ApiError(pub MonitorError);

impl From<MonitorError> for ApiError {
    fn from(e: MonitorError) -> Self {
        Self(e)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(MonitorError::MalformedInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = if self.0.is_client_error() {
            warn!("Rejected request: {}", self.0);
            (StatusCode::BAD_REQUEST, self.0.to_string())
        } else {
            error!("Request failed: {}", self.0);
            (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE.to_string())
        };

        let body = ErrorResponse {
            error: message,
            code:  status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
