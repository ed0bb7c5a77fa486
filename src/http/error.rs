//! Mapping of conductor errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::ConductorError;

/// Error returned by API handlers.
#[derive(Debug)]
pub struct ApiError(pub ConductorError);

impl From<ConductorError> for ApiError {
    fn from(err: ConductorError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ConductorError::Locked => StatusCode::LOCKED,
            ConductorError::NothingPending | ConductorError::NotLocked => StatusCode::CONFLICT,
            ConductorError::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ConductorError::InvalidRoute(_) | ConductorError::InvalidChangeSet(_) => {
                StatusCode::BAD_REQUEST
            }
            ConductorError::Proxy { .. } => StatusCode::BAD_GATEWAY,
            ConductorError::Io { .. } | ConductorError::Aborted(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, status = %status, "Request rejected");
        }

        let body = json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
