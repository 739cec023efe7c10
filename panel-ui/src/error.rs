//! Mapping from panel failures to plain-text HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use panel::PanelError;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<PanelError> for ApiError {
    fn from(err: PanelError) -> Self {
        if err.is_client_error() {
            debug!(error = %err, "rejected request");
        }
        let status = match &err {
            PanelError::Validation(_) => StatusCode::BAD_REQUEST,
            PanelError::Forbidden(_) => StatusCode::FORBIDDEN,
            PanelError::Tool { .. } | PanelError::Timeout { .. } | PanelError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: format!("{err:#}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, error = %self.message, "request failed");
        }
        (self.status, self.message).into_response()
    }
}
