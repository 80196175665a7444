//! HTTP error responses

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use casemail_common::Error;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// [`Error`] rendered as a JSON response with its status code
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::Validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(Error::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = match &self.0 {
            Error::Database(_) | Error::Config(_) | Error::Internal(_) => {
                error!(error = %self.0, "Request failed");
                "Internal server error".to_string()
            }
            other => {
                if status.is_server_error() {
                    error!(error = %other, "Request failed");
                } else {
                    warn!(error = %other, status = status.as_u16(), "Request rejected");
                }
                other.to_string()
            }
        };

        let body = ErrorResponse {
            error: self.0.code().to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
