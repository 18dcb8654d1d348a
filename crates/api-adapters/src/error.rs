//! Domain error → HTTP envelope mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use domains::DomainError;

/// The wire shape of every failed request: a human-readable message plus
/// the stable machine-readable code clients branch on.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn unauthorized(message: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            body: ErrorBody {
                message: message.to_string(),
                error: "NOT_PERMITTED".to_string(),
            },
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let status = match &err {
            DomainError::InvalidInput(_)
            | DomainError::InvalidRating { .. }
            | DomainError::InvalidId(_)
            | DomainError::MissingReason => StatusCode::BAD_REQUEST,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DomainError::InvalidTransition { .. } => StatusCode::CONFLICT,
            DomainError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Storage detail goes to the log, never to the caller.
        let message = match &err {
            DomainError::StoreUnavailable(detail) => {
                error!(%detail, "request failed on storage");
                "the service is temporarily unavailable".to_string()
            }
            other => other.to_string(),
        };
        Self {
            status,
            body: ErrorBody {
                message,
                error: err.code().to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
