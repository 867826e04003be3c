//! Mapping of service failures to HTTP responses.

use crate::metrics::MetricsError;
use crate::trng::{TrngError, ValidationError};
use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// Non-standard status: generation requested before a successful init.
pub const STATUS_NOT_READY: u16 = 432;

/// Non-standard status: the self-test did not finish in time.
pub const STATUS_INIT_TIMEOUT: u16 = 555;

/// Body of every facade response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Description {
    pub description: String,
}

impl Description {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// Everything a handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{}", .0.body_text())]
    Query(#[from] QueryRejection),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Trng(#[from] TrngError),
    #[error("failed to encode metrics: {0}")]
    Metrics(#[from] MetricsError),
}

impl ApiError {
    /// Status code for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Query(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Trng(error) => match error {
                TrngError::NotReady => custom(STATUS_NOT_READY),
                TrngError::AlreadyRunning | TrngError::AlreadyStandby => StatusCode::CONFLICT,
                TrngError::InitTimeout(_) => custom(STATUS_INIT_TIMEOUT),
                TrngError::HardwareFailure(_) | TrngError::GenerationError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Metrics(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn custom(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(Description::new(self.to_string()))).into_response()
    }
}
