use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lens::LensError;
use serde::Serialize;
use std::fmt;
use tracing::error;

/// Errors surfaced to HTTP clients. Bodies are `{"detail": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    BadGateway(String),
    GatewayTimeout(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> &str {
        match self {
            Self::BadRequest(msg)
            | Self::Unauthorized(msg)
            | Self::NotFound(msg)
            | Self::BadGateway(msg)
            | Self::GatewayTimeout(msg)
            | Self::Internal(msg) => msg,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.detail(), self.status_code())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = %status, "Request failed: {}", self.detail());
        }
        let body = Json(ErrorBody {
            detail: self.detail().to_string(),
        });
        (status, body).into_response()
    }
}

impl From<LensError> for ApiError {
    fn from(e: LensError) -> Self {
        match e {
            LensError::BadRequest(msg) => Self::BadRequest(msg),
            LensError::Unauthorized => Self::Unauthorized(e.to_string()),
            LensError::NotFound => Self::NotFound(e.to_string()),
            LensError::UpstreamServer
            | LensError::ServiceUnavailable
            | LensError::InvalidResponse(_)
            | LensError::Http(_) => Self::BadGateway(e.to_string()),
            LensError::Timeout => Self::GatewayTimeout(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}
