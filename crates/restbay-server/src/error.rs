use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use restbay_store::StoreError;

/// Errors surfaced to HTTP clients.
///
/// Every operation validates preconditions and terminates on the first
/// failure; nothing is retried at this layer. Failure responses carry only a
/// status line (plus `Content-Range` for unsatisfiable ranges) so callers
/// react to the status code alone.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("length required")]
    LengthRequired,

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("range not satisfiable for a body of {total} bytes")]
    RangeNotSatisfiable { total: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias for handler operations.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidName(seg) => Self::BadRequest(format!("invalid segment {seg:?}")),
            StoreError::NotFound => Self::NotFound,
            StoreError::CreateConflict { .. } => Self::Forbidden,
            StoreError::LengthRequired => Self::LengthRequired,
            StoreError::QuotaExceeded { .. } => Self::PayloadTooLarge,
            StoreError::Io(e) => Self::Internal(e.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::LengthRequired => StatusCode::LENGTH_REQUIRED,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(reason) = &self {
            tracing::error!(%reason, "request failed");
        }
        match self {
            Self::RangeNotSatisfiable { total } => (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{total}"))],
            )
                .into_response(),
            other => other.status().into_response(),
        }
    }
}
