//! HTTP error mapping.
//!
//! Core errors keep their upper-case code prefix in the plain-text body;
//! the status code comes from the variant.

use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};

use retroshelf_core::Error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request body or parameters the handler could not use.
    #[error("BAD_REQUEST: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Core(#[from] Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Core(e) => match e {
                Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                Error::Busy(_) | Error::ThrottleActive { .. } => StatusCode::TOO_MANY_REQUESTS,
                Error::NotFound(_) => StatusCode::NOT_FOUND,
                Error::Io(io) if io.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
                Error::Io(_) | Error::Archive(_) | Error::Download(_) | Error::Store(_) | Error::Task(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Core(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, [(CONTENT_TYPE, "text/plain; charset=utf-8")], self.to_string()).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
