use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::files::FileAccessError;
use crate::tail::{FilterError, TailError};

/// Errors returned by the HTTP API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Logged in full; the client only sees a generic message
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self::Internal(format_chain(&err))
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            message,
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<FileAccessError> for ApiError {
    fn from(err: FileAccessError) -> Self {
        match err {
            FileAccessError::NotFound(_) => {
                Self::NotFound("requested file with name could not be located".to_string())
            }
            FileAccessError::NotReadable(_) | FileAccessError::NotRegularFile(_) => Self::Forbidden(
                "requested file does not have sufficient permissions to be read".to_string(),
            ),
            FileAccessError::PathTraversal(name) => {
                Self::BadRequest(format!("invalid file name {:?}", name))
            }
            other @ (FileAccessError::NotADirectory(_) | FileAccessError::Io { .. }) => {
                Self::internal(other)
            }
        }
    }
}

impl From<TailError> for ApiError {
    fn from(err: TailError) -> Self {
        Self::internal(err)
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

/// Render an error with its sources, outermost first
fn format_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
