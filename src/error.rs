//! Error types for extraction internals and the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

use crate::schema::ErrorBody;

/// Failure inside a single format extractor.
///
/// Never leaves the dispatch layer: `extractors::extract` turns every variant
/// into a zero-confidence `ExtractionResult`.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("not a valid OOXML container: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("required part missing: {0}")]
    MissingPart(String),

    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("completion failed: {0}")]
    Completion(#[from] anyhow::Error),

    #[error("completion timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Errors surfaced to HTTP clients.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    Internal { message: String, details: String },
}

impl ApiError {
    pub fn internal(message: impl Into<String>, details: impl ToString) -> Self {
        Self::Internal {
            message: message.into(),
            details: details.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorBody::new(msg)),
            ApiError::Internal { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new(message).with_details(details),
            ),
        };

        (status, Json(body)).into_response()
    }
}
