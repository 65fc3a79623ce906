//! Ingestion error types

use http::StatusCode;
use thiserror::Error;

/// Reasons an inbound event is rejected
#[derive(Debug, Error)]
pub enum IngestError {
    /// No bucket with this slug
    #[error("bucket '{slug}' not found")]
    NotFound { slug: String },

    /// Body is not a JSON object
    #[error("invalid request body: {message}")]
    BadRequest { message: String },

    /// Bearer token missing or wrong
    #[error("unauthorized")]
    Unauthorized,

    /// Store or serialization failure
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl IngestError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status the caller receives
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the caller
    ///
    /// Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal { .. } => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
