//! Error types for the Exotel API client.
//!
//! # Design
//! Every failure an operation can hit lands in exactly one `ApiError` variant,
//! and `ApiError::kind` folds those variants into the coarse categories callers
//! usually branch on: the network failed, the server answered with a non-2xx
//! status, or the body could not be decoded. Non-2xx responses keep the raw
//! status code and body for debugging.

use thiserror::Error;

/// A specialized `Result` type for Exotel operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by `ExotelApi` and `ExotelClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (DNS, connect, TLS, I/O).
    #[error("transport error: {0}")]
    Transport(#[from] ureq::Error),

    /// The server answered with a status outside 200..=299.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The response body was not valid JSON.
    #[error("deserialization failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// A caller-supplied id is empty, `.` or `..` and cannot name a resource.
    #[error("invalid path segment: {0:?}")]
    InvalidPathSegment(String),

    /// The base URL could not be parsed or cannot carry path segments.
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

/// Coarse failure category of an `ApiError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    HttpStatus,
    Decode,
    Request,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Transport(_) => ErrorKind::Network,
            ApiError::HttpStatus { .. } => ErrorKind::HttpStatus,
            ApiError::Decode(_) => ErrorKind::Decode,
            ApiError::Encode(_) | ApiError::InvalidPathSegment(_) | ApiError::InvalidUrl(_) => {
                ErrorKind::Request
            }
        }
    }

    /// HTTP status code, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
