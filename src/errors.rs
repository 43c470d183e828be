use thiserror::Error;
use warp::http::StatusCode;

use crate::api::types::ApiError;

/// Errors surfaced to HTTP callers.
///
/// Only failures of the primary data source and request validation end up here.
/// Auxiliary store failures are absorbed by [`crate::access::DataAccess`].
#[derive(Error, Debug)]
pub enum TriageError {
    /// Profiling backend unreachable or returned non-2xx
    #[error("{0}")]
    Backend(#[from] ApiError),

    /// Unknown profile category string
    #[error("Unknown profile type: {0}. Valid: cpu, alloc, lock, wall")]
    InvalidProfileType(String),

    /// Malformed or missing request parameter
    #[error("{0}")]
    BadRequest(String),
}

impl TriageError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TriageError::Backend(_) => StatusCode::BAD_GATEWAY,
            TriageError::InvalidProfileType(_) | TriageError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let backend = TriageError::Backend(ApiError::Http {
            status: 500,
            body: "boom".to_string(),
        });
        assert_eq!(backend.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            TriageError::InvalidProfileType("heap".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TriageError::BadRequest("missing".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_invalid_profile_type_message() {
        let err = TriageError::InvalidProfileType("heap".to_string());
        assert_eq!(err.to_string(), "Unknown profile type: heap. Valid: cpu, alloc, lock, wall");
    }
}
