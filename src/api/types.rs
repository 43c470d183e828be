use serde::Deserialize;
use thiserror::Error;

/// Profiling backend error types
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Profiling backend error ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout error: {0}")]
    Timeout(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Configuration for the profiling backend client
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    /// Connect timeout per outbound call
    pub connect_timeout_seconds: u64,
    /// Overall timeout per outbound call
    pub request_timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4040".to_string(),
            connect_timeout_seconds: 5,
            request_timeout_seconds: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_config_default() {
        let config = BackendConfig::default();
        assert_eq!(config.base_url, "http://localhost:4040");
        assert_eq!(config.connect_timeout_seconds, 5);
        assert_eq!(config.request_timeout_seconds, 30);
    }

    #[test]
    fn test_http_error_display() {
        let err = ApiError::Http { status: 503, body: "unavailable".to_string() };
        assert_eq!(err.to_string(), "Profiling backend error (503): unavailable");
    }
}
