//! Text-generation error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while calling a text-generation provider
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}: {message}")]
    RateLimited {
        retry_after: Duration,
        message: String,
    },

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<LlmError> },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Check if this is a rate limit error
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }

    /// Server-side or connection failures that may succeed on a later call: 5xx responses and
    /// network timeouts or refused connections.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::ApiError { status, .. } => (500..600).contains(status),
            LlmError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Get the retry duration if this is a rate limit error
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_rate_limit() {
        let err = LlmError::RateLimited {
            retry_after: Duration::from_secs(5),
            message: "slow down".to_string(),
        };
        assert!(err.is_rate_limit());

        let err = LlmError::ApiError {
            status: 500,
            message: "Server error".to_string(),
        };
        assert!(!err.is_rate_limit());
    }

    #[test]
    fn test_is_transient() {
        for status in [500, 502, 503] {
            let err = LlmError::ApiError {
                status,
                message: "upstream".to_string(),
            };
            assert!(err.is_transient(), "{status} should be transient");
        }
        for status in [400, 401, 404] {
            let err = LlmError::ApiError {
                status,
                message: "client".to_string(),
            };
            assert!(!err.is_transient(), "{status} should not be transient");
        }
        assert!(!LlmError::InvalidResponse("no choices".to_string()).is_transient());
        let rate_limited = LlmError::RateLimited {
            retry_after: Duration::from_secs(1),
            message: String::new(),
        };
        assert!(!rate_limited.is_transient());
    }

    #[test]
    fn test_retry_after() {
        let err = LlmError::RateLimited {
            retry_after: Duration::from_millis(9740),
            message: String::new(),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_millis(9740)));

        assert_eq!(
            LlmError::InvalidResponse("no choices".to_string()).retry_after(),
            None
        );
    }

    #[test]
    fn test_exhausted_keeps_last_error() {
        let err = LlmError::RetriesExhausted {
            attempts: 3,
            last: Box::new(LlmError::RateLimited {
                retry_after: Duration::from_secs(1),
                message: "try again in 0.5s".to_string(),
            }),
        };
        let text = err.to_string();
        assert!(text.contains("3 attempts"));
        assert!(text.contains("try again in 0.5s"));
    }
}
