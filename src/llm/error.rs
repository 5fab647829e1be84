//! Failures of a single LLM call

use thiserror::Error;

/// Why a chat call produced no usable text.
///
/// Every variant is recoverable for a run: the evaluation task that hit it
/// is recorded as failed and its practices are retried on the next run.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("API error{}: {message}", status_suffix(.status_code))]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Request timed out after {seconds} seconds")]
    TimeoutError { seconds: u64 },

    #[error("Rate limit exceeded{}", retry_suffix(.retry_after))]
    RateLimitError { retry_after: Option<u64> },

    /// Missing API key, rejected credentials, unknown model
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Error: {message}")]
    Other { message: String },
}

fn status_suffix(code: &Option<u16>) -> String {
    code.map(|c| format!(" ({})", c)).unwrap_or_default()
}

fn retry_suffix(seconds: &Option<u64>) -> String {
    seconds
        .map(|s| format!(", retry after {} seconds", s))
        .unwrap_or_default()
}

impl BackendError {
    /// Failures that may clear up on their own before the next run
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::TimeoutError { .. }
                | BackendError::RateLimitError { .. }
                | BackendError::NetworkError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_status_code() {
        let err = BackendError::ApiError {
            message: "bad gateway".to_string(),
            status_code: Some(502),
        };
        assert_eq!(err.to_string(), "API error (502): bad gateway");

        let err = BackendError::ApiError {
            message: "bad gateway".to_string(),
            status_code: None,
        };
        assert_eq!(err.to_string(), "API error: bad gateway");
    }

    #[test]
    fn test_display_rate_limit() {
        let err = BackendError::RateLimitError {
            retry_after: Some(20),
        };
        assert_eq!(err.to_string(), "Rate limit exceeded, retry after 20 seconds");
        let err = BackendError::RateLimitError { retry_after: None };
        assert_eq!(err.to_string(), "Rate limit exceeded");
    }

    #[test]
    fn test_transient_failures() {
        assert!(BackendError::TimeoutError { seconds: 30 }.is_transient());
        assert!(!BackendError::ConfigurationError {
            message: "missing OPENAI_API_KEY".to_string()
        }
        .is_transient());
    }
}
