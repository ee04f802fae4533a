//! Decision Oracle errors.

use thiserror::Error;

/// Failure of a language-model call.
///
/// When raised by the Decision Oracle this is a planning failure and is
/// fatal for the run.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Oracle returned empty content")]
    EmptyResponse,

    #[error("Malformed oracle response: {0}")]
    Malformed(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_response() {
        let err = OracleError::EmptyResponse;
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_malformed() {
        let err = OracleError::Malformed("expected value at line 1".to_string());
        assert!(err.to_string().contains("Malformed"));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_api_error() {
        let err = OracleError::Api {
            status: 429,
            message: "slow down".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("429"));
        assert!(display.contains("slow down"));
    }
}
