//! Test error types.

use rampart_core::ProblemError;
use thiserror::Error;

/// Errors that can occur while building requests or reading responses.
#[derive(Debug, Error)]
pub enum TestError {
    /// Request building failed.
    #[error("Request build error: {0}")]
    RequestBuild(String),

    /// Header name or value is invalid.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Response body reading failed.
    #[error("Body read error: {0}")]
    BodyRead(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The body is not a problem document.
    #[error("Problem error: {0}")]
    Problem(#[from] ProblemError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            TestError::RequestBuild("bad uri".into()).to_string(),
            "Request build error: bad uri"
        );
        assert_eq!(
            TestError::InvalidHeader("x\n".into()).to_string(),
            "Invalid header: x\n"
        );
    }

    #[test]
    fn test_json_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = TestError::from(json_err);
        assert!(std::error::Error::source(&err).is_some());
    }
}
