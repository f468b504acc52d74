use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// Errors from AWS API calls.
///
/// Service errors keep the AWS error code so callers can branch on it the
/// way the provider needs to (`NoSuchTagSet`, `ValidationException`, ...).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{code}: {message}")]
    Service { code: String, message: String },

    #[error("building request: {0}")]
    Build(String),

    #[error("reading response body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("couldn't find resource: {0}")]
    NotFound(String),
}

impl ApiError {
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Convert an SDK error. All service crates re-export the same smithy
    /// error types, so this covers S3, SageMaker and EFS alike.
    pub fn from_sdk<E, R>(err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        match err.code() {
            Some(code) => ApiError::Service {
                code: code.to_string(),
                message: err.message().unwrap_or_default().to_string(),
            },
            None => ApiError::Transport(DisplayErrorContext(&err).to_string()),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// True when the service error code is any of `codes`
    pub fn code_equals(&self, codes: &[&str]) -> bool {
        self.code().is_some_and(|c| codes.contains(&c))
    }

    /// True when the error has `code` and its message contains `needle`
    pub fn message_contains(&self, code: &str, needle: &str) -> bool {
        match self {
            ApiError::Service { code: c, message } => c == code && message.contains(needle),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_helpers() {
        let err = ApiError::service("NoSuchTagSet", "The TagSet does not exist");
        assert!(err.code_equals(&["NoSuchTagSet", "NoSuchTagSetError"]));
        assert!(!err.code_equals(&["NoSuchKey"]));
        assert_eq!(err.to_string(), "NoSuchTagSet: The TagSet does not exist");
    }

    #[test]
    fn message_contains_requires_matching_code() {
        let err = ApiError::service("ValidationException", "No workforce found with name wf");
        assert!(err.message_contains("ValidationException", "No workforce"));
        assert!(!err.message_contains("ResourceNotFound", "No workforce"));
        assert!(!err.message_contains("ValidationException", "throttled"));
        assert!(!ApiError::Transport("timeout".into()).message_contains("ValidationException", ""));
    }
}
