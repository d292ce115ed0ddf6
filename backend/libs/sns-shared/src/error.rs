use aws_sdk_sns::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use resilience::Retryable;
use thiserror::Error;

/// SNS backend error kinds
///
/// Every backend fault lands in exactly one of these so callers can decide
/// on retries without inspecting SDK internals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnsError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authorization failure: {0}")]
    AuthFailure(String),

    #[error("Request throttled: {0}")]
    Throttled(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("SNS error: {0}")]
    Unknown(String),
}

impl SnsError {
    /// Convert an SDK error into an error kind.
    pub fn from_sdk<E, R>(err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        let message = DisplayErrorContext(&err).to_string();
        match &err {
            SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
                SnsError::Transient(message)
            }
            _ => Self::from_code(err.code(), message),
        }
    }

    /// Map an AWS error code onto an error kind.
    pub fn from_code(code: Option<&str>, message: String) -> Self {
        let Some(code) = code else {
            return SnsError::Unknown(message);
        };

        match code {
            "NotFound" | "NotFoundException" | "ResourceNotFound" | "ResourceNotFoundException" => {
                SnsError::NotFound(message)
            }
            "AuthorizationError"
            | "InvalidClientTokenId"
            | "SignatureDoesNotMatch"
            | "ExpiredToken"
            | "UnrecognizedClientException" => SnsError::AuthFailure(message),
            c if c.starts_with("AccessDenied") => SnsError::AuthFailure(message),
            "Throttled" | "KMSThrottling" => SnsError::Throttled(message),
            c if c.starts_with("Throttling") => SnsError::Throttled(message),
            "InternalError" | "InternalFailure" | "ServiceUnavailable" | "RequestTimeout" => {
                SnsError::Transient(message)
            }
            _ => SnsError::Unknown(message),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            SnsError::NotFound(m)
            | SnsError::AuthFailure(m)
            | SnsError::Throttled(m)
            | SnsError::Transient(m)
            | SnsError::Unknown(m) => m,
        }
    }
}

impl Retryable for SnsError {
    fn is_retryable(&self) -> bool {
        matches!(self, SnsError::Throttled(_) | SnsError::Transient(_))
    }
}

/// Configuration errors raised while loading [`crate::SnsConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("SNS_ACCESS_KEY and SNS_SECRET_KEY must be set together")]
    PartialCredentials,

    #[error("Invalid SNS configuration: {0}")]
    Env(#[from] envy::Error),
}
