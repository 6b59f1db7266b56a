//! Error types for the CarePortal session core
//!
//! Pattern adapted from the gateway error enum: one flat crate error with
//! string payloads, plus narrower enums for the storage and token layers that
//! convert into it.

/// Main error type for session core operations
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Meeting error: {0}")]
    Meeting(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Navigation error: {0}")]
    Navigation(String),
}

/// Failures raised by a [`StorageMedium`](crate::storage::StorageMedium)
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("I/O failure: {0}")]
    Io(String),
}

/// Reasons a bearer token fails structural inspection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is empty")]
    Empty,

    #[error("expected 3 dot-delimited segments, found {0}")]
    Segments(usize),

    #[error("payload segment is not valid base64")]
    Encoding,

    #[error("payload is not a valid claims object: {0}")]
    Payload(String),

    #[error("token expired")]
    Expired,
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::AccessDenied(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        Self::Backend(format!("HTTP error: {}", err))
    }
}

impl From<url::ParseError> for PortalError {
    fn from(err: url::ParseError) -> Self {
        Self::Meeting(format!("invalid URL: {}", err))
    }
}

/// Result type alias for session core operations
pub type Result<T> = std::result::Result<T, PortalError>;
