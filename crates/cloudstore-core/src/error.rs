//! Error types for Cloudstore

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Lookup Errors
    #[error("The specified bucket does not exist: {0}")]
    NoSuchBucket(String),

    #[error("The specified key does not exist: {0}")]
    NoSuchKey(String),

    // Access Errors
    #[error("Access Denied: {0}")]
    AccessDenied(String),

    // Request Errors
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Service / Network Errors
    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse failure category callers branch on for retry and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    Transient,
    MalformedRequest,
    Unknown,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoSuchBucket(_) | Error::NoSuchKey(_) => ErrorKind::NotFound,
            Error::AccessDenied(_) => ErrorKind::PermissionDenied,
            Error::MalformedRequest(_) | Error::InvalidConfig(_) => ErrorKind::MalformedRequest,
            Error::Transient(_) => ErrorKind::Transient,
            Error::Unknown(_) | Error::Other(_) => ErrorKind::Unknown,
        }
    }

    /// Whether repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::NoSuchBucket(_) => "NoSuchBucket",
            Error::NoSuchKey(_) => "NoSuchKey",
            Error::AccessDenied(_) => "AccessDenied",
            Error::MalformedRequest(_) => "InvalidRequest",
            Error::InvalidConfig(_) => "InvalidArgument",
            Error::Transient(_) => "ServiceUnavailable",
            Error::Unknown(_) | Error::Other(_) => "InternalError",
        }
    }

    /// Classify a service error response.
    ///
    /// The S3 error code wins when it is one we recognise; otherwise the
    /// HTTP status decides. `key` is `None` for bucket-level calls, which
    /// turns a bare 404 into `NoSuchBucket`.
    pub fn from_service(
        status: u16,
        code: Option<&str>,
        message: Option<&str>,
        bucket: &str,
        key: Option<&str>,
    ) -> Self {
        let detail = match (code, message) {
            (Some(c), Some(m)) => format!("{} ({}): {}", c, status, m),
            (Some(c), None) => format!("{} ({})", c, status),
            (None, Some(m)) => format!("HTTP {}: {}", status, m),
            (None, None) => format!("HTTP {}", status),
        };

        match code {
            // A missing key only makes sense when the call named one
            Some("NoSuchKey") => {
                return match key {
                    Some(k) => Error::NoSuchKey(k.to_string()),
                    None => Error::Unknown(detail),
                }
            }
            Some("NoSuchBucket") => return Error::NoSuchBucket(bucket.to_string()),
            Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch") => {
                return Error::AccessDenied(detail)
            }
            Some("SlowDown" | "ServiceUnavailable" | "InternalError" | "RequestTimeout") => {
                return Error::Transient(detail)
            }
            _ => {}
        }

        match status {
            404 => match key {
                Some(k) => Error::NoSuchKey(k.to_string()),
                None => Error::NoSuchBucket(bucket.to_string()),
            },
            401 | 403 => Error::AccessDenied(detail),
            408 | 429 => Error::Transient(detail),
            400..=499 => Error::MalformedRequest(detail),
            500..=599 => Error::Transient(detail),
            _ => Error::Unknown(detail),
        }
    }
}
