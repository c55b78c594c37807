//! Remote call errors as reported by the caller-supplied call function

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Category of a remote call failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    /// Request timed out
    Timeout,
    /// Remote API rejected the request with a rate limit (429)
    RateLimited,
    /// Transient server-side failure (5xx)
    Server,
    /// Connection reset or refused mid-request
    ConnectionReset,
    /// Other transport-level failure
    Network,
    /// Credentials missing or rejected (401)
    Authentication,
    /// Credentials valid but not allowed (403)
    Authorization,
    /// Malformed request (400)
    InvalidRequest,
    /// Request parameters failed remote validation (422)
    Validation,
    /// Resource does not exist (404)
    NotFound,
    /// Anything the integration layer could not categorize
    Other,
}

impl RemoteErrorKind {
    /// Stable snake_case name, used in log fields and manifests
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::Server => "server",
            Self::ConnectionReset => "connection_reset",
            Self::Network => "network",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::InvalidRequest => "invalid_request",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Other => "other",
        }
    }
}

/// Error returned by a remote call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    /// Failure category, drives retry classification
    pub kind: RemoteErrorKind,
    /// Human readable message
    pub message: String,
    /// HTTP-equivalent status code, if the remote answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Server supplied retry hint in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl RemoteError {
    pub fn new<S: Into<String>>(kind: RemoteErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            retry_after_ms: None,
        }
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::new(RemoteErrorKind::Timeout, message)
    }

    pub fn rate_limited<S: Into<String>>(message: S, retry_after: Option<Duration>) -> Self {
        Self {
            status: Some(429),
            retry_after_ms: retry_after.map(|d| d.as_millis() as u64),
            ..Self::new(RemoteErrorKind::RateLimited, message)
        }
    }

    pub fn server<S: Into<String>>(status: u16, message: S) -> Self {
        Self::new(RemoteErrorKind::Server, message).with_status(status)
    }

    pub fn connection_reset<S: Into<String>>(message: S) -> Self {
        Self::new(RemoteErrorKind::ConnectionReset, message)
    }

    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::new(RemoteErrorKind::Network, message)
    }

    pub fn authentication<S: Into<String>>(message: S) -> Self {
        Self::new(RemoteErrorKind::Authentication, message).with_status(401)
    }

    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::new(RemoteErrorKind::InvalidRequest, message).with_status(400)
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::new(RemoteErrorKind::Validation, message).with_status(422)
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(RemoteErrorKind::NotFound, message).with_status(404)
    }

    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::new(RemoteErrorKind::Other, message)
    }

    /// Map an HTTP-equivalent status code onto an error kind
    pub fn from_status<S: Into<String>>(status: u16, message: S) -> Self {
        let kind = match status {
            400 => RemoteErrorKind::InvalidRequest,
            401 => RemoteErrorKind::Authentication,
            403 => RemoteErrorKind::Authorization,
            404 => RemoteErrorKind::NotFound,
            408 => RemoteErrorKind::Timeout,
            422 => RemoteErrorKind::Validation,
            429 => RemoteErrorKind::RateLimited,
            500..=599 => RemoteErrorKind::Server,
            400..=499 => RemoteErrorKind::InvalidRequest,
            _ => RemoteErrorKind::Other,
        };
        Self::new(kind, message).with_status(status)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after_ms = Some(retry_after.as_millis() as u64);
        self
    }

    /// Server supplied retry hint
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after_ms.map(Duration::from_millis)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({}): {}", self.kind.as_str(), status, self.message),
            None => write!(f, "{}: {}", self.kind.as_str(), self.message),
        }
    }
}

impl std::error::Error for RemoteError {}
