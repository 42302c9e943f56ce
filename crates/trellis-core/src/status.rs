//! Remote failure classification.
//!
//! Every failed RPC attempt carries a [`Status`]: a category code drawn
//! from a small fixed set, plus the server's detail message. The category
//! decides whether a failure is worth retrying; the default mapping lives
//! here so every policy classifies the same way.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category code attached to a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    /// The operation was aborted, typically after a concurrency conflict.
    Aborted,
    /// The resource the request tried to create already exists.
    AlreadyExists,
    /// The server gave up on the request before finishing it.
    DeadlineExceeded,
    /// The system is not in a state required for the operation.
    FailedPrecondition,
    /// The server hit an internal error.
    Internal,
    /// The request was malformed.
    InvalidArgument,
    /// The named resource does not exist.
    NotFound,
    /// The caller lacks permission for the operation.
    PermissionDenied,
    /// A per-caller quota or server capacity limit was hit.
    ResourceExhausted,
    /// The service is temporarily unavailable.
    Unavailable,
    /// The server does not implement the operation.
    Unimplemented,
    /// The server could not classify the failure.
    Unknown,
}

impl StatusCode {
    /// Whether failures with this code are worth retrying unchanged.
    ///
    /// `Unknown` and `Aborted` count as transient: the remote side gave no
    /// verdict that a retry must fail the same way.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            StatusCode::Unavailable
                | StatusCode::DeadlineExceeded
                | StatusCode::ResourceExhausted
                | StatusCode::Internal
                | StatusCode::Unknown
                | StatusCode::Aborted
        )
    }

    /// Wire name of this code.
    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::Aborted => "ABORTED",
            StatusCode::AlreadyExists => "ALREADY_EXISTS",
            StatusCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            StatusCode::FailedPrecondition => "FAILED_PRECONDITION",
            StatusCode::Internal => "INTERNAL",
            StatusCode::InvalidArgument => "INVALID_ARGUMENT",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::PermissionDenied => "PERMISSION_DENIED",
            StatusCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            StatusCode::Unavailable => "UNAVAILABLE",
            StatusCode::Unimplemented => "UNIMPLEMENTED",
            StatusCode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single remote failure: category code plus server-provided message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Failure category.
    pub code: StatusCode,
    /// Server-provided detail message.
    pub message: String,
}

impl Status {
    /// Create a status from a code and message.
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}
