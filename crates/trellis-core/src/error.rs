//! Error types shared by the Trellis client crates.

use crate::status::{Status, StatusCode};

/// Convenient alias used throughout the client crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while driving a request to completion.
///
/// The variants split along the lines callers care about: a single remote
/// failure ([`Error::Rpc`]), a budget running out while the failure was
/// still retryable ([`Error::RetriesExhausted`], [`Error::PollingExhausted`]),
/// and teardown racing an in-flight operation
/// ([`Error::CancelledOrShutdown`]).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A remote call failed and no further attempts were made.
    #[error("{0}")]
    Rpc(Status),

    /// The retry budget ran out while the operation was still failing
    /// transiently.
    #[error("retry policy exhausted after {attempts} attempts")]
    RetriesExhausted {
        /// Attempts made before giving up.
        attempts: u32,
        /// The last transient failure observed.
        #[source]
        source: Box<Error>,
    },

    /// The polling budget ran out before a long-running operation
    /// completed.
    #[error("polling policy exhausted after {checks} checks of {operation}")]
    PollingExhausted {
        /// Name of the operation that was being polled.
        operation: String,
        /// Status checks made before giving up.
        checks: u32,
        /// The last transient failure, if the final check failed rather
        /// than reporting the operation still in progress.
        #[source]
        source: Option<Box<Error>>,
    },

    /// The completion queue shut down before the operation finished.
    #[error("operation cancelled: completion queue is shutting down")]
    CancelledOrShutdown,

    /// A resource name did not match the expected format.
    #[error("invalid resource name: {0}")]
    InvalidName(String),

    /// A payload could not be serialized or deserialized.
    #[error("serialization failed")]
    Serialization(#[from] serde_json::Error),

    /// Any error, wrapped with a description of what was being done.
    #[error("{context}")]
    WithContext {
        /// What the client was doing when the error occurred.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an [`Error::Rpc`] from a code and message.
    pub fn rpc(code: StatusCode, message: impl Into<String>) -> Self {
        Error::Rpc(Status::new(code, message))
    }

    /// Wrap this error with a description of the operation in progress.
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The status code of the underlying remote failure, if there is one.
    ///
    /// Unwraps context and exhaustion wrappers until it reaches an
    /// [`Error::Rpc`].
    pub fn code(&self) -> Option<StatusCode> {
        match self {
            Error::Rpc(status) => Some(status.code),
            Error::RetriesExhausted { source, .. } => source.code(),
            Error::PollingExhausted { source, .. } => source.as_deref().and_then(Error::code),
            Error::WithContext { source, .. } => source.code(),
            _ => None,
        }
    }

    /// Whether this is a remote failure that a retry might clear.
    ///
    /// Exhaustion wrappers are not transient even when the failure they
    /// wrap was: the budget is spent.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Rpc(status) => status.code.is_transient(),
            Error::WithContext { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Whether retrying this failure cannot possibly succeed.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Whether the operation was cut short by queue teardown.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::CancelledOrShutdown => true,
            Error::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_transience_follows_status_code() {
        assert!(unavailable().is_transient());
        assert!(not_found().is_permanent());
        assert!(permission_denied().is_permanent());
    }

    #[test]
    fn test_exhaustion_is_not_transient() {
        let exhausted = Error::RetriesExhausted {
            attempts: 3,
            source: Box::new(unavailable()),
        };
        assert!(exhausted.is_permanent());
        assert_eq!(exhausted.code(), Some(StatusCode::Unavailable));
    }

    #[test]
    fn test_context_preserves_classification() {
        let wrapped = unavailable().context("creating table instances/prod/tables/events");
        assert!(wrapped.is_transient());
        assert_eq!(wrapped.code(), Some(StatusCode::Unavailable));
        assert_eq!(
            wrapped.to_string(),
            "creating table instances/prod/tables/events"
        );
    }

    #[test]
    fn test_polling_exhausted_without_source_has_no_code() {
        let exhausted = Error::PollingExhausted {
            operation: "operations/123".to_string(),
            checks: 5,
            source: None,
        };
        assert_eq!(exhausted.code(), None);
        assert!(exhausted.is_permanent());
    }

    #[test]
    fn test_display_includes_attempt_counts() {
        let exhausted = Error::RetriesExhausted {
            attempts: 4,
            source: Box::new(unavailable()),
        };
        assert_eq!(
            exhausted.to_string(),
            "retry policy exhausted after 4 attempts"
        );

        let polling = Error::PollingExhausted {
            operation: "operations/42".to_string(),
            checks: 7,
            source: None,
        };
        assert_eq!(
            polling.to_string(),
            "polling policy exhausted after 7 checks of operations/42"
        );
    }

    #[test]
    fn test_serde_json_errors_convert() {
        let bad: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: Error = bad.unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
        assert_eq!(err.code(), None);
    }
}
