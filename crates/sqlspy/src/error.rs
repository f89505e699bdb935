//! Error types for sqlspy

use crate::listener::{EventKind, ListenerId};
use thiserror::Error;

/// Result type alias for sqlspy operations
pub type SpyResult<T> = Result<T, SpyError>;

/// Result type returned by [`EventListener`](crate::EventListener) methods
pub type ListenerResult<T> = Result<T, ListenerError>;

/// Top-level error returned by the dispatcher and snapshot helpers
#[derive(Debug, Error)]
pub enum SpyError {
    /// A listener failed on a fail-fast event; delivery stopped at that listener
    #[error(transparent)]
    Listener(#[from] ListenerFailure),

    /// One or more listeners failed on a notification event; every listener was still called
    #[error(transparent)]
    Dispatch(#[from] DispatchErrors),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SpyError {
    /// Check if this is a collected notification failure
    pub fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }

    /// Check if this is a fail-fast listener failure
    pub fn is_listener(&self) -> bool {
        matches!(self, Self::Listener(_))
    }

    /// All listener failures carried by this error, in delivery order.
    pub fn listener_failures(&self) -> &[ListenerFailure] {
        match self {
            Self::Listener(failure) => std::slice::from_ref(failure),
            Self::Dispatch(errors) => errors.failures(),
            Self::Serialization(_) => &[],
        }
    }
}

/// Error raised by a single listener
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The listener vetoed the operation
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The listener could not process the event
    #[error("{0}")]
    Failed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ListenerError {
    /// Create a rejection error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Create a generic failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Check if this is a rejection
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// A listener error tagged with the listener and event it came from.
#[derive(Debug, Error)]
#[error("listener {listener} failed on {event}: {source}")]
pub struct ListenerFailure {
    /// Listener that failed.
    pub listener: ListenerId,
    /// Event being delivered.
    pub event: EventKind,
    /// The listener's own error.
    #[source]
    pub source: ListenerError,
}

/// Failures collected while delivering a notification event to every listener.
#[derive(Debug, Error)]
#[error("{} listener(s) failed during dispatch", .failures.len())]
pub struct DispatchErrors {
    failures: Vec<ListenerFailure>,
}

impl DispatchErrors {
    pub(crate) fn new(failures: Vec<ListenerFailure>) -> Self {
        Self { failures }
    }

    /// Failures in delivery order.
    pub fn failures(&self) -> &[ListenerFailure] {
        &self.failures
    }

    /// Consume and return the failures.
    pub fn into_failures(self) -> Vec<ListenerFailure> {
        self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Failure reported by the driver for the instrumented call.
///
/// After-events carry `Option<&DbError>`: `None` means the driver call succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DbError {
    /// Driver error message.
    pub message: String,
    /// Five-character SQLSTATE, when the driver reported one.
    pub sql_state: Option<String>,
    /// Vendor-specific error code.
    pub vendor_code: Option<i32>,
}

impl DbError {
    /// Create a driver error with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sql_state: None,
            vendor_code: None,
        }
    }

    /// Attach a SQLSTATE code
    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }

    /// Attach a vendor error code
    pub fn with_vendor_code(mut self, code: i32) -> Self {
        self.vendor_code = Some(code);
        self
    }
}
