//! Error types for the list controller.
//!
//! This module defines the centralized error type [`ListError`] and a type
//! alias [`Result`] used throughout the crate, plus the two structured
//! failure types that cross the port boundaries: [`RequestFailure`] (request
//! port rejected) and [`PersistenceError`] (persistence backend failed).
//! All errors are implemented with the `thiserror` crate.
//!
//! # Error flow
//!
//! - A `RequestFailure` is recorded in controller state for observers *and*
//!   propagated to the caller of the triggering handler as
//!   `ListError::Request`. It is never silently dropped.
//! - A `PersistenceError` never escapes the controller: a failed read is
//!   treated as "no saved state", a failed write is logged. Implementations
//!   of [`PersistencePort`](crate::ports::PersistencePort) still return it
//!   so they can be tested directly.
//! - `ListError::Config` is fatal and raised at mount time.

use serde_json::Value;
use thiserror::Error;

/// A failure reported by the request port.
///
/// Carries a human-readable message, an optional transport status code and
/// an opaque detail payload for host-specific error bodies. Stored in
/// controller state after a failed fetch so presentation observers can
/// render it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct RequestFailure {
    /// Human-readable description of the failure.
    pub message: String,

    /// Transport status code, when the port has one (e.g. HTTP status).
    pub status: Option<u16>,

    /// Opaque failure payload passed through from the port.
    pub detail: Value,
}

impl RequestFailure {
    /// Creates a failure with a message and no status or detail.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            detail: Value::Null,
        }
    }

    /// Creates a failure with a message and transport status code.
    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
            detail: Value::Null,
        }
    }
}

/// A failure inside a persistence backend.
///
/// Returned by [`PersistencePort`](crate::ports::PersistencePort)
/// implementations. The controller swallows these (read failures become
/// cache misses, write failures are logged at warn), so the error only
/// surfaces through the port's own API.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading or writing the backing store failed.
    #[error("persistence I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be serialized or deserialized.
    #[error("persistence codec error: {0}")]
    Codec(String),
}

/// The main error type for list controller operations.
#[derive(Debug, Error)]
pub enum ListError {
    /// The request port rejected a fetch.
    ///
    /// Also recorded in controller state; returned so host code can log or
    /// escalate at the call site.
    #[error("request failed: {0}")]
    Request(RequestFailure),

    /// The list configuration is invalid.
    ///
    /// Raised at mount time for an empty endpoint, a zero `per_page` or a
    /// zero initial page. Fatal: the controller is not constructed.
    #[error("configuration error: {0}")]
    Config(String),
}

/// A specialized `Result` type for list controller operations.
pub type Result<T> = std::result::Result<T, ListError>;
