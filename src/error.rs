//! Errors surfaced by drivers and by the tracing shim itself.

use thiserror::Error;

/// Result alias used across every capability trait.
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors raised by a driver or by driver resolution.
///
/// Delegate errors pass through the traced wrappers untouched, so a caller
/// sees exactly the value the underlying driver produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The database rejected an operation.
    #[error("{message}")]
    Database {
        sql_state: Option<String>,
        message: String,
    },

    /// The object was used after `close()`.
    #[error("{0} is closed")]
    Closed(&'static str),

    /// No registered driver accepts the connection string.
    #[error("No suitable driver found for {url}")]
    NoSuitableDriver { url: String },

    /// An explicitly requested driver could not be loaded.
    #[error("failed to load driver {class} from {path}: {reason}")]
    DriverLoad {
        class: String,
        path: String,
        reason: String,
    },

    /// The connection string is malformed or lacks the expected prefix.
    #[error("invalid connection string {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The operation is not part of the capability set of the object.
    #[error("{capability} does not support {operation}")]
    UnsupportedOperation {
        capability: String,
        operation: String,
    },
}

impl DriverError {
    /// Build a database error with an optional SQLSTATE code.
    pub fn database(sql_state: Option<&str>, message: impl Into<String>) -> Self {
        Self::Database {
            sql_state: sql_state.map(str::to_owned),
            message: message.into(),
        }
    }

    /// Stable identifier recorded as `exception.type` on failed spans.
    pub fn kind(&self) -> &'static str {
        match self {
            DriverError::Database { .. } => "DatabaseError",
            DriverError::Closed(_) => "ClosedError",
            DriverError::NoSuitableDriver { .. } => "NoSuitableDriver",
            DriverError::DriverLoad { .. } => "DriverLoadError",
            DriverError::InvalidUrl { .. } => "InvalidUrl",
            DriverError::UnsupportedOperation { .. } => "UnsupportedOperation",
        }
    }

    /// Whether the error means the driver could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            DriverError::NoSuitableDriver { .. } | DriverError::DriverLoad { .. }
        )
    }
}
