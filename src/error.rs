//! Error types for the ORM layer.
//!
//! [`OrmError`] covers the error categories a query layer can surface. This
//! crate originates almost none of them itself: invalid field names, type
//! mismatches, and constraint violations come back from whatever implements
//! [`DbExecutor`](crate::executor::DbExecutor). The one exception is
//! [`OrmError::FieldError`], raised when a lookup name cannot be resolved or
//! an operation requires a projection that is not set.

use thiserror::Error;

/// The error type for all fallible operations in this crate.
#[derive(Error, Debug)]
pub enum OrmError {
    /// Raised when a query expected exactly one result but found none.
    #[error("Object does not exist: {0}")]
    DoesNotExist(String),

    /// Raised when a query expected exactly one result but found multiple.
    #[error("Multiple objects returned when one expected: {0}")]
    MultipleObjectsReturned(String),

    /// A generic database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A database integrity constraint was violated.
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    /// An operational database error (connection failure, etc.).
    #[error("Operational error: {0}")]
    OperationalError(String),

    /// A lookup or field reference could not be resolved.
    #[error("Field error: {0}")]
    FieldError(String),
}

/// A convenience type alias for `Result<T, OrmError>`.
pub type OrmResult<T> = Result<T, OrmError>;
