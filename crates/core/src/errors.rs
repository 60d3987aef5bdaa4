//! Core error types.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage layer.

use chrono::ParseError as ChronoParseError;
use poptimizer_market_data::MarketDataError;
use thiserror::Error;

use crate::domain::QualifiedId;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    /// Optimistic concurrency conflict: the stored version moved on
    /// or a new aggregate collided with an existing one.
    #[error("wrong agg version {qid}")]
    WrongVersion { qid: QualifiedId },

    #[error("data not found {0}")]
    NotFound(String),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Parse error: {0}")]
    Parse(String),

    /// Upstream has no session newer than the stored one.
    #[error("update not required")]
    UpdateNotRequired,

    #[error("Timeout: {0}")]
    Timeout(String),

    /// Attaches the failing aggregate or source to an error.
    #[error("{origin} -> {error}")]
    Origin {
        origin: String,
        #[source]
        error: Box<Error>,
    },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Wraps the error with the name of the aggregate or source that failed.
    pub fn within(self, origin: impl ToString) -> Self {
        Error::Origin {
            origin: origin.to_string(),
            error: Box::new(self),
        }
    }

    /// True for `WrongVersion`, looking through origin wrappers.
    pub fn is_wrong_version(&self) -> bool {
        match self {
            Error::WrongVersion { .. } => true,
            Error::Origin { error, .. } => error.is_wrong_version(),
            _ => false,
        }
    }
}

/// Database-agnostic error type for storage operations.
///
/// This enum uses `String` for all error details, allowing the storage layer
/// to convert storage-specific errors (Diesel, SQLite, etc.) into this format.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (e.g., duplicate key).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    #[error("Database backup failed: {0}")]
    BackupFailed(String),

    #[error("Database restore failed: {0}")]
    RestoreFailed(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Violations of aggregate invariants found while validating new data.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("not increasing dates {0}")]
    NotIncreasingDates(String),

    #[error("old rows {old} not match new {new}")]
    AnchorMismatch { old: String, new: String },

    #[error("too few rows {new} < {old}")]
    TooFewRows { new: usize, old: usize },

    #[error("{ticker} have fractional lots")]
    FractionalLots { ticker: String },

    #[error("{ticker} not selected")]
    NotSelected { ticker: String },

    #[error("{ticker} missed dividend at {date}")]
    MissedDividend { ticker: String, date: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Unexpected(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Database(DatabaseError::Internal(format!("can't encode payload: {err}")))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::InvalidInput(format!("Invalid date: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_is_in_message() {
        let err = Error::Validation(ValidationError::AnchorMismatch {
            old: "2024-06-25 87.1".to_string(),
            new: "2024-06-25 87.2".to_string(),
        })
        .within("data/usd/usd");

        assert_eq!(
            err.to_string(),
            "data/usd/usd -> Input validation failed: old rows 2024-06-25 87.1 not match new 2024-06-25 87.2"
        );
    }

    #[test]
    fn test_wrong_version_is_seen_through_origin() {
        let qid = QualifiedId::new("data", "usd", "usd");
        let err = Error::WrongVersion { qid }.within("usd");

        assert!(err.is_wrong_version());
        assert!(!Error::UpdateNotRequired.is_wrong_version());
    }
}
