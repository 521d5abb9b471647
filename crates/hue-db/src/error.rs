//! error types for database operations.

use thiserror::Error;

/// errors that can occur in the persistence layer.
#[derive(Debug, Error)]
pub enum Error {
    /// failed to open or reach a store.
    #[error("connection error: {0}")]
    Connection(String),

    /// schema migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// an underlying query failed; callers may retry.
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// a referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// input violated a constraint.
    #[error("invalid data: {0}")]
    Invalid(String),
}
