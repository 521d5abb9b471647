//! error types for engine operations.

use thiserror::Error;

/// errors raised by the enforcement engine.
#[derive(Debug, Error)]
pub enum Error {
    /// a store operation failed; the caller may retry.
    #[error(transparent)]
    Db(#[from] hue_db::Error),

    /// a referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// a reserved feature was selected.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}
