//! Error types for batched updates.

use thiserror::Error;

use crate::types::Sid;

/// Failures of a batched update-by-SID call.
///
/// Everything except [`BatchUpdateError::Database`] is a precondition failure
/// detected before the statement reaches the backend.
#[derive(Debug, Error)]
pub enum BatchUpdateError {
    /// The batch targets no chain.
    #[error("batch update on `{table}` has an empty chain")]
    EmptyChain { table: &'static str },

    /// The batch carries patches but declares no columns to set.
    #[error("batch update on `{table}` declares no columns")]
    EmptyColumns { table: &'static str },

    /// A patch does not supply exactly one value per declared column.
    #[error("patch for sid {sid} carries {actual} values, expected {expected}")]
    ValueCountMismatch {
        sid: Sid,
        expected: usize,
        actual: usize,
    },

    /// The statement would exceed the number of bind parameters a single
    /// Postgres statement can carry.
    #[error("batch of {rows} rows needs {binds} bind parameters, the limit is {limit}")]
    TooManyBindParams {
        rows: usize,
        binds: usize,
        limit: usize,
    },

    /// Backend error, returned as produced by diesel.
    #[error(transparent)]
    Database(#[from] diesel::result::Error),
}

impl BatchUpdateError {
    /// Whether the error was raised before anything was sent to the backend.
    pub fn is_precondition(&self) -> bool {
        !matches!(self, Self::Database(_))
    }
}

pub type BatchResult<T> = Result<T, BatchUpdateError>;
