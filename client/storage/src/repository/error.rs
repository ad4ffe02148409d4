//! Error types for repository operations.
//!
//! ## Error Categories
//! - Database errors from diesel operations, including those of batch updates
//! - Connection pool errors
//! - Not found errors for missing entities
//! - Rejected batches and invalid arguments

use insc_indexer_db::BatchUpdateError;
use thiserror::Error;

/// Main error type for repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database operation error from diesel
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Connection pool error
    #[error("Pool error: {0}")]
    Pool(String),

    /// Entity not found error
    #[error("Not found: {entity}")]
    NotFound {
        /// The type of entity that was not found
        entity: String,
    },

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RepositoryError {
    /// Create a new NotFound error for the given entity type.
    ///
    /// # Arguments
    /// * `entity` - The type of entity that was not found (e.g., "Inscription", "Balance")
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Check if this error represents a not found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is due to a database constraint violation.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Database(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) | Self::Database(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::ForeignKeyViolation,
                _,
            ))
        )
    }
}

impl From<BatchUpdateError> for RepositoryError {
    fn from(err: BatchUpdateError) -> Self {
        match err {
            BatchUpdateError::Database(err) => Self::Database(err),
            rejected => Self::InvalidInput(rejected.to_string()),
        }
    }
}

/// Type alias for Results that may fail with RepositoryError
pub type RepositoryResult<T> = Result<T, RepositoryError>;
