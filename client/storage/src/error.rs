use crate::repository::error::RepositoryError;

/// Errors surfaced by [`IndexerClient`](crate::client::IndexerClient).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity } => Error::NotFound(entity),
            RepositoryError::Configuration(msg) => Error::Config(msg),
            other => Error::Database(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
