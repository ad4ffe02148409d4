//! SmartPool implementation for automatic test transaction management.
//!
//! ## Features
//! - Automatic test transactions in test mode (single connection)
//! - Normal pooling, sized by [`DatabaseConfig`], otherwise

#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(test)]
use diesel_async::{
    pooled_connection::{bb8::Pool, AsyncDieselConnectionManager},
    AsyncConnection, AsyncPgConnection,
};
use insc_indexer_db::{DbConnection, DbPool};

use super::error::RepositoryError;
use crate::config::DatabaseConfig;

/// Smart connection pool that automatically manages test transactions.
///
/// In test mode:
/// - Uses a single connection to enable test transactions
/// - Begins the test transaction on the first checkout
/// - The transaction rolls back when the pool is dropped
///
/// Otherwise the pool is built by [`insc_indexer_db::setup_db_pool`], with TLS
/// and an immediate health check.
pub struct SmartPool {
    inner: Arc<DbPool>,

    /// Whether the test transaction has been started (test mode only)
    #[cfg(test)]
    test_tx_initialized: AtomicBool,
}

impl SmartPool {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, RepositoryError> {
        #[cfg(test)]
        let pool = {
            let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.url);
            Pool::builder()
                .max_size(1)
                .build(manager)
                .await
                .map_err(|e| RepositoryError::Pool(format!("Failed to create test pool: {}", e)))?
        };

        #[cfg(not(test))]
        let pool = insc_indexer_db::setup_db_pool(config.url.clone(), &config.pool_settings())
            .await
            .map_err(|e| RepositoryError::Pool(format!("Failed to create pool: {}", e)))?;

        Ok(Self {
            inner: Arc::new(pool),
            #[cfg(test)]
            test_tx_initialized: AtomicBool::new(false),
        })
    }

    /// Get a connection from the pool.
    ///
    /// In test mode the first call begins a test transaction which is never committed.
    pub async fn get(&self) -> Result<DbConnection<'_>, RepositoryError> {
        #[allow(unused_mut)]
        let mut conn = self
            .inner
            .get()
            .await
            .map_err(|e| RepositoryError::Pool(format!("Failed to get connection: {}", e)))?;

        #[cfg(test)]
        {
            if self
                .test_tx_initialized
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                conn.begin_test_transaction()
                    .await
                    .map_err(RepositoryError::Database)?;
            }
        }

        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::setup_test_db;

    #[tokio::test]
    #[ignore = "Requires a Docker daemon to start the postgres container"]
    async fn create_and_get_connection() {
        let (_container, config) = setup_test_db().await;

        let pool = SmartPool::new(&config).await.expect("able to create pool");

        pool.get().await.expect("able to get connection");

        assert!(
            pool.test_tx_initialized.load(Ordering::SeqCst),
            "connection initialized with test_transaction"
        );
    }
}
