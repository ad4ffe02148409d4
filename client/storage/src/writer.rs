//! Transactional writes of indexed blocks.
//!
//! An [`IndexerWriter`] borrows a connection on which the caller has already
//! opened a transaction. It never begins, commits or rolls back: everything it
//! writes lands or disappears with the caller's transaction.

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::{debug_query, pg::Pg};
use diesel_async::AsyncPgConnection;
use insc_indexer_db::{
    batch::{max_rows_per_statement, BatchPatchSet, PatchSource},
    models::{
        AddressTx, Balance, BalanceTxn, BlockStatus, Inscription, InscriptionStats,
        InscriptionStatsChangeset, NewAddressTx, NewBalance, NewBalanceTxn, NewInscription,
        NewInscriptionStats, NewTransaction, NewUtxo, Transaction, Utxo,
    },
    BatchExecutor, Sid,
};
use tracing::{debug, warn};

use crate::{
    constants::{database::INSERT_CHUNK_ROWS, log::SQL_TARGET},
    repository::error::RepositoryResult,
};

/// Writes the effects of indexed blocks through a caller-owned transaction.
pub struct IndexerWriter<'c> {
    conn: &'c mut AsyncPgConnection,
    log_statements: bool,
}

impl<'c> IndexerWriter<'c> {
    pub fn new(conn: &'c mut AsyncPgConnection) -> Self {
        Self {
            conn,
            log_statements: false,
        }
    }

    /// Log every compiled batch statement at `debug` level.
    pub fn with_statement_logging(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// The underlying connection, for reads inside the same transaction.
    pub fn conn(&mut self) -> &mut AsyncPgConnection {
        self.conn
    }

    pub async fn save_last_block(
        &mut self,
        chain: &str,
        block_hash: &str,
        block_number: &BigDecimal,
        block_time: NaiveDateTime,
    ) -> RepositoryResult<()> {
        BlockStatus::save(self.conn, chain, block_hash, block_number, block_time).await?;
        debug!(chain, block_number = %block_number, "Saved last indexed block");
        Ok(())
    }

    pub async fn add_inscriptions(&mut self, items: &[NewInscription]) -> RepositoryResult<usize> {
        let mut inserted = 0;
        for chunk in items.chunks(INSERT_CHUNK_ROWS) {
            inserted += Inscription::batch_insert(self.conn, chunk).await?;
        }
        Ok(inserted)
    }

    pub async fn add_inscription_stats(
        &mut self,
        items: &[NewInscriptionStats],
    ) -> RepositoryResult<usize> {
        let mut inserted = 0;
        for chunk in items.chunks(INSERT_CHUNK_ROWS) {
            inserted += InscriptionStats::batch_insert(self.conn, chunk).await?;
        }
        Ok(inserted)
    }

    pub async fn add_transactions(&mut self, items: &[NewTransaction]) -> RepositoryResult<usize> {
        let mut inserted = 0;
        for chunk in items.chunks(INSERT_CHUNK_ROWS) {
            inserted += Transaction::batch_insert(self.conn, chunk).await?;
        }
        Ok(inserted)
    }

    pub async fn add_balance_txns(&mut self, items: &[NewBalanceTxn]) -> RepositoryResult<usize> {
        let mut inserted = 0;
        for chunk in items.chunks(INSERT_CHUNK_ROWS) {
            inserted += BalanceTxn::batch_insert(self.conn, chunk).await?;
        }
        Ok(inserted)
    }

    pub async fn add_address_txs(&mut self, items: &[NewAddressTx]) -> RepositoryResult<usize> {
        let mut inserted = 0;
        for chunk in items.chunks(INSERT_CHUNK_ROWS) {
            inserted += AddressTx::batch_insert(self.conn, chunk).await?;
        }
        Ok(inserted)
    }

    pub async fn add_balances(&mut self, items: &[NewBalance]) -> RepositoryResult<usize> {
        let mut inserted = 0;
        for chunk in items.chunks(INSERT_CHUNK_ROWS) {
            inserted += Balance::batch_insert(self.conn, chunk).await?;
        }
        Ok(inserted)
    }

    pub async fn add_utxos(&mut self, items: &[NewUtxo]) -> RepositoryResult<usize> {
        let mut inserted = 0;
        for chunk in items.chunks(INSERT_CHUNK_ROWS) {
            inserted += Utxo::batch_insert(self.conn, chunk).await?;
        }
        Ok(inserted)
    }

    pub async fn update_inscriptions(
        &mut self,
        chain: &str,
        items: &[Inscription],
    ) -> RepositoryResult<usize> {
        self.update_by_sid(chain, items).await
    }

    pub async fn update_inscription_stats(
        &mut self,
        chain: &str,
        items: &[InscriptionStats],
    ) -> RepositoryResult<usize> {
        self.update_by_sid(chain, items).await
    }

    pub async fn update_balances(&mut self, chain: &str, items: &[Balance]) -> RepositoryResult<usize> {
        self.update_by_sid(chain, items).await
    }

    pub async fn update_stats_by_sid(
        &mut self,
        chain: &str,
        sid: Sid,
        changes: &InscriptionStatsChangeset,
    ) -> RepositoryResult<usize> {
        Ok(InscriptionStats::update_by_sid(self.conn, chain, sid, changes).await?)
    }

    pub async fn update_stats_for_mint(&mut self, stats: &InscriptionStats) -> RepositoryResult<usize> {
        Ok(InscriptionStats::update_for_mint(self.conn, stats).await?)
    }

    pub async fn spend_utxos(&mut self, chain: &str, sids: &[Sid]) -> RepositoryResult<usize> {
        Ok(Utxo::mark_spent(self.conn, chain, sids).await?)
    }

    /// Write the patch columns of `items` back to their rows on `chain`.
    ///
    /// Repeated SIDs are collapsed to their last values over the whole input,
    /// then inputs too large for one statement are split, each part holding as
    /// many rows as the bind parameter limit allows. Fewer rows changed than
    /// distinct SIDs is logged, not treated as an error.
    async fn update_by_sid<T>(&mut self, chain: &str, items: &[T]) -> RepositoryResult<usize>
    where
        T: PatchSource + Sync,
    {
        if items.is_empty() {
            return Ok(0);
        }

        let set = BatchPatchSet::from_entities(chain, items);
        let expected = set.distinct_sids();
        let parts = set.split(max_rows_per_statement(T::COLUMNS.len()));

        let mut affected = 0;
        for part in parts {
            let Some(statement) = part.compile()? else {
                continue;
            };
            if self.log_statements {
                debug!(
                    target: SQL_TARGET,
                    table = T::TABLE,
                    sql = %debug_query::<Pg, _>(&statement),
                    "Executing batch update"
                );
            }
            affected += self.conn.execute_update(statement).await?;
        }

        if affected < expected {
            warn!(
                chain,
                table = T::TABLE,
                expected,
                affected,
                "Batch update changed fewer rows than distinct SIDs"
            );
        } else {
            debug!(chain, table = T::TABLE, affected, "Batch update applied");
        }

        Ok(affected)
    }
}
