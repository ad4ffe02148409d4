//! Indexer client wrapper using repository pattern abstraction
//!
//! This module provides a client that delegates all reads to an underlying
//! repository implementation, allowing for both production PostgreSQL and
//! mock implementations for testing.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use insc_indexer_db::{
    models::{Balance, Transaction, Utxo},
    types::TxEvent,
};

use crate::{
    constants::database::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT},
    error::{Error, Result},
    repository::{
        AddressInscription, AddressTransaction, InscriptionFilter, InscriptionOverview,
        InscriptionSort, Page, Paginated, StorageOperations, TickFilter,
    },
};

/// Page of a read, with defaults for missing parameters and the size capped.
fn page(limit: Option<i64>, offset: Option<i64>) -> Page {
    Page::new(
        limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        offset.unwrap_or(0).max(0),
    )
}

/// Client that delegates to a repository implementation
///
/// ## Usage Example
/// ```ignore
/// use insc_storage::{client::IndexerClient, repository::postgres::Repository};
///
/// // Production usage with PostgreSQL
/// let repo = Repository::new(&config.database).await?;
/// let client = IndexerClient::new(Arc::new(repo));
///
/// // Test usage with mock
/// let client = IndexerClient::new(Arc::new(MockRepository::new()));
/// ```
#[derive(Clone)]
pub struct IndexerClient {
    repository: Arc<dyn StorageOperations>,
}

impl IndexerClient {
    /// Create a new client with the given repository
    pub fn new(repository: Arc<dyn StorageOperations>) -> Self {
        Self { repository }
    }

    /// Test the database connection
    pub async fn test_connection(&self) -> Result<()> {
        self.repository
            .list_inscriptions(
                &InscriptionFilter::default(),
                InscriptionSort::Id,
                Page::new(1, 0),
            )
            .await?;
        Ok(())
    }

    /// Last indexed block of `chain`, `None` before indexing started
    pub async fn last_block(&self, chain: &str) -> Result<Option<BigDecimal>> {
        Ok(self.repository.last_block_number(chain).await?)
    }

    pub async fn get_inscriptions(
        &self,
        filter: &InscriptionFilter,
        sort: InscriptionSort,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Paginated<InscriptionOverview>> {
        Ok(self
            .repository
            .list_inscriptions(filter, sort, page(limit, offset))
            .await?)
    }

    /// Retrieve an inscription with its statistics
    pub async fn get_inscription(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
    ) -> Result<InscriptionOverview> {
        let inscription = self
            .repository
            .find_inscription_by_tick(chain, protocol, tick)
            .await?
            .ok_or_else(|| Error::NotFound(format!("inscription {}:{}:{}", chain, protocol, tick)))?;
        let stats = self
            .repository
            .find_inscription_stats(inscription.id)
            .await?;

        Ok(InscriptionOverview { inscription, stats })
    }

    pub async fn get_address_transactions(
        &self,
        address: &str,
        filter: &TickFilter,
        event: Option<TxEvent>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Paginated<AddressTransaction>> {
        Ok(self
            .repository
            .list_address_transactions(address, filter, event, page(limit, offset))
            .await?)
    }

    pub async fn get_address_inscriptions(
        &self,
        address: &str,
        filter: &TickFilter,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Paginated<AddressInscription>> {
        Ok(self
            .repository
            .list_address_inscriptions(address, filter, page(limit, offset))
            .await?)
    }

    pub async fn get_balances(
        &self,
        address: &str,
        filter: &TickFilter,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Paginated<Balance>> {
        Ok(self
            .repository
            .list_balances_by_address(address, filter, page(limit, offset))
            .await?)
    }

    pub async fn get_balance(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
        address: &str,
    ) -> Result<Balance> {
        self.repository
            .find_balance(chain, protocol, tick, address)
            .await?
            .ok_or_else(|| Error::NotFound(format!("balance of {} in {}", address, tick)))
    }

    pub async fn get_holders(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Paginated<Balance>> {
        Ok(self
            .repository
            .list_holders(chain, protocol, tick, page(limit, offset))
            .await?)
    }

    /// Unspent outputs of `address` together with their count
    pub async fn get_utxos(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
        address: &str,
    ) -> Result<(Vec<Utxo>, i64)> {
        let utxos = self
            .repository
            .list_unspent_utxos(chain, protocol, tick, address)
            .await?;
        let count = self
            .repository
            .count_unspent_utxos(chain, protocol, tick, address)
            .await?;

        Ok((utxos, count))
    }

    pub async fn get_transaction(&self, chain: &str, tx_hash: &str) -> Result<Transaction> {
        self.repository
            .find_transaction(chain, tx_hash)
            .await?
            .ok_or_else(|| Error::NotFound(format!("transaction {}", tx_hash)))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use insc_indexer_db::{models::NewAddressTx, models::NewTransaction, types::UtxoStatus};

    use super::*;
    use crate::{
        repository::{
            mock::{tests::*, MockRepository},
            postgres::Repository,
            IndexerOpsMut,
        },
        test_helpers::{setup_test_db, timestamp},
    };

    fn amount(v: &str) -> BigDecimal {
        BigDecimal::from_str(v).unwrap()
    }

    #[test]
    fn page_defaults_and_caps() {
        assert_eq!(page(None, None), Page::new(DEFAULT_PAGE_LIMIT, 0));
        assert_eq!(page(Some(10_000), Some(40)), Page::new(MAX_PAGE_LIMIT, 40));
        assert_eq!(page(Some(0), Some(-3)), Page::new(1, 0));
    }

    #[tokio::test]
    async fn get_inscription_with_stats() {
        let repo = MockRepository::new();
        let ordi = repo.add_inscription(sample_inscription(1, "ordi", "1000")).await;
        repo.add_stats(sample_stats(&ordi, "500", 2)).await;
        let client = IndexerClient::new(Arc::new(repo));

        let overview = client
            .get_inscription("btc", "brc-20", "ordi")
            .await
            .expect("inscription exists");

        assert_eq!(overview.inscription.id, ordi.id);
        assert_eq!(overview.progress(), Some(amount("0.5")));
    }

    #[tokio::test]
    async fn missing_entities_are_not_found() {
        let client = IndexerClient::new(Arc::new(MockRepository::new()));

        let err = client
            .get_inscription("btc", "brc-20", "none")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = client.get_transaction("btc", "0xdead").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn listings_use_the_default_page() {
        let repo = MockRepository::new();
        for sid in 0..(DEFAULT_PAGE_LIMIT as u32 + 5) {
            repo.add_balance(sample_balance(sid, "ordi", &format!("bc1holder{}", sid), "1"))
                .await;
        }
        let client = IndexerClient::new(Arc::new(repo));

        let holders = client
            .get_holders("btc", "brc-20", "ordi", None, None)
            .await
            .unwrap();

        assert_eq!(holders.items.len(), DEFAULT_PAGE_LIMIT as usize);
        assert_eq!(holders.total, DEFAULT_PAGE_LIMIT + 5);
    }

    #[tokio::test]
    async fn address_transactions_filter_by_event() {
        let repo = MockRepository::new();
        for (hash, event) in [("tx1", TxEvent::Mint), ("tx2", TxEvent::Transfer)] {
            repo.add_transaction(NewTransaction {
                chain: "btc".to_string(),
                protocol: "brc-20".to_string(),
                block_height: 840_000,
                position_in_block: 1,
                block_time: timestamp(1_713_000_000),
                tx_hash: hash.to_string(),
                from_address: "bc1alice".to_string(),
                to_address: "bc1bob".to_string(),
                op: "transfer".to_string(),
                tick: "ordi".to_string(),
                amount: amount("1"),
                gas: 0,
                gas_price: amount("0"),
                status: 1,
            })
            .await;
            repo.add_address_tx(NewAddressTx {
                chain: "btc".to_string(),
                event: event as i16,
                protocol: "brc-20".to_string(),
                tx_hash: hash.to_string(),
                address: "bc1alice".to_string(),
                related_address: "bc1bob".to_string(),
                amount: amount("1"),
                tick: "ordi".to_string(),
            })
            .await;
        }
        let client = IndexerClient::new(Arc::new(repo));

        let all = client
            .get_address_transactions("bc1alice", &TickFilter::default(), None, None, None)
            .await
            .unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].transaction.tx_hash, "tx2");

        let transfers = client
            .get_address_transactions(
                "bc1alice",
                &TickFilter::default(),
                Some(TxEvent::Transfer),
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(transfers.total, 1);
        assert_eq!(transfers.items[0].address_tx.event(), Some(TxEvent::Transfer));
    }

    #[tokio::test]
    async fn utxos_come_with_their_count() {
        let repo = MockRepository::new();
        repo.add_utxo(sample_utxo(1, "bc1alice", UtxoStatus::Unspent))
            .await;
        repo.add_utxo(sample_utxo(2, "bc1alice", UtxoStatus::Spent))
            .await;
        let client = IndexerClient::new(Arc::new(repo));

        let (utxos, count) = client
            .get_utxos("btc", "brc-20", "ordi", "bc1alice")
            .await
            .unwrap();

        assert_eq!(utxos.len(), 1);
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn balance_updates_are_visible_through_the_client() {
        let repo = Arc::new(MockRepository::new());
        let alice = repo
            .add_balance(sample_balance(1, "ordi", "bc1alice", "10"))
            .await;
        let client = IndexerClient::new(repo.clone());

        let mut changed = alice.clone();
        changed.available = amount("4");
        repo.update_balances("btc", &[changed]).await.unwrap();

        let balance = client
            .get_balance("btc", "brc-20", "ordi", "bc1alice")
            .await
            .unwrap();
        assert_eq!(balance.available, amount("4"));
        assert_eq!(balance.balance, amount("10"));
    }

    #[tokio::test]
    #[ignore = "Requires a Docker daemon to start the postgres container"]
    async fn postgres_client_connects() {
        let (_container, config) = setup_test_db().await;
        let repo = Repository::new(&config).await.expect("able to create repository");
        let client = IndexerClient::new(Arc::new(repo));

        client.test_connection().await.expect("able to connect");
        assert_eq!(client.last_block("btc").await.unwrap(), None);
    }
}
