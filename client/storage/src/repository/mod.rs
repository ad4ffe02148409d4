//! Repository pattern implementation for indexer database reads.
//!
//! ## Key Components
//! - [`SmartPool`](pool::SmartPool) - Connection pool with automatic test transaction support
//! - [`RepositoryError`](error::RepositoryError) - Error type of repository operations
//! - [`IndexerOps`] - Read operations served to the API layer
//! - [`Repository`](postgres::Repository) - PostgreSQL implementation
//!
//! Writes do not go through these traits: the indexer applies a block with an
//! [`IndexerWriter`](crate::writer::IndexerWriter) inside a transaction it owns,
//! see [`Repository::write`](postgres::Repository::write).
//!
//! ## Usage Example
//! ```ignore
//! use repository::{postgres::Repository, IndexerOps, Page};
//!
//! let repo = Repository::new(&config.database).await?;
//! let holders = repo.list_holders("btc", "brc-20", "ordi", Page::new(20, 0)).await?;
//! ```

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDateTime;
use insc_indexer_db::{
    models::{AddressTx, Balance, Inscription, InscriptionStats, Transaction, Utxo},
    types::TxEvent,
};
use serde::{Deserialize, Serialize};

pub mod error;
#[cfg(any(test, feature = "mocks"))]
pub mod mock;
pub mod pool;
pub mod postgres;

use error::{RepositoryError, RepositoryResult};

/// Limit and offset of a paginated read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }
}

/// One page of results together with the number of rows matching the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Optional equality filters on chain, protocol and tick. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickFilter {
    pub chain: Option<String>,
    pub protocol: Option<String>,
    pub tick: Option<String>,
}

impl TickFilter {
    /// Build a filter from request parameters, treating empty strings as absent.
    pub fn from_params(chain: &str, protocol: &str, tick: &str) -> Self {
        Self {
            chain: non_empty(chain),
            protocol: non_empty(protocol),
            tick: non_empty(tick),
        }
    }
}

/// Filters of the inscription listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InscriptionFilter {
    #[serde(flatten)]
    pub tick: TickFilter,
    pub deploy_by: Option<String>,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Ordering of the inscription listing. Every order is descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InscriptionSort {
    #[default]
    Id,
    DeployTime,
    /// Share of the total supply already minted
    Progress,
    Holders,
    TxCount,
}

impl TryFrom<i32> for InscriptionSort {
    type Error = RepositoryError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Id),
            1 => Ok(Self::DeployTime),
            2 => Ok(Self::Progress),
            3 => Ok(Self::Holders),
            4 => Ok(Self::TxCount),
            other => Err(RepositoryError::invalid_input(format!(
                "unknown inscription sort {}",
                other
            ))),
        }
    }
}

/// An inscription with its statistics, when they exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InscriptionOverview {
    pub inscription: Inscription,
    pub stats: Option<InscriptionStats>,
}

impl InscriptionOverview {
    /// Minted share of the total supply, `None` without stats or supply.
    pub fn progress(&self) -> Option<BigDecimal> {
        let stats = self.stats.as_ref()?;
        if self.inscription.total_supply.is_zero() {
            return None;
        }
        Some(&stats.minted / &self.inscription.total_supply)
    }

    pub fn deploy_time(&self) -> NaiveDateTime {
        self.inscription.deploy_time
    }
}

/// A transaction seen from one of the addresses it involves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressTransaction {
    pub transaction: Transaction,
    pub address_tx: AddressTx,
}

/// A positive balance of an address with the inscription it holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressInscription {
    pub balance: Balance,
    pub inscription: Option<Inscription>,
}

/// Read-only operations for indexer data access.
///
/// ## Implementation Notes
/// - Finders return `Ok(None)` when the entity does not exist
/// - Listings return one page and the total count of matching rows
#[async_trait]
pub trait IndexerOps: Send + Sync {
    /// Last indexed block of `chain`.
    async fn last_block_number(&self, chain: &str) -> RepositoryResult<Option<BigDecimal>>;

    async fn find_inscription_by_tick(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
    ) -> RepositoryResult<Option<Inscription>>;

    /// Statistics of the inscription with database id `ins_id`.
    async fn find_inscription_stats(&self, ins_id: i64)
        -> RepositoryResult<Option<InscriptionStats>>;

    async fn find_balance(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
        address: &str,
    ) -> RepositoryResult<Option<Balance>>;

    async fn find_transaction(&self, chain: &str, tx_hash: &str)
        -> RepositoryResult<Option<Transaction>>;

    async fn find_address_tx(&self, chain: &str, tx_hash: &str)
        -> RepositoryResult<Option<AddressTx>>;

    /// Inscriptions joined with their statistics.
    async fn list_inscriptions(
        &self,
        filter: &InscriptionFilter,
        sort: InscriptionSort,
        page: Page,
    ) -> RepositoryResult<Paginated<InscriptionOverview>>;

    /// Transactions involving `address`, newest first. `event` narrows to one event kind.
    async fn list_address_transactions(
        &self,
        address: &str,
        filter: &TickFilter,
        event: Option<TxEvent>,
        page: Page,
    ) -> RepositoryResult<Paginated<AddressTransaction>>;

    /// Inscriptions `address` holds a positive balance of.
    async fn list_address_inscriptions(
        &self,
        address: &str,
        filter: &TickFilter,
        page: Page,
    ) -> RepositoryResult<Paginated<AddressInscription>>;

    /// All balances of `address`, zero balances included, newest first.
    async fn list_balances_by_address(
        &self,
        address: &str,
        filter: &TickFilter,
        page: Page,
    ) -> RepositoryResult<Paginated<Balance>>;

    /// Addresses holding a positive balance of an inscription, newest first.
    async fn list_holders(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
        page: Page,
    ) -> RepositoryResult<Paginated<Balance>>;

    async fn count_unspent_utxos(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
        address: &str,
    ) -> RepositoryResult<i64>;

    /// Unspent outputs of `address`, newest first.
    async fn list_unspent_utxos(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
        address: &str,
    ) -> RepositoryResult<Vec<Utxo>>;
}

/// Mutable operations for test environments.
///
/// Lets tests seed and mutate data through the same trait object the API layer
/// reads from.
#[async_trait]
pub trait IndexerOpsMut: IndexerOps {
    /// Record `block_number` as the last indexed block of `chain`.
    async fn save_last_block(
        &self,
        chain: &str,
        block_hash: &str,
        block_number: &BigDecimal,
        block_time: NaiveDateTime,
    ) -> RepositoryResult<()>;

    /// Write `available` and `balance` of `items` back to their rows, returning
    /// the number of rows changed.
    async fn update_balances(&self, chain: &str, items: &[Balance]) -> RepositoryResult<usize>;
}

// When compiling unit tests the write operations are available transparently,
// without a dedicated client for tests.
//
// Other builds only expose `IndexerOps`.

#[cfg(not(test))]
pub trait StorageOperations: IndexerOps {}

#[cfg(not(test))]
impl<T: IndexerOps> StorageOperations for T {}

#[cfg(test)]
pub trait StorageOperations: IndexerOps + IndexerOpsMut {}

#[cfg(test)]
impl<T: IndexerOps + IndexerOpsMut> StorageOperations for T {}
