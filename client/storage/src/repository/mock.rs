//! Mock repository implementation for unit testing.
//!
//! Provides an in-memory implementation of the repository pattern that mimics
//! the PostgreSQL queries without requiring a real database connection.

use std::{
    cmp::Reverse,
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use chrono::{NaiveDateTime, Utc};
use insc_indexer_db::{
    models::{
        AddressTx, Balance, BlockStatus, Inscription, InscriptionStats, NewAddressTx, NewBalance,
        NewInscription, NewInscriptionStats, NewTransaction, NewUtxo, Transaction, Utxo,
    },
    types::{TxEvent, UtxoStatus},
    BatchUpdateError,
};
use tokio::sync::RwLock;

use super::{
    error::RepositoryResult, AddressInscription, AddressTransaction, IndexerOps, IndexerOpsMut,
    InscriptionFilter, InscriptionOverview, InscriptionSort, Page, Paginated, TickFilter,
};

fn paginate<T>(items: Vec<T>, page: Page) -> Paginated<T> {
    let total = items.len() as i64;
    Paginated {
        items: items
            .into_iter()
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .collect(),
        total,
    }
}

fn matches_tick(filter: &TickFilter, chain: &str, protocol: &str, tick: &str) -> bool {
    filter.chain.as_deref().map_or(true, |c| c == chain)
        && filter.protocol.as_deref().map_or(true, |p| p == protocol)
        && filter.tick.as_deref().map_or(true, |t| t == tick)
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Mock repository implementation using in-memory storage
pub struct MockRepository {
    blocks: Arc<RwLock<HashMap<String, BlockStatus>>>,
    inscriptions: Arc<RwLock<HashMap<i64, Inscription>>>,
    stats: Arc<RwLock<HashMap<i64, InscriptionStats>>>,
    balances: Arc<RwLock<HashMap<i64, Balance>>>,
    transactions: Arc<RwLock<HashMap<i64, Transaction>>>,
    address_txs: Arc<RwLock<HashMap<i64, AddressTx>>>,
    utxos: Arc<RwLock<HashMap<i64, Utxo>>>,
    next_id: Arc<AtomicI64>,
}

impl MockRepository {
    /// Create a new mock repository
    pub fn new() -> Self {
        Self {
            blocks: Arc::new(RwLock::new(HashMap::new())),
            inscriptions: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(HashMap::new())),
            balances: Arc::new(RwLock::new(HashMap::new())),
            transactions: Arc::new(RwLock::new(HashMap::new())),
            address_txs: Arc::new(RwLock::new(HashMap::new())),
            utxos: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Generate next unique ID
    pub fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub async fn add_inscription(&self, new: NewInscription) -> Inscription {
        let id = self.next_id();
        let created = now();
        let inscription = Inscription {
            id,
            sid: new.sid,
            chain: new.chain,
            protocol: new.protocol,
            tick: new.tick,
            name: new.name,
            limit_per_mint: new.limit_per_mint,
            deploy_by: new.deploy_by,
            total_supply: new.total_supply,
            decimals: new.decimals,
            deploy_hash: new.deploy_hash,
            deploy_time: new.deploy_time,
            transfer_type: new.transfer_type,
            created_at: created,
            updated_at: created,
        };
        self.inscriptions
            .write()
            .await
            .insert(id, inscription.clone());
        inscription
    }

    pub async fn add_stats(&self, new: NewInscriptionStats) -> InscriptionStats {
        let id = self.next_id();
        let created = now();
        let stats = InscriptionStats {
            id,
            sid: new.sid,
            ins_id: new.ins_id,
            chain: new.chain,
            protocol: new.protocol,
            tick: new.tick,
            minted: new.minted,
            mint_completed_time: new.mint_completed_time,
            mint_first_block: new.mint_first_block,
            mint_last_block: new.mint_last_block,
            holders: new.holders,
            tx_cnt: new.tx_cnt,
            created_at: created,
            updated_at: created,
        };
        self.stats.write().await.insert(id, stats.clone());
        stats
    }

    pub async fn add_balance(&self, new: NewBalance) -> Balance {
        let id = self.next_id();
        let created = now();
        let balance = Balance {
            id,
            sid: new.sid,
            chain: new.chain,
            protocol: new.protocol,
            tick: new.tick,
            address: new.address,
            balance: new.balance,
            available: new.available,
            created_at: created,
            updated_at: created,
        };
        self.balances.write().await.insert(id, balance.clone());
        balance
    }

    pub async fn add_transaction(&self, new: NewTransaction) -> Transaction {
        let id = self.next_id();
        let transaction = Transaction {
            id,
            chain: new.chain,
            protocol: new.protocol,
            block_height: new.block_height,
            position_in_block: new.position_in_block,
            block_time: new.block_time,
            tx_hash: new.tx_hash,
            from_address: new.from_address,
            to_address: new.to_address,
            op: new.op,
            tick: new.tick,
            amount: new.amount,
            gas: new.gas,
            gas_price: new.gas_price,
            status: new.status,
            created_at: now(),
        };
        self.transactions
            .write()
            .await
            .insert(id, transaction.clone());
        transaction
    }

    pub async fn add_address_tx(&self, new: NewAddressTx) -> AddressTx {
        let id = self.next_id();
        let address_tx = AddressTx {
            id,
            chain: new.chain,
            event: new.event,
            protocol: new.protocol,
            tx_hash: new.tx_hash,
            address: new.address,
            related_address: new.related_address,
            amount: new.amount,
            tick: new.tick,
            created_at: now(),
        };
        self.address_txs
            .write()
            .await
            .insert(id, address_tx.clone());
        address_tx
    }

    pub async fn add_utxo(&self, new: NewUtxo) -> Utxo {
        let id = self.next_id();
        let created = now();
        let utxo = Utxo {
            id,
            sid: new.sid,
            chain: new.chain,
            protocol: new.protocol,
            tick: new.tick,
            address: new.address,
            root_hash: new.root_hash,
            tx_hash: new.tx_hash,
            amount: new.amount,
            status: new.status,
            created_at: created,
            updated_at: created,
        };
        self.utxos.write().await.insert(id, utxo.clone());
        utxo
    }

    async fn unspent_utxos(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
        address: &str,
    ) -> Vec<Utxo> {
        let utxos = self.utxos.read().await;
        let mut found: Vec<Utxo> = utxos
            .values()
            .filter(|u| {
                u.chain == chain
                    && u.protocol == protocol
                    && u.tick == tick
                    && u.address == address
                    && u.status() == Some(UtxoStatus::Unspent)
            })
            .cloned()
            .collect();
        found.sort_by_key(|u| Reverse(u.id));
        found
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexerOps for MockRepository {
    async fn last_block_number(&self, chain: &str) -> RepositoryResult<Option<BigDecimal>> {
        Ok(self
            .blocks
            .read()
            .await
            .get(chain)
            .map(|b| b.block_number.clone()))
    }

    async fn find_inscription_by_tick(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
    ) -> RepositoryResult<Option<Inscription>> {
        Ok(self
            .inscriptions
            .read()
            .await
            .values()
            .find(|i| i.chain == chain && i.protocol == protocol && i.tick == tick)
            .cloned())
    }

    async fn find_inscription_stats(
        &self,
        ins_id: i64,
    ) -> RepositoryResult<Option<InscriptionStats>> {
        Ok(self
            .stats
            .read()
            .await
            .values()
            .find(|s| s.ins_id == ins_id)
            .cloned())
    }

    async fn find_balance(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
        address: &str,
    ) -> RepositoryResult<Option<Balance>> {
        Ok(self
            .balances
            .read()
            .await
            .values()
            .find(|b| {
                b.chain == chain && b.protocol == protocol && b.tick == tick && b.address == address
            })
            .cloned())
    }

    async fn find_transaction(
        &self,
        chain: &str,
        tx_hash: &str,
    ) -> RepositoryResult<Option<Transaction>> {
        Ok(self
            .transactions
            .read()
            .await
            .values()
            .find(|t| t.chain == chain && t.tx_hash == tx_hash)
            .cloned())
    }

    async fn find_address_tx(
        &self,
        chain: &str,
        tx_hash: &str,
    ) -> RepositoryResult<Option<AddressTx>> {
        Ok(self
            .address_txs
            .read()
            .await
            .values()
            .find(|a| a.chain == chain && a.tx_hash == tx_hash)
            .cloned())
    }

    async fn list_inscriptions(
        &self,
        filter: &InscriptionFilter,
        sort: InscriptionSort,
        page: Page,
    ) -> RepositoryResult<Paginated<InscriptionOverview>> {
        let inscriptions = self.inscriptions.read().await;
        let stats = self.stats.read().await;

        let mut found: Vec<InscriptionOverview> = inscriptions
            .values()
            .filter(|i| matches_tick(&filter.tick, &i.chain, &i.protocol, &i.tick))
            .filter(|i| filter.deploy_by.as_deref().map_or(true, |d| d == i.deploy_by))
            .map(|i| InscriptionOverview {
                inscription: i.clone(),
                stats: stats
                    .values()
                    .find(|s| s.chain == i.chain && s.protocol == i.protocol && s.tick == i.tick)
                    .cloned(),
            })
            .collect();

        // Descending, rows without a sort value last, newest id first on ties.
        found.sort_by(|a, b| {
            let by_key = match sort {
                InscriptionSort::Id => std::cmp::Ordering::Equal,
                InscriptionSort::DeployTime => b.deploy_time().cmp(&a.deploy_time()),
                InscriptionSort::Progress => b.progress().cmp(&a.progress()),
                InscriptionSort::Holders => b
                    .stats
                    .as_ref()
                    .map(|s| s.holders)
                    .cmp(&a.stats.as_ref().map(|s| s.holders)),
                InscriptionSort::TxCount => b
                    .stats
                    .as_ref()
                    .map(|s| s.tx_cnt)
                    .cmp(&a.stats.as_ref().map(|s| s.tx_cnt)),
            };
            by_key.then_with(|| b.inscription.id.cmp(&a.inscription.id))
        });

        Ok(paginate(found, page))
    }

    async fn list_address_transactions(
        &self,
        address: &str,
        filter: &TickFilter,
        event: Option<TxEvent>,
        page: Page,
    ) -> RepositoryResult<Paginated<AddressTransaction>> {
        let transactions = self.transactions.read().await;
        let address_txs = self.address_txs.read().await;

        let mut links: Vec<&AddressTx> = address_txs
            .values()
            .filter(|a| a.address == address)
            .filter(|a| matches_tick(filter, &a.chain, &a.protocol, &a.tick))
            .filter(|a| event.map_or(true, |e| a.event == e as i16))
            .collect();
        links.sort_by_key(|a| Reverse(a.id));

        let found = links
            .into_iter()
            .flat_map(|link| {
                transactions
                    .values()
                    .filter(move |t| {
                        t.tx_hash == link.tx_hash
                            && t.chain == link.chain
                            && t.protocol == link.protocol
                            && t.tick == link.tick
                    })
                    .map(move |t| AddressTransaction {
                        transaction: t.clone(),
                        address_tx: link.clone(),
                    })
            })
            .collect();

        Ok(paginate(found, page))
    }

    async fn list_address_inscriptions(
        &self,
        address: &str,
        filter: &TickFilter,
        page: Page,
    ) -> RepositoryResult<Paginated<AddressInscription>> {
        let balances = self.balances.read().await;
        let inscriptions = self.inscriptions.read().await;

        let mut held: Vec<&Balance> = balances
            .values()
            .filter(|b| b.address == address && b.balance > BigDecimal::zero())
            .filter(|b| matches_tick(filter, &b.chain, &b.protocol, &b.tick))
            .collect();
        held.sort_by_key(|b| Reverse(b.id));

        let found = held
            .into_iter()
            .map(|b| AddressInscription {
                balance: b.clone(),
                inscription: inscriptions
                    .values()
                    .find(|i| i.chain == b.chain && i.protocol == b.protocol && i.tick == b.tick)
                    .cloned(),
            })
            .collect();

        Ok(paginate(found, page))
    }

    async fn list_balances_by_address(
        &self,
        address: &str,
        filter: &TickFilter,
        page: Page,
    ) -> RepositoryResult<Paginated<Balance>> {
        let balances = self.balances.read().await;
        let mut found: Vec<Balance> = balances
            .values()
            .filter(|b| b.address == address)
            .filter(|b| matches_tick(filter, &b.chain, &b.protocol, &b.tick))
            .cloned()
            .collect();
        found.sort_by_key(|b| Reverse(b.id));

        Ok(paginate(found, page))
    }

    async fn list_holders(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
        page: Page,
    ) -> RepositoryResult<Paginated<Balance>> {
        let balances = self.balances.read().await;
        let mut found: Vec<Balance> = balances
            .values()
            .filter(|b| {
                b.chain == chain
                    && b.protocol == protocol
                    && b.tick == tick
                    && b.balance > BigDecimal::zero()
            })
            .cloned()
            .collect();
        found.sort_by_key(|b| Reverse(b.id));

        Ok(paginate(found, page))
    }

    async fn count_unspent_utxos(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
        address: &str,
    ) -> RepositoryResult<i64> {
        Ok(self.unspent_utxos(chain, protocol, tick, address).await.len() as i64)
    }

    async fn list_unspent_utxos(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
        address: &str,
    ) -> RepositoryResult<Vec<Utxo>> {
        Ok(self.unspent_utxos(chain, protocol, tick, address).await)
    }
}

#[async_trait]
impl IndexerOpsMut for MockRepository {
    async fn save_last_block(
        &self,
        chain: &str,
        block_hash: &str,
        block_number: &BigDecimal,
        block_time: NaiveDateTime,
    ) -> RepositoryResult<()> {
        self.blocks.write().await.insert(
            chain.to_string(),
            BlockStatus {
                chain: chain.to_string(),
                block_hash: block_hash.to_string(),
                block_number: block_number.clone(),
                block_time,
                updated_at: now(),
            },
        );
        Ok(())
    }

    async fn update_balances(&self, chain: &str, items: &[Balance]) -> RepositoryResult<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        if chain.is_empty() {
            return Err(BatchUpdateError::EmptyChain { table: "balances" }.into());
        }

        let mut balances = self.balances.write().await;
        let mut changed = HashSet::new();
        // Later items overwrite earlier ones, so a repeated SID keeps its last values.
        for item in items {
            for row in balances
                .values_mut()
                .filter(|b| b.chain == chain && b.sid == item.sid)
            {
                row.available = item.available.clone();
                row.balance = item.balance.clone();
                changed.insert(row.id);
            }
        }

        Ok(changed.len())
    }
}
