//! PostgreSQL repository implementation.
//!
//! ## Features
//! - Connection pooling through SmartPool
//! - Automatic test transactions in test mode
//! - Type-safe queries through diesel
//! - Transactional block writes through [`Repository::write`]

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
#[cfg(test)]
use chrono::NaiveDateTime;
use diesel::{
    dsl::sql,
    pg::Pg,
    prelude::*,
    sql_types::{Nullable, Numeric},
};
use diesel_async::{
    scoped_futures::{ScopedBoxFuture, ScopedFutureExt},
    AsyncConnection, RunQueryDsl,
};
use insc_indexer_db::{
    models::{AddressTx, Balance, BlockStatus, Inscription, InscriptionStats, Transaction, Utxo},
    schema::{address_txs, balances, inscriptions, inscriptions_stats, txs},
    types::TxEvent,
};

#[cfg(test)]
use super::IndexerOpsMut;
use super::{
    error::RepositoryResult, pool::SmartPool, AddressInscription, AddressTransaction,
    IndexerOps, InscriptionFilter, InscriptionOverview, InscriptionSort, Page, Paginated,
    TickFilter,
};
use crate::{config::DatabaseConfig, writer::IndexerWriter};

/// Minted share of the total supply; NULL when either side is missing or the supply is zero.
const PROGRESS_SQL: &str = "inscriptions_stats.minted / NULLIF(inscriptions.total_supply, 0)";

/// Inscriptions left-joined with their stats, narrowed by an [`InscriptionFilter`].
macro_rules! filtered_inscriptions {
    ($filter:expr) => {{
        let filter: &InscriptionFilter = $filter;
        let mut query = inscriptions::table
            .left_join(
                inscriptions_stats::table.on(inscriptions_stats::chain
                    .eq(inscriptions::chain)
                    .and(inscriptions_stats::protocol.eq(inscriptions::protocol))
                    .and(inscriptions_stats::tick.eq(inscriptions::tick))),
            )
            .into_boxed::<Pg>();
        if let Some(chain) = &filter.tick.chain {
            query = query.filter(inscriptions::chain.eq(chain));
        }
        if let Some(protocol) = &filter.tick.protocol {
            query = query.filter(inscriptions::protocol.eq(protocol));
        }
        if let Some(tick) = &filter.tick.tick {
            query = query.filter(inscriptions::tick.eq(tick));
        }
        if let Some(deploy_by) = &filter.deploy_by {
            query = query.filter(inscriptions::deploy_by.eq(deploy_by));
        }
        query
    }};
}

/// Transactions joined with the address links of `$address`.
macro_rules! address_transactions {
    ($address:expr, $filter:expr, $event:expr) => {{
        let filter: &TickFilter = $filter;
        let event: Option<TxEvent> = $event;
        let mut query = txs::table
            .inner_join(
                address_txs::table.on(address_txs::tx_hash
                    .eq(txs::tx_hash)
                    .and(address_txs::chain.eq(txs::chain))
                    .and(address_txs::protocol.eq(txs::protocol))
                    .and(address_txs::tick.eq(txs::tick))),
            )
            .filter(address_txs::address.eq($address))
            .into_boxed::<Pg>();
        if let Some(chain) = &filter.chain {
            query = query.filter(address_txs::chain.eq(chain));
        }
        if let Some(protocol) = &filter.protocol {
            query = query.filter(address_txs::protocol.eq(protocol));
        }
        if let Some(tick) = &filter.tick {
            query = query.filter(address_txs::tick.eq(tick));
        }
        if let Some(event) = event {
            query = query.filter(address_txs::event.eq(event as i16));
        }
        query
    }};
}

/// Positive balances of `$address` left-joined with their inscriptions.
macro_rules! address_inscriptions {
    ($address:expr, $filter:expr) => {{
        let filter: &TickFilter = $filter;
        let mut query = balances::table
            .left_join(
                inscriptions::table.on(inscriptions::chain
                    .eq(balances::chain)
                    .and(inscriptions::protocol.eq(balances::protocol))
                    .and(inscriptions::tick.eq(balances::tick))),
            )
            .filter(balances::address.eq($address))
            .filter(balances::balance.gt(BigDecimal::zero()))
            .into_boxed::<Pg>();
        if let Some(chain) = &filter.chain {
            query = query.filter(balances::chain.eq(chain));
        }
        if let Some(protocol) = &filter.protocol {
            query = query.filter(balances::protocol.eq(protocol));
        }
        if let Some(tick) = &filter.tick {
            query = query.filter(balances::tick.eq(tick));
        }
        query
    }};
}

fn balances_of<'a>(address: &'a str, filter: &'a TickFilter) -> balances::BoxedQuery<'a, Pg> {
    let mut query = balances::table
        .filter(balances::address.eq(address))
        .into_boxed();
    if let Some(chain) = &filter.chain {
        query = query.filter(balances::chain.eq(chain));
    }
    if let Some(protocol) = &filter.protocol {
        query = query.filter(balances::protocol.eq(protocol));
    }
    if let Some(tick) = &filter.tick {
        query = query.filter(balances::tick.eq(tick));
    }
    query
}

fn holders_of<'a>(chain: &'a str, protocol: &'a str, tick: &'a str) -> balances::BoxedQuery<'a, Pg> {
    balances::table
        .filter(balances::chain.eq(chain))
        .filter(balances::protocol.eq(protocol))
        .filter(balances::tick.eq(tick))
        .filter(balances::balance.gt(BigDecimal::zero()))
        .into_boxed()
}

/// PostgreSQL repository implementation.
pub struct Repository {
    pool: SmartPool,
    log_statements: bool,
}

impl Repository {
    pub async fn new(config: &DatabaseConfig) -> RepositoryResult<Self> {
        Ok(Self {
            pool: SmartPool::new(config).await?,
            log_statements: config.enable_log,
        })
    }

    /// Run `f` with an [`IndexerWriter`] inside a new transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back otherwise.
    ///
    /// ```ignore
    /// repo.write(|writer| {
    ///     async move {
    ///         writer.update_balances("btc", &balances).await?;
    ///         writer.save_last_block("btc", &hash, &number, time).await
    ///     }
    ///     .scope_boxed()
    /// })
    /// .await?;
    /// ```
    pub async fn write<'a, R, F>(&self, f: F) -> RepositoryResult<R>
    where
        F: for<'r, 'c> FnOnce(
                &'r mut IndexerWriter<'c>,
            ) -> ScopedBoxFuture<'a, 'r, RepositoryResult<R>>
            + Send
            + 'a,
        R: Send + 'a,
    {
        let log_statements = self.log_statements;
        let mut conn = self.pool.get().await?;

        conn.transaction(move |tx| {
            async move {
                let mut writer = IndexerWriter::new(tx).with_statement_logging(log_statements);
                f(&mut writer).await
            }
            .scope_boxed()
        })
        .await
    }
}

#[async_trait]
impl IndexerOps for Repository {
    async fn last_block_number(&self, chain: &str) -> RepositoryResult<Option<BigDecimal>> {
        let mut conn = self.pool.get().await?;
        Ok(BlockStatus::last_block_number(&mut conn, chain).await?)
    }

    async fn find_inscription_by_tick(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
    ) -> RepositoryResult<Option<Inscription>> {
        let mut conn = self.pool.get().await?;
        Ok(Inscription::find_by_tick(&mut conn, chain, protocol, tick).await?)
    }

    async fn find_inscription_stats(
        &self,
        ins_id: i64,
    ) -> RepositoryResult<Option<InscriptionStats>> {
        let mut conn = self.pool.get().await?;
        Ok(InscriptionStats::find_by_ins_id(&mut conn, ins_id).await?)
    }

    async fn find_balance(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
        address: &str,
    ) -> RepositoryResult<Option<Balance>> {
        let mut conn = self.pool.get().await?;
        Ok(Balance::find_by_tick(&mut conn, chain, protocol, tick, address).await?)
    }

    async fn find_transaction(
        &self,
        chain: &str,
        tx_hash: &str,
    ) -> RepositoryResult<Option<Transaction>> {
        let mut conn = self.pool.get().await?;
        Ok(Transaction::find(&mut conn, chain, tx_hash).await?)
    }

    async fn find_address_tx(
        &self,
        chain: &str,
        tx_hash: &str,
    ) -> RepositoryResult<Option<AddressTx>> {
        let mut conn = self.pool.get().await?;
        Ok(AddressTx::find_by_hash(&mut conn, chain, tx_hash).await?)
    }

    async fn list_inscriptions(
        &self,
        filter: &InscriptionFilter,
        sort: InscriptionSort,
        page: Page,
    ) -> RepositoryResult<Paginated<InscriptionOverview>> {
        let mut conn = self.pool.get().await?;

        let total: i64 = filtered_inscriptions!(filter)
            .count()
            .get_result(&mut *conn)
            .await?;

        let query = filtered_inscriptions!(filter).select((
            Inscription::as_select(),
            Option::<InscriptionStats>::as_select(),
        ));
        let query = match sort {
            InscriptionSort::Id => query.order(inscriptions::id.desc()),
            InscriptionSort::DeployTime => query.order(inscriptions::deploy_time.desc()),
            InscriptionSort::Progress => {
                query.order(sql::<Nullable<Numeric>>(PROGRESS_SQL).desc().nulls_last())
            }
            InscriptionSort::Holders => query.order(inscriptions_stats::holders.desc().nulls_last()),
            InscriptionSort::TxCount => query.order(inscriptions_stats::tx_cnt.desc().nulls_last()),
        };

        let rows: Vec<(Inscription, Option<InscriptionStats>)> = query
            .then_order_by(inscriptions::id.desc())
            .limit(page.limit)
            .offset(page.offset)
            .load(&mut *conn)
            .await?;

        Ok(Paginated {
            items: rows
                .into_iter()
                .map(|(inscription, stats)| InscriptionOverview { inscription, stats })
                .collect(),
            total,
        })
    }

    async fn list_address_transactions(
        &self,
        address: &str,
        filter: &TickFilter,
        event: Option<TxEvent>,
        page: Page,
    ) -> RepositoryResult<Paginated<AddressTransaction>> {
        let mut conn = self.pool.get().await?;

        let total: i64 = address_transactions!(address, filter, event)
            .count()
            .get_result(&mut *conn)
            .await?;

        let rows: Vec<(Transaction, AddressTx)> = address_transactions!(address, filter, event)
            .select((Transaction::as_select(), AddressTx::as_select()))
            .order(address_txs::id.desc())
            .limit(page.limit)
            .offset(page.offset)
            .load(&mut *conn)
            .await?;

        Ok(Paginated {
            items: rows
                .into_iter()
                .map(|(transaction, address_tx)| AddressTransaction {
                    transaction,
                    address_tx,
                })
                .collect(),
            total,
        })
    }

    async fn list_address_inscriptions(
        &self,
        address: &str,
        filter: &TickFilter,
        page: Page,
    ) -> RepositoryResult<Paginated<AddressInscription>> {
        let mut conn = self.pool.get().await?;

        let total: i64 = address_inscriptions!(address, filter)
            .count()
            .get_result(&mut *conn)
            .await?;

        let rows: Vec<(Balance, Option<Inscription>)> = address_inscriptions!(address, filter)
            .select((Balance::as_select(), Option::<Inscription>::as_select()))
            .order(balances::id.desc())
            .limit(page.limit)
            .offset(page.offset)
            .load(&mut *conn)
            .await?;

        Ok(Paginated {
            items: rows
                .into_iter()
                .map(|(balance, inscription)| AddressInscription {
                    balance,
                    inscription,
                })
                .collect(),
            total,
        })
    }

    async fn list_balances_by_address(
        &self,
        address: &str,
        filter: &TickFilter,
        page: Page,
    ) -> RepositoryResult<Paginated<Balance>> {
        let mut conn = self.pool.get().await?;

        let total: i64 = balances_of(address, filter)
            .count()
            .get_result(&mut *conn)
            .await?;
        let items = balances_of(address, filter)
            .select(Balance::as_select())
            .order(balances::id.desc())
            .limit(page.limit)
            .offset(page.offset)
            .load(&mut *conn)
            .await?;

        Ok(Paginated { items, total })
    }

    async fn list_holders(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
        page: Page,
    ) -> RepositoryResult<Paginated<Balance>> {
        let mut conn = self.pool.get().await?;

        let total: i64 = holders_of(chain, protocol, tick)
            .count()
            .get_result(&mut *conn)
            .await?;
        let items = holders_of(chain, protocol, tick)
            .select(Balance::as_select())
            .order(balances::id.desc())
            .limit(page.limit)
            .offset(page.offset)
            .load(&mut *conn)
            .await?;

        Ok(Paginated { items, total })
    }

    async fn count_unspent_utxos(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
        address: &str,
    ) -> RepositoryResult<i64> {
        let mut conn = self.pool.get().await?;
        Ok(Utxo::count_unspent(&mut conn, chain, protocol, tick, address).await?)
    }

    async fn list_unspent_utxos(
        &self,
        chain: &str,
        protocol: &str,
        tick: &str,
        address: &str,
    ) -> RepositoryResult<Vec<Utxo>> {
        let mut conn = self.pool.get().await?;
        Ok(Utxo::list_unspent_by_address(&mut conn, chain, protocol, tick, address).await?)
    }
}

#[cfg(test)]
#[async_trait]
impl IndexerOpsMut for Repository {
    async fn save_last_block(
        &self,
        chain: &str,
        block_hash: &str,
        block_number: &BigDecimal,
        block_time: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let (chain, block_hash, block_number) =
            (chain.to_string(), block_hash.to_string(), block_number.clone());
        self.write(|writer| {
            async move {
                writer
                    .save_last_block(&chain, &block_hash, &block_number, block_time)
                    .await
            }
            .scope_boxed()
        })
        .await
    }

    async fn update_balances(&self, chain: &str, items: &[Balance]) -> RepositoryResult<usize> {
        let chain = chain.to_string();
        let items = items.to_vec();
        self.write(|writer| {
            async move { writer.update_balances(&chain, &items).await }.scope_boxed()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use insc_indexer_db::{
        models::{NewAddressTx, NewBalance, NewInscription, NewInscriptionStats, NewTransaction},
        types::{Sid, TransferType},
    };

    use super::*;
    use crate::test_helpers::{setup_test_db, timestamp};

    fn amount(v: &str) -> BigDecimal {
        BigDecimal::from_str(v).unwrap()
    }

    fn inscription(sid: u32, tick: &str, supply: &str, deployed_at: i64) -> NewInscription {
        NewInscription {
            sid: Sid::new(sid),
            chain: "eth".to_string(),
            protocol: "ierc-20".to_string(),
            tick: tick.to_string(),
            name: tick.to_string(),
            limit_per_mint: amount("1000"),
            deploy_by: format!("0xdeployer{}", sid % 2),
            total_supply: amount(supply),
            decimals: 18,
            deploy_hash: format!("0xdeploy{}", sid),
            deploy_time: timestamp(deployed_at),
            transfer_type: TransferType::Hash,
        }
    }

    fn stats(sid: u32, ins_id: i64, tick: &str, minted: &str, holders: i64) -> NewInscriptionStats {
        NewInscriptionStats {
            sid: Sid::new(sid),
            ins_id,
            chain: "eth".to_string(),
            protocol: "ierc-20".to_string(),
            tick: tick.to_string(),
            minted: amount(minted),
            mint_completed_time: None,
            mint_first_block: 0,
            mint_last_block: 0,
            holders,
            tx_cnt: holders * 3,
        }
    }

    fn balance(sid: u32, tick: &str, address: &str, total: &str) -> NewBalance {
        NewBalance {
            sid: Sid::new(sid),
            chain: "eth".to_string(),
            protocol: "ierc-20".to_string(),
            tick: tick.to_string(),
            address: address.to_string(),
            balance: amount(total),
            available: amount(total),
        }
    }

    async fn seeded_repository() -> (
        testcontainers::ContainerAsync<testcontainers_modules::postgres::Postgres>,
        Repository,
    ) {
        let (container, config) = setup_test_db().await;
        let repo = Repository::new(&config).await.expect("able to create repository");

        repo.write(|writer| {
            async move {
                writer
                    .add_inscriptions(&[
                        inscription(1, "ethi", "1000", 100),
                        inscription(2, "eths", "1000", 300),
                        inscription(3, "ierc", "0", 200),
                    ])
                    .await?;
                writer
                    .add_inscription_stats(&[
                        stats(1, 1, "ethi", "900", 5),
                        stats(2, 2, "eths", "100", 50),
                    ])
                    .await?;
                writer
                    .add_balances(&[
                        balance(1, "ethi", "0xalice", "10"),
                        balance(2, "eths", "0xalice", "0"),
                        balance(3, "ethi", "0xbob", "5"),
                    ])
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .expect("able to seed");

        (container, repo)
    }

    #[tokio::test]
    #[ignore = "Requires a Docker daemon to start the postgres container"]
    async fn lists_inscriptions_by_progress() {
        let (_container, repo) = seeded_repository().await;

        let page = repo
            .list_inscriptions(
                &InscriptionFilter::default(),
                InscriptionSort::Progress,
                Page::new(10, 0),
            )
            .await
            .expect("able to list inscriptions");

        assert_eq!(page.total, 3);
        let ticks: Vec<_> = page
            .items
            .iter()
            .map(|o| o.inscription.tick.as_str())
            .collect();
        // No stats and a zero supply have no progress and sort last.
        assert_eq!(ticks, vec!["ethi", "eths", "ierc"]);
        assert_eq!(page.items[0].progress(), Some(amount("0.9")));
    }

    #[tokio::test]
    #[ignore = "Requires a Docker daemon to start the postgres container"]
    async fn filters_and_paginates_inscriptions() {
        let (_container, repo) = seeded_repository().await;
        let filter = InscriptionFilter {
            deploy_by: Some("0xdeployer1".to_string()),
            ..Default::default()
        };

        let page = repo
            .list_inscriptions(&filter, InscriptionSort::DeployTime, Page::new(1, 0))
            .await
            .expect("able to list inscriptions");

        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].inscription.tick, "ierc");
    }

    #[tokio::test]
    #[ignore = "Requires a Docker daemon to start the postgres container"]
    async fn holders_and_address_inscriptions_skip_empty_balances() {
        let (_container, repo) = seeded_repository().await;

        let holders = repo
            .list_holders("eth", "ierc-20", "ethi", Page::new(10, 0))
            .await
            .unwrap();
        assert_eq!(holders.total, 2);

        let held = repo
            .list_address_inscriptions("0xalice", &TickFilter::default(), Page::new(10, 0))
            .await
            .unwrap();
        assert_eq!(held.total, 1);
        assert_eq!(
            held.items[0].inscription.as_ref().map(|i| i.tick.as_str()),
            Some("ethi")
        );

        let all = repo
            .list_balances_by_address("0xalice", &TickFilter::default(), Page::new(10, 0))
            .await
            .unwrap();
        assert_eq!(all.total, 2);
    }

    #[tokio::test]
    #[ignore = "Requires a Docker daemon to start the postgres container"]
    async fn address_transactions_filter_by_event() {
        let (_container, repo) = seeded_repository().await;
        repo.write(|writer| {
            async move {
                let tx = |hash: &str, op: &str| NewTransaction {
                    chain: "eth".to_string(),
                    protocol: "ierc-20".to_string(),
                    block_height: 1,
                    position_in_block: 0,
                    block_time: timestamp(1_000),
                    tx_hash: hash.to_string(),
                    from_address: "0xalice".to_string(),
                    to_address: "0xbob".to_string(),
                    op: op.to_string(),
                    tick: "ethi".to_string(),
                    amount: amount("1"),
                    gas: 21_000,
                    gas_price: amount("1"),
                    status: 1,
                };
                let link = |hash: &str, event: TxEvent| NewAddressTx {
                    chain: "eth".to_string(),
                    event: event as i16,
                    protocol: "ierc-20".to_string(),
                    tx_hash: hash.to_string(),
                    address: "0xalice".to_string(),
                    related_address: "0xbob".to_string(),
                    amount: amount("1"),
                    tick: "ethi".to_string(),
                };
                writer
                    .add_transactions(&[tx("0x01", "mint"), tx("0x02", "transfer")])
                    .await?;
                writer
                    .add_address_txs(&[link("0x01", TxEvent::Mint), link("0x02", TxEvent::Transfer)])
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .unwrap();

        let all = repo
            .list_address_transactions("0xalice", &TickFilter::default(), None, Page::new(10, 0))
            .await
            .unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].transaction.tx_hash, "0x02");

        let mints = repo
            .list_address_transactions(
                "0xalice",
                &TickFilter::default(),
                Some(TxEvent::Mint),
                Page::new(10, 0),
            )
            .await
            .unwrap();
        assert_eq!(mints.total, 1);
        assert_eq!(mints.items[0].address_tx.tx_hash, "0x01");
    }

    #[tokio::test]
    #[ignore = "Requires a Docker daemon to start the postgres container"]
    async fn batch_balance_updates_go_through_the_writer() {
        let (_container, repo) = seeded_repository().await;
        let mut alice = repo
            .find_balance("eth", "ierc-20", "ethi", "0xalice")
            .await
            .unwrap()
            .unwrap();
        alice.available = amount("4");
        alice.balance = amount("6");
        let mut ghost = alice.clone();
        ghost.sid = Sid::new(999);

        let changed = repo.update_balances("eth", &[alice, ghost]).await.unwrap();
        assert_eq!(changed, 1);

        let stored = repo
            .find_balance("eth", "ierc-20", "ethi", "0xalice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.available, amount("4"));
        assert_eq!(stored.balance, amount("6"));
    }

    #[tokio::test]
    #[ignore = "Requires a Docker daemon to start the postgres container"]
    async fn failed_write_rolls_back() {
        let (_container, repo) = seeded_repository().await;

        let result: RepositoryResult<()> = repo
            .write(|writer| {
                async move {
                    writer
                        .save_last_block("eth", "0xabc", &amount("42"), timestamp(5))
                        .await?;
                    Err(crate::repository::error::RepositoryError::invalid_input("abort"))
                }
                .scope_boxed()
            })
            .await;
        assert!(result.is_err());

        assert_eq!(repo.last_block_number("eth").await.unwrap(), None);

        repo.save_last_block("eth", "0xabc", &amount("42"), timestamp(5))
            .await
            .unwrap();
        assert_eq!(repo.last_block_number("eth").await.unwrap(), Some(amount("42")));
    }
}
