use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::schema::txs;

/// An on-chain transaction carrying an inscription operation.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = txs)]
pub struct Transaction {
    pub id: i64,
    pub chain: String,
    pub protocol: String,
    pub block_height: i64,
    pub position_in_block: i64,
    pub block_time: NaiveDateTime,
    pub tx_hash: String,
    pub from_address: String,
    pub to_address: String,
    /// Inscription operation, e.g. `deploy`, `mint` or `transfer`.
    pub op: String,
    pub tick: String,
    pub amount: BigDecimal,
    pub gas: i64,
    pub gas_price: BigDecimal,
    pub status: i16,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = txs)]
pub struct NewTransaction {
    pub chain: String,
    pub protocol: String,
    pub block_height: i64,
    pub position_in_block: i64,
    pub block_time: NaiveDateTime,
    pub tx_hash: String,
    pub from_address: String,
    pub to_address: String,
    pub op: String,
    pub tick: String,
    pub amount: BigDecimal,
    pub gas: i64,
    pub gas_price: BigDecimal,
    pub status: i16,
}

impl Transaction {
    pub async fn batch_insert(
        conn: &mut AsyncPgConnection,
        items: &[NewTransaction],
    ) -> Result<usize, diesel::result::Error> {
        if items.is_empty() {
            return Ok(0);
        }
        diesel::insert_into(txs::table)
            .values(items)
            .execute(conn)
            .await
    }

    pub async fn find(
        conn: &mut AsyncPgConnection,
        chain: &str,
        tx_hash: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        txs::table
            .filter(txs::chain.eq(chain))
            .filter(txs::tx_hash.eq(tx_hash))
            .select(Transaction::as_select())
            .first(conn)
            .await
            .optional()
    }
}
