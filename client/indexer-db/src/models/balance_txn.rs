use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::{schema::balance_txn, types::TxEvent};

/// Journal entry of a balance change, with the resulting balance snapshot.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = balance_txn)]
pub struct BalanceTxn {
    pub id: i64,
    pub chain: String,
    pub protocol: String,
    /// See [`TxEvent`].
    pub event: i16,
    pub address: String,
    pub tick: String,
    pub amount: BigDecimal,
    pub available: BigDecimal,
    pub balance: BigDecimal,
    pub tx_hash: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = balance_txn)]
pub struct NewBalanceTxn {
    pub chain: String,
    pub protocol: String,
    pub event: i16,
    pub address: String,
    pub tick: String,
    pub amount: BigDecimal,
    pub available: BigDecimal,
    pub balance: BigDecimal,
    pub tx_hash: String,
}

impl BalanceTxn {
    pub fn event(&self) -> Option<TxEvent> {
        TxEvent::try_from(self.event).ok()
    }

    pub async fn batch_insert(
        conn: &mut AsyncPgConnection,
        items: &[NewBalanceTxn],
    ) -> Result<usize, diesel::result::Error> {
        if items.is_empty() {
            return Ok(0);
        }
        diesel::insert_into(balance_txn::table)
            .values(items)
            .execute(conn)
            .await
    }
}
