use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::{schema::address_txs, types::TxEvent};

/// Links an address to a transaction it took part in.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = address_txs)]
pub struct AddressTx {
    pub id: i64,
    pub chain: String,
    /// See [`TxEvent`].
    pub event: i16,
    pub protocol: String,
    pub tx_hash: String,
    pub address: String,
    /// Counterparty of the transfer, empty for deploys and mints.
    pub related_address: String,
    pub amount: BigDecimal,
    pub tick: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = address_txs)]
pub struct NewAddressTx {
    pub chain: String,
    pub event: i16,
    pub protocol: String,
    pub tx_hash: String,
    pub address: String,
    pub related_address: String,
    pub amount: BigDecimal,
    pub tick: String,
}

impl AddressTx {
    pub fn event(&self) -> Option<TxEvent> {
        TxEvent::try_from(self.event).ok()
    }

    pub async fn batch_insert(
        conn: &mut AsyncPgConnection,
        items: &[NewAddressTx],
    ) -> Result<usize, diesel::result::Error> {
        if items.is_empty() {
            return Ok(0);
        }
        diesel::insert_into(address_txs::table)
            .values(items)
            .execute(conn)
            .await
    }

    pub async fn find_by_hash(
        conn: &mut AsyncPgConnection,
        chain: &str,
        tx_hash: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        address_txs::table
            .filter(address_txs::chain.eq(chain))
            .filter(address_txs::tx_hash.eq(tx_hash))
            .select(AddressTx::as_select())
            .first(conn)
            .await
            .optional()
    }
}
