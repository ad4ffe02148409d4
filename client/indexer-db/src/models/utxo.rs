use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::{
    schema::utxos,
    types::{Sid, UtxoStatus},
};

/// An output carrying inscription balance on UTXO based chains.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = utxos)]
pub struct Utxo {
    pub id: i64,
    pub sid: Sid,
    pub chain: String,
    pub protocol: String,
    pub tick: String,
    pub address: String,
    pub root_hash: String,
    pub tx_hash: String,
    pub amount: BigDecimal,
    /// See [`UtxoStatus`].
    pub status: i16,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = utxos)]
pub struct NewUtxo {
    pub sid: Sid,
    pub chain: String,
    pub protocol: String,
    pub tick: String,
    pub address: String,
    pub root_hash: String,
    pub tx_hash: String,
    pub amount: BigDecimal,
    pub status: i16,
}

const UNSPENT: i16 = UtxoStatus::Unspent as i16;

impl Utxo {
    pub fn status(&self) -> Option<UtxoStatus> {
        UtxoStatus::try_from(self.status).ok()
    }

    pub async fn batch_insert(
        conn: &mut AsyncPgConnection,
        items: &[NewUtxo],
    ) -> Result<usize, diesel::result::Error> {
        if items.is_empty() {
            return Ok(0);
        }
        diesel::insert_into(utxos::table)
            .values(items)
            .execute(conn)
            .await
    }

    /// Number of unspent outputs `address` holds for an inscription.
    pub async fn count_unspent(
        conn: &mut AsyncPgConnection,
        chain: &str,
        protocol: &str,
        tick: &str,
        address: &str,
    ) -> Result<i64, diesel::result::Error> {
        utxos::table
            .filter(utxos::chain.eq(chain))
            .filter(utxos::protocol.eq(protocol))
            .filter(utxos::tick.eq(tick))
            .filter(utxos::address.eq(address))
            .filter(utxos::status.eq(UNSPENT))
            .count()
            .get_result(conn)
            .await
    }

    pub async fn list_unspent_after_id(
        conn: &mut AsyncPgConnection,
        start: i64,
        limit: i64,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        utxos::table
            .filter(utxos::status.eq(UNSPENT))
            .filter(utxos::id.gt(start))
            .order(utxos::id.asc())
            .limit(limit)
            .select(Utxo::as_select())
            .load(conn)
            .await
    }

    pub async fn find_by_address(
        conn: &mut AsyncPgConnection,
        chain: &str,
        address: &str,
        tick: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        utxos::table
            .filter(utxos::chain.eq(chain))
            .filter(utxos::address.eq(address))
            .filter(utxos::tick.eq(tick))
            .select(Utxo::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// First unspent output of `address` created by the transfer rooted at `root_hash`.
    pub async fn first_unspent_by_root_hash(
        conn: &mut AsyncPgConnection,
        chain: &str,
        root_hash: &str,
        address: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        utxos::table
            .filter(utxos::chain.eq(chain))
            .filter(utxos::root_hash.eq(root_hash))
            .filter(utxos::address.eq(address))
            .filter(utxos::status.eq(UNSPENT))
            .order(utxos::id.asc())
            .select(Utxo::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn first_by_root_hash(
        conn: &mut AsyncPgConnection,
        chain: &str,
        root_hash: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        utxos::table
            .filter(utxos::chain.eq(chain))
            .filter(utxos::root_hash.eq(root_hash))
            .order(utxos::id.asc())
            .select(Utxo::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// Unspent outputs of `address`, newest first.
    pub async fn list_unspent_by_address(
        conn: &mut AsyncPgConnection,
        chain: &str,
        protocol: &str,
        tick: &str,
        address: &str,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        utxos::table
            .filter(utxos::chain.eq(chain))
            .filter(utxos::protocol.eq(protocol))
            .filter(utxos::tick.eq(tick))
            .filter(utxos::address.eq(address))
            .filter(utxos::status.eq(UNSPENT))
            .order(utxos::id.desc())
            .select(Utxo::as_select())
            .load(conn)
            .await
    }

    /// Mark the outputs with the given SIDs on `chain` as spent.
    pub async fn mark_spent(
        conn: &mut AsyncPgConnection,
        chain: &str,
        sids: &[Sid],
    ) -> Result<usize, diesel::result::Error> {
        if sids.is_empty() {
            return Ok(0);
        }
        diesel::update(utxos::table)
            .filter(utxos::chain.eq(chain))
            .filter(utxos::sid.eq_any(sids))
            .set((
                utxos::status.eq(UtxoStatus::Spent as i16),
                utxos::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await
    }
}
