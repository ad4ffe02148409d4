use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDateTime;
use diesel::{prelude::*, Column};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::{
    batch::{update_by_sid, BatchExecutor, BatchResult, PatchColumn, PatchSource, PatchValue},
    schema::inscriptions_stats,
    types::Sid,
};

/// Running statistics of an inscription: minting progress, holders and transfer count.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = inscriptions_stats)]
pub struct InscriptionStats {
    pub id: i64,
    pub sid: Sid,
    /// Database id of the [`Inscription`](super::Inscription) these stats belong to.
    pub ins_id: i64,
    pub chain: String,
    pub protocol: String,
    pub tick: String,
    pub minted: BigDecimal,
    pub mint_completed_time: Option<NaiveDateTime>,
    pub mint_first_block: i64,
    pub mint_last_block: i64,
    pub holders: i64,
    pub tx_cnt: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = inscriptions_stats)]
pub struct NewInscriptionStats {
    pub sid: Sid,
    pub ins_id: i64,
    pub chain: String,
    pub protocol: String,
    pub tick: String,
    pub minted: BigDecimal,
    pub mint_completed_time: Option<NaiveDateTime>,
    pub mint_first_block: i64,
    pub mint_last_block: i64,
    pub holders: i64,
    pub tx_cnt: i64,
}

/// Partial update of a stats row. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = inscriptions_stats)]
pub struct InscriptionStatsChangeset {
    pub minted: Option<BigDecimal>,
    pub mint_completed_time: Option<NaiveDateTime>,
    pub mint_first_block: Option<i64>,
    pub mint_last_block: Option<i64>,
    pub holders: Option<i64>,
    pub tx_cnt: Option<i64>,
}

impl InscriptionStatsChangeset {
    /// Changes a mint brings to `stats`: only the counters that moved past zero
    /// and a completion time when minting has finished.
    pub fn for_mint(stats: &InscriptionStats) -> Self {
        Self {
            minted: (stats.minted > BigDecimal::zero()).then(|| stats.minted.clone()),
            mint_completed_time: stats
                .mint_completed_time
                .filter(|t| t.and_utc().timestamp() > 0),
            mint_first_block: (stats.mint_first_block > 0).then_some(stats.mint_first_block),
            mint_last_block: (stats.mint_last_block > 0).then_some(stats.mint_last_block),
            holders: (stats.holders > 0).then_some(stats.holders),
            tx_cnt: (stats.tx_cnt > 0).then_some(stats.tx_cnt),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn minted_value(stats: &InscriptionStats) -> PatchValue {
    PatchValue::Numeric(stats.minted.clone())
}

fn holders_value(stats: &InscriptionStats) -> PatchValue {
    PatchValue::BigInt(stats.holders)
}

fn tx_cnt_value(stats: &InscriptionStats) -> PatchValue {
    PatchValue::BigInt(stats.tx_cnt)
}

impl PatchSource for InscriptionStats {
    const TABLE: &'static str = "inscriptions_stats";
    const COLUMNS: &'static [PatchColumn<Self>] = &[
        PatchColumn {
            name: <inscriptions_stats::minted as Column>::NAME,
            extract: minted_value,
        },
        PatchColumn {
            name: <inscriptions_stats::holders as Column>::NAME,
            extract: holders_value,
        },
        PatchColumn {
            name: <inscriptions_stats::tx_cnt as Column>::NAME,
            extract: tx_cnt_value,
        },
    ];

    fn sid(&self) -> Sid {
        self.sid
    }
}

impl InscriptionStats {
    pub async fn batch_insert(
        conn: &mut AsyncPgConnection,
        items: &[NewInscriptionStats],
    ) -> Result<usize, diesel::result::Error> {
        if items.is_empty() {
            return Ok(0);
        }
        diesel::insert_into(inscriptions_stats::table)
            .values(items)
            .execute(conn)
            .await
    }

    /// Write `minted`, `holders` and `tx_cnt` of every item back to its row on `chain`.
    pub async fn batch_update<E>(executor: &mut E, chain: &str, items: &[Self]) -> BatchResult<usize>
    where
        E: BatchExecutor + ?Sized,
    {
        update_by_sid(executor, chain, items).await
    }

    /// Apply `changes` to the single stats row identified by `chain` and `sid`.
    pub async fn update_by_sid(
        conn: &mut AsyncPgConnection,
        chain: &str,
        sid: Sid,
        changes: &InscriptionStatsChangeset,
    ) -> Result<usize, diesel::result::Error> {
        if changes.is_empty() {
            return Ok(0);
        }
        diesel::update(inscriptions_stats::table)
            .filter(inscriptions_stats::chain.eq(chain))
            .filter(inscriptions_stats::sid.eq(sid))
            .set((changes, inscriptions_stats::updated_at.eq(diesel::dsl::now)))
            .execute(conn)
            .await
    }

    /// Persist the mint progress of `stats`, matching the row by chain, protocol and tick.
    pub async fn update_for_mint(
        conn: &mut AsyncPgConnection,
        stats: &InscriptionStats,
    ) -> Result<usize, diesel::result::Error> {
        let changes = InscriptionStatsChangeset::for_mint(stats);
        if changes.is_empty() {
            return Ok(0);
        }
        diesel::update(inscriptions_stats::table)
            .filter(inscriptions_stats::chain.eq(&stats.chain))
            .filter(inscriptions_stats::protocol.eq(&stats.protocol))
            .filter(inscriptions_stats::tick.eq(&stats.tick))
            .set((&changes, inscriptions_stats::updated_at.eq(diesel::dsl::now)))
            .execute(conn)
            .await
    }

    pub async fn find_by_ins_id(
        conn: &mut AsyncPgConnection,
        ins_id: i64,
    ) -> Result<Option<Self>, diesel::result::Error> {
        inscriptions_stats::table
            .filter(inscriptions_stats::ins_id.eq(ins_id))
            .select(InscriptionStats::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn list_after_id(
        conn: &mut AsyncPgConnection,
        start: i64,
        limit: i64,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        inscriptions_stats::table
            .filter(inscriptions_stats::id.gt(start))
            .order(inscriptions_stats::id.asc())
            .limit(limit)
            .select(InscriptionStats::as_select())
            .load(conn)
            .await
    }
}
