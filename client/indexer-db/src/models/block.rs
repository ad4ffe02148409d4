use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::{prelude::*, upsert::excluded};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::schema::block;

/// Scan progress of a chain: one row per chain holding the last indexed block.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = block)]
pub struct BlockStatus {
    pub chain: String,
    pub block_hash: String,
    /// Block numbers can exceed `i64` on some chains, so they are kept as decimals.
    pub block_number: BigDecimal,
    pub block_time: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl BlockStatus {
    /// Record `block_number` as the last indexed block of `chain`.
    pub async fn save(
        conn: &mut AsyncPgConnection,
        chain: &str,
        block_hash: &str,
        block_number: &BigDecimal,
        block_time: NaiveDateTime,
    ) -> Result<Self, diesel::result::Error> {
        diesel::insert_into(block::table)
            .values((
                block::chain.eq(chain),
                block::block_hash.eq(block_hash),
                block::block_number.eq(block_number),
                block::block_time.eq(block_time),
            ))
            .on_conflict(block::chain)
            .do_update()
            .set((
                block::block_hash.eq(excluded(block::block_hash)),
                block::block_number.eq(excluded(block::block_number)),
                block::block_time.eq(excluded(block::block_time)),
                block::updated_at.eq(diesel::dsl::now),
            ))
            .returning(BlockStatus::as_select())
            .get_result(conn)
            .await
    }

    pub async fn get(
        conn: &mut AsyncPgConnection,
        chain: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        block::table
            .filter(block::chain.eq(chain))
            .select(BlockStatus::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// Last indexed block number of `chain`, `None` before the first block is saved.
    pub async fn last_block_number(
        conn: &mut AsyncPgConnection,
        chain: &str,
    ) -> Result<Option<BigDecimal>, diesel::result::Error> {
        block::table
            .filter(block::chain.eq(chain))
            .select(block::block_number)
            .order(block::block_number.desc())
            .first(conn)
            .await
            .optional()
    }
}
