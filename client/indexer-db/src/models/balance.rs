use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::{prelude::*, Column};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::{
    batch::{update_by_sid, BatchExecutor, BatchResult, PatchColumn, PatchSource, PatchValue},
    schema::balances,
    types::Sid,
};

/// Holdings of one address for one inscription.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = balances)]
pub struct Balance {
    pub id: i64,
    pub sid: Sid,
    pub chain: String,
    pub protocol: String,
    pub tick: String,
    pub address: String,
    /// Total holdings, including the part locked in pending transfers.
    pub balance: BigDecimal,
    /// Spendable part of `balance`.
    pub available: BigDecimal,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = balances)]
pub struct NewBalance {
    pub sid: Sid,
    pub chain: String,
    pub protocol: String,
    pub tick: String,
    pub address: String,
    pub balance: BigDecimal,
    pub available: BigDecimal,
}

fn available_value(balance: &Balance) -> PatchValue {
    PatchValue::Numeric(balance.available.clone())
}

fn balance_value(balance: &Balance) -> PatchValue {
    PatchValue::Numeric(balance.balance.clone())
}

impl PatchSource for Balance {
    const TABLE: &'static str = "balances";
    const COLUMNS: &'static [PatchColumn<Self>] = &[
        PatchColumn {
            name: <balances::available as Column>::NAME,
            extract: available_value,
        },
        PatchColumn {
            name: <balances::balance as Column>::NAME,
            extract: balance_value,
        },
    ];

    fn sid(&self) -> Sid {
        self.sid
    }
}

impl Balance {
    pub async fn batch_insert(
        conn: &mut AsyncPgConnection,
        items: &[NewBalance],
    ) -> Result<usize, diesel::result::Error> {
        if items.is_empty() {
            return Ok(0);
        }
        diesel::insert_into(balances::table)
            .values(items)
            .execute(conn)
            .await
    }

    /// Write `available` and `balance` of every item back to its row on `chain`.
    pub async fn batch_update<E>(executor: &mut E, chain: &str, items: &[Self]) -> BatchResult<usize>
    where
        E: BatchExecutor + ?Sized,
    {
        update_by_sid(executor, chain, items).await
    }

    pub async fn find_by_tick(
        conn: &mut AsyncPgConnection,
        chain: &str,
        protocol: &str,
        tick: &str,
        address: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        balances::table
            .filter(balances::chain.eq(chain))
            .filter(balances::protocol.eq(protocol))
            .filter(balances::tick.eq(tick))
            .filter(balances::address.eq(address))
            .select(Balance::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn list_after_id(
        conn: &mut AsyncPgConnection,
        start: i64,
        limit: i64,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        balances::table
            .filter(balances::id.gt(start))
            .order(balances::id.asc())
            .limit(limit)
            .select(Balance::as_select())
            .load(conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::batch::executor::tests::RecordingExecutor;

    fn balance(sid: u32, available: &str, total: &str) -> Balance {
        let now = chrono::DateTime::from_timestamp(1_700_000_000, 0)
            .unwrap()
            .naive_utc();
        Balance {
            id: i64::from(sid),
            sid: Sid::new(sid),
            chain: "btc".to_string(),
            protocol: "brc-20".to_string(),
            tick: "ordi".to_string(),
            address: format!("bc1q{}", sid),
            balance: BigDecimal::from_str(total).unwrap(),
            available: BigDecimal::from_str(available).unwrap(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn writes_available_then_balance() {
        let mut executor = RecordingExecutor::default();
        let items = vec![balance(1, "100.5", "200"), balance(2, "0", "50")];

        let rows = Balance::batch_update(&mut executor, "btc", &items)
            .await
            .unwrap();

        assert_eq!(rows, 2);
        let statement = &executor.statements[0];
        assert_eq!(statement.table(), "balances");
        assert_eq!(statement.columns(), &["available", "balance"]);
        assert_eq!(statement.bind_count(), 11);

        let sql = &executor.rendered()[0];
        assert!(sql.starts_with(
            "UPDATE \"balances\" SET \"available\" = CASE \"sid\" WHEN $1 THEN $2 WHEN $3 THEN $4 END"
        ));
        // Amounts travel as parameters only.
        let (text, _) = sql.split_once(" -- binds: ").unwrap();
        assert!(!text.contains("100.5"));
    }

    #[tokio::test]
    async fn empty_chain_is_rejected_before_execution() {
        let mut executor = RecordingExecutor::default();

        let err = Balance::batch_update(&mut executor, "", &[balance(1, "1", "1")])
            .await
            .unwrap_err();

        assert!(err.is_precondition());
        assert!(executor.statements.is_empty());
    }
}
