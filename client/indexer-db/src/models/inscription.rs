use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::{prelude::*, Column};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::{
    batch::{update_by_sid, BatchExecutor, BatchResult, PatchColumn, PatchSource, PatchValue},
    schema::inscriptions,
    types::{Sid, TransferType},
};

/// Table that holds the inscriptions (tokens) deployed on every indexed chain.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = inscriptions)]
pub struct Inscription {
    /// The ID of the inscription as stored in the database. For the indexer id, use `sid`.
    pub id: i64,
    pub sid: Sid,
    pub chain: String,
    pub protocol: String,
    pub tick: String,
    pub name: String,
    pub limit_per_mint: BigDecimal,
    pub deploy_by: String,
    pub total_supply: BigDecimal,
    pub decimals: i16,
    pub deploy_hash: String,
    pub deploy_time: NaiveDateTime,
    pub transfer_type: TransferType,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = inscriptions)]
pub struct NewInscription {
    pub sid: Sid,
    pub chain: String,
    pub protocol: String,
    pub tick: String,
    pub name: String,
    pub limit_per_mint: BigDecimal,
    pub deploy_by: String,
    pub total_supply: BigDecimal,
    pub decimals: i16,
    pub deploy_hash: String,
    pub deploy_time: NaiveDateTime,
    pub transfer_type: TransferType,
}

fn transfer_type_value(ins: &Inscription) -> PatchValue {
    PatchValue::SmallInt(i16::from(ins.transfer_type))
}

impl PatchSource for Inscription {
    const TABLE: &'static str = "inscriptions";
    const COLUMNS: &'static [PatchColumn<Self>] = &[PatchColumn {
        name: <inscriptions::transfer_type as Column>::NAME,
        extract: transfer_type_value,
    }];

    fn sid(&self) -> Sid {
        self.sid
    }
}

impl Inscription {
    pub async fn batch_insert(
        conn: &mut AsyncPgConnection,
        items: &[NewInscription],
    ) -> Result<usize, diesel::result::Error> {
        if items.is_empty() {
            return Ok(0);
        }
        diesel::insert_into(inscriptions::table)
            .values(items)
            .execute(conn)
            .await
    }

    /// Write the `transfer_type` of every item back to its row on `chain`.
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
    ) -> Result<Option<Self>, diesel::result::Error> {
        inscriptions::table
            .filter(inscriptions::chain.eq(chain))
            .filter(inscriptions::protocol.eq(protocol))
            .filter(inscriptions::tick.eq(tick))
            .select(Inscription::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// Page through all inscriptions by database id, starting after `start`.
    pub async fn list_after_id(
        conn: &mut AsyncPgConnection,
        start: i64,
        limit: i64,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        inscriptions::table
            .filter(inscriptions::id.gt(start))
            .order(inscriptions::id.asc())
            .limit(limit)
            .select(Inscription::as_select())
            .load(conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::executor::tests::RecordingExecutor;

    pub(crate) fn inscription(sid: u32, transfer_type: TransferType) -> Inscription {
        let now = chrono::DateTime::from_timestamp(1_700_000_000, 0)
            .unwrap()
            .naive_utc();
        Inscription {
            id: i64::from(sid),
            sid: Sid::new(sid),
            chain: "eth".to_string(),
            protocol: "ierc-20".to_string(),
            tick: "ethi".to_string(),
            name: "ethi".to_string(),
            limit_per_mint: BigDecimal::from(1000),
            deploy_by: "0xdeployer".to_string(),
            total_supply: BigDecimal::from(21_000_000),
            decimals: 18,
            deploy_hash: "0xhash".to_string(),
            deploy_time: now,
            transfer_type,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn patches_only_the_transfer_type() {
        let patch = inscription(4, TransferType::Event).to_patch();
        assert_eq!(patch.sid, Sid::new(4));
        assert_eq!(patch.values, vec![PatchValue::SmallInt(1)]);
        assert_eq!(Inscription::COLUMNS.len(), 1);
        assert_eq!(Inscription::COLUMNS[0].name, "transfer_type");
    }

    #[test]
    fn every_transfer_type_binds_its_discriminant() {
        let values: Vec<_> = [TransferType::Hash, TransferType::Event, TransferType::Utxo]
            .into_iter()
            .map(|transfer_type| transfer_type_value(&inscription(1, transfer_type)))
            .collect();
        assert_eq!(
            values,
            vec![
                PatchValue::SmallInt(0),
                PatchValue::SmallInt(1),
                PatchValue::SmallInt(2)
            ]
        );
    }

    #[tokio::test]
    async fn empty_input_skips_the_executor() {
        let mut executor = RecordingExecutor::default();
        let rows = Inscription::batch_update(&mut executor, "eth", &[])
            .await
            .unwrap();
        assert_eq!(rows, 0);
        assert!(executor.statements.is_empty());
    }

    #[tokio::test]
    async fn batch_update_targets_the_inscriptions_table() {
        let mut executor = RecordingExecutor::default();
        let items = vec![
            inscription(1, TransferType::Hash),
            inscription(2, TransferType::Utxo),
        ];

        let rows = Inscription::batch_update(&mut executor, "eth", &items)
            .await
            .unwrap();

        assert_eq!(rows, 2);
        let statement = &executor.statements[0];
        assert_eq!(statement.table(), "inscriptions");
        assert_eq!(statement.chain(), "eth");
        assert_eq!(statement.columns(), &["transfer_type"]);
    }
}
