//! The compiled update-by-SID statement.
//!
//! For every column `c` the statement sets
//!
//! ```sql
//! "c" = CASE "sid" WHEN $1 THEN $2 WHEN $3 THEN $4 ... END
//! ```
//!
//! and restricts itself to `WHERE "chain" = $n AND "sid" IN (...)`. SIDs, values and
//! the chain are bound parameters; table and column names are quoted identifiers.

use diesel::{
    pg::Pg,
    query_builder::{AstPass, QueryFragment, QueryId},
    sql_types::{BigInt, Numeric, SmallInt, Text},
    QueryResult,
};

use super::patch::{bind_count, PatchValue, RowPatch};
use crate::types::Sid;

/// Column correlating patches with rows.
pub const SID_COLUMN: &str = "sid";
/// Column holding the chain a row belongs to.
pub const CHAIN_COLUMN: &str = "chain";

/// A validated, de-duplicated batch ready to be executed.
///
/// Built by [`BatchPatchSet::compile`](super::BatchPatchSet::compile).
#[derive(Debug, Clone)]
pub struct BatchUpdate {
    table: &'static str,
    chain: String,
    columns: Vec<&'static str>,
    patches: Vec<RowPatch>,
}

impl BatchUpdate {
    pub(crate) fn new(
        table: &'static str,
        chain: String,
        columns: Vec<&'static str>,
        patches: Vec<RowPatch>,
    ) -> Self {
        Self {
            table,
            chain,
            columns,
            patches,
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    pub fn patches(&self) -> &[RowPatch] {
        &self.patches
    }

    /// SIDs of the `IN (...)` filter, in statement order.
    pub fn sids(&self) -> impl Iterator<Item = Sid> + '_ {
        self.patches.iter().map(|patch| patch.sid)
    }

    /// Number of distinct rows the statement targets.
    pub fn row_count(&self) -> usize {
        self.patches.len()
    }

    pub fn bind_count(&self) -> usize {
        bind_count(self.columns.len(), self.patches.len())
    }
}

impl QueryFragment<Pg> for PatchValue {
    fn walk_ast<'b>(&'b self, mut out: AstPass<'_, 'b, Pg>) -> QueryResult<()> {
        match self {
            PatchValue::SmallInt(v) => out.push_bind_param::<SmallInt, _>(v),
            PatchValue::BigInt(v) => out.push_bind_param::<BigInt, _>(v),
            PatchValue::Numeric(v) => out.push_bind_param::<Numeric, _>(v),
            PatchValue::Text(v) => out.push_bind_param::<Text, _>(v),
        }
    }
}

impl QueryFragment<Pg> for BatchUpdate {
    fn walk_ast<'b>(&'b self, mut out: AstPass<'_, 'b, Pg>) -> QueryResult<()> {
        // The shape depends on the batch size, caching it would only grow the cache.
        out.unsafe_to_cache_prepared();

        out.push_sql("UPDATE ");
        out.push_identifier(self.table)?;
        out.push_sql(" SET ");
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                out.push_sql(", ");
            }
            out.push_identifier(column)?;
            out.push_sql(" = CASE ");
            out.push_identifier(SID_COLUMN)?;
            for patch in &self.patches {
                out.push_sql(" WHEN ");
                out.push_bind_param::<BigInt, _>(&patch.sid)?;
                out.push_sql(" THEN ");
                patch.values[idx].walk_ast(out.reborrow())?;
            }
            out.push_sql(" END");
        }

        out.push_sql(" WHERE ");
        out.push_identifier(CHAIN_COLUMN)?;
        out.push_sql(" = ");
        out.push_bind_param::<Text, _>(&self.chain)?;
        out.push_sql(" AND ");
        out.push_identifier(SID_COLUMN)?;
        out.push_sql(" IN (");
        for (idx, patch) in self.patches.iter().enumerate() {
            if idx > 0 {
                out.push_sql(", ");
            }
            out.push_bind_param::<BigInt, _>(&patch.sid)?;
        }
        out.push_sql(")");
        Ok(())
    }
}

impl QueryId for BatchUpdate {
    type QueryId = ();

    const HAS_STATIC_QUERY_ID: bool = false;
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use diesel::debug_query;

    use super::*;
    use crate::batch::{BatchPatchSet, RowPatch};

    fn amount(v: &str) -> PatchValue {
        PatchValue::Numeric(BigDecimal::from_str(v).unwrap())
    }

    /// SQL text of a statement, without the trailing bind listing.
    fn sql_of(statement: &BatchUpdate) -> String {
        let rendered = debug_query::<Pg, _>(statement).to_string();
        rendered
            .split(" -- binds: ")
            .next()
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn renders_one_case_per_column() {
        let mut set = BatchPatchSet::new("balances", "btc", vec!["available", "balance"]);
        set.push(RowPatch::new(Sid::new(1), vec![amount("100.5"), amount("200")]));
        set.push(RowPatch::new(Sid::new(2), vec![amount("0"), amount("3")]));
        let statement = set.compile().unwrap().unwrap();

        assert_eq!(
            sql_of(&statement),
            "UPDATE \"balances\" SET \
             \"available\" = CASE \"sid\" WHEN $1 THEN $2 WHEN $3 THEN $4 END, \
             \"balance\" = CASE \"sid\" WHEN $5 THEN $6 WHEN $7 THEN $8 END \
             WHERE \"chain\" = $9 AND \"sid\" IN ($10, $11)"
        );
        assert_eq!(statement.bind_count(), 11);
    }

    #[test]
    fn values_never_reach_the_sql_text() {
        let hostile = "0'; DROP TABLE balances; --".to_string();
        let mut set = BatchPatchSet::new("balances", "eth' OR '1'='1", vec!["address"]);
        set.push(RowPatch::new(Sid::new(3), vec![PatchValue::Text(hostile.clone())]));
        let statement = set.compile().unwrap().unwrap();

        let sql = sql_of(&statement);
        assert!(!sql.contains("DROP TABLE"));
        assert!(!sql.contains("OR '1'='1"));
        assert_eq!(
            sql,
            "UPDATE \"balances\" SET \"address\" = CASE \"sid\" WHEN $1 THEN $2 END \
             WHERE \"chain\" = $3 AND \"sid\" IN ($4)"
        );

        // The bind listing still carries the raw value untouched.
        let rendered = debug_query::<Pg, _>(&statement).to_string();
        assert!(rendered.contains("DROP TABLE balances"));
    }

    #[test]
    fn case_order_follows_input_order() {
        let mut set = BatchPatchSet::new("inscriptions", "eth", vec!["transfer_type"]);
        for sid in [9, 4, 7] {
            set.push(RowPatch::new(Sid::new(sid), vec![PatchValue::SmallInt(1)]));
        }
        let statement = set.compile().unwrap().unwrap();

        let sids: Vec<u32> = statement.sids().map(u32::from).collect();
        assert_eq!(sids, vec![9, 4, 7]);
        assert_eq!(statement.row_count(), 3);
        assert_eq!(
            sql_of(&statement),
            "UPDATE \"inscriptions\" SET \"transfer_type\" = CASE \"sid\" \
             WHEN $1 THEN $2 WHEN $3 THEN $4 WHEN $5 THEN $6 END \
             WHERE \"chain\" = $7 AND \"sid\" IN ($8, $9, $10)"
        );
    }

    #[test]
    fn quotes_identifiers() {
        let mut set = BatchPatchSet::new("odd\"table", "eth", vec!["tx_cnt"]);
        set.push(RowPatch::new(Sid::new(1), vec![PatchValue::BigInt(5)]));
        let statement = set.compile().unwrap().unwrap();

        assert!(sql_of(&statement).starts_with("UPDATE \"odd\"\"table\" SET "));
    }
}
