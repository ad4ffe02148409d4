//! Patch records and batch patch sets.
//!
//! A [`BatchPatchSet`] groups the per-row assignments of one update-by-SID call.
//! Entities reach it through [`PatchSource`], which pins every entity type to its
//! table and to a fixed, ordered list of column descriptors, so column names never
//! come from caller-supplied data.

use std::collections::HashSet;

use bigdecimal::BigDecimal;

use super::{
    error::{BatchResult, BatchUpdateError},
    statement::BatchUpdate,
};
use crate::types::Sid;

/// Maximum number of bind parameters of a single Postgres statement.
pub const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// A single column value, tagged with the SQL type it is bound as.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchValue {
    SmallInt(i16),
    BigInt(i64),
    Numeric(BigDecimal),
    Text(String),
}

impl From<i16> for PatchValue {
    fn from(v: i16) -> Self {
        Self::SmallInt(v)
    }
}

impl From<i64> for PatchValue {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<BigDecimal> for PatchValue {
    fn from(v: BigDecimal) -> Self {
        Self::Numeric(v)
    }
}

impl From<String> for PatchValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// New values for one row. `values` is positionally aligned with the columns of
/// the enclosing [`BatchPatchSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct RowPatch {
    pub sid: Sid,
    pub values: Vec<PatchValue>,
}

impl RowPatch {
    pub fn new(sid: impl Into<Sid>, values: Vec<PatchValue>) -> Self {
        Self {
            sid: sid.into(),
            values,
        }
    }
}

/// A column an entity type can be patched on, with the function reading its new value.
pub struct PatchColumn<T> {
    pub name: &'static str,
    pub extract: fn(&T) -> PatchValue,
}

/// Entity types that can be written back through an update-by-SID batch.
pub trait PatchSource: Sized + 'static {
    /// Table holding the entity.
    const TABLE: &'static str;
    /// Columns written by a batch update, in statement order.
    const COLUMNS: &'static [PatchColumn<Self>];

    fn sid(&self) -> Sid;

    fn to_patch(&self) -> RowPatch {
        RowPatch {
            sid: self.sid(),
            values: Self::COLUMNS
                .iter()
                .map(|column| (column.extract)(self))
                .collect(),
        }
    }
}

/// Patches sharing one table, one chain and one column list.
#[derive(Debug, Clone)]
pub struct BatchPatchSet {
    table: &'static str,
    chain: String,
    columns: Vec<&'static str>,
    patches: Vec<RowPatch>,
}

impl BatchPatchSet {
    pub fn new(table: &'static str, chain: impl Into<String>, columns: Vec<&'static str>) -> Self {
        Self {
            table,
            chain: chain.into(),
            columns,
            patches: Vec::new(),
        }
    }

    /// Build the patch set of `items` using the columns declared by `T`.
    pub fn from_entities<T: PatchSource>(chain: impl Into<String>, items: &[T]) -> Self {
        Self {
            table: T::TABLE,
            chain: chain.into(),
            columns: T::COLUMNS.iter().map(|column| column.name).collect(),
            patches: items.iter().map(PatchSource::to_patch).collect(),
        }
    }

    pub fn push(&mut self, patch: RowPatch) {
        self.patches.push(patch);
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

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Number of distinct SIDs in the set.
    pub fn distinct_sids(&self) -> usize {
        self.patches
            .iter()
            .map(|patch| patch.sid)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Split the set into parts of at most `rows` patches each.
    ///
    /// Repeated SIDs are collapsed to their last patch over the whole set before
    /// splitting, so every SID lands in exactly one part. Parts keep input order.
    pub fn split(self, rows: usize) -> Vec<BatchPatchSet> {
        let rows = rows.max(1);
        let mut patches = dedup_keep_last(self.patches).into_iter().peekable();
        let mut parts = Vec::new();
        while patches.peek().is_some() {
            parts.push(BatchPatchSet {
                table: self.table,
                chain: self.chain.clone(),
                columns: self.columns.clone(),
                patches: patches.by_ref().take(rows).collect(),
            });
        }
        parts
    }

    /// Validate the set and turn it into a single update statement.
    ///
    /// Returns `Ok(None)` for an empty set. Repeated SIDs are collapsed to their
    /// last patch, which keeps the position of that last occurrence.
    pub fn compile(self) -> BatchResult<Option<BatchUpdate>> {
        if self.patches.is_empty() {
            return Ok(None);
        }
        if self.chain.is_empty() {
            return Err(BatchUpdateError::EmptyChain { table: self.table });
        }
        if self.columns.is_empty() {
            return Err(BatchUpdateError::EmptyColumns { table: self.table });
        }

        let expected = self.columns.len();
        if let Some(patch) = self.patches.iter().find(|p| p.values.len() != expected) {
            return Err(BatchUpdateError::ValueCountMismatch {
                sid: patch.sid,
                expected,
                actual: patch.values.len(),
            });
        }

        let patches = dedup_keep_last(self.patches);
        let binds = bind_count(expected, patches.len());
        if binds > MAX_BIND_PARAMS {
            return Err(BatchUpdateError::TooManyBindParams {
                rows: patches.len(),
                binds,
                limit: MAX_BIND_PARAMS,
            });
        }

        Ok(Some(BatchUpdate::new(
            self.table,
            self.chain,
            self.columns,
            patches,
        )))
    }
}

/// Bind parameters used by a statement over `columns` columns and `rows` distinct rows:
/// a SID and a value per row and column, the chain, and the SID list of the filter.
pub fn bind_count(columns: usize, rows: usize) -> usize {
    rows * (2 * columns + 1) + 1
}

/// Largest number of distinct rows a single statement over `columns` columns can carry.
pub fn max_rows_per_statement(columns: usize) -> usize {
    (MAX_BIND_PARAMS - 1) / (2 * columns + 1)
}

fn dedup_keep_last(patches: Vec<RowPatch>) -> Vec<RowPatch> {
    let mut seen = HashSet::with_capacity(patches.len());
    let mut kept: Vec<RowPatch> = patches
        .into_iter()
        .rev()
        .filter(|patch| seen.insert(patch.sid))
        .collect();
    kept.reverse();
    kept
}
