//! Execution of compiled batches against a caller-owned handle.

use async_trait::async_trait;
use diesel::QueryResult;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use super::{
    error::BatchResult,
    patch::{BatchPatchSet, PatchSource},
    statement::BatchUpdate,
};

/// A handle able to run a compiled [`BatchUpdate`] and report the rows it changed.
///
/// The handle is borrowed for a single call. Implementations must not begin,
/// commit or roll back transactions: that belongs to whoever owns the handle.
#[async_trait]
pub trait BatchExecutor: Send {
    async fn execute_update(&mut self, statement: BatchUpdate) -> QueryResult<usize>;
}

#[async_trait]
impl BatchExecutor for AsyncPgConnection {
    async fn execute_update(&mut self, statement: BatchUpdate) -> QueryResult<usize> {
        statement.execute(self).await
    }
}

/// Compile `set` and run it on `executor`.
///
/// An empty set returns `Ok(0)` without touching the executor. The returned count is
/// what the backend reports and can be lower than the number of patches when some
/// SIDs do not exist on the chain.
pub async fn execute_batch<E>(executor: &mut E, set: BatchPatchSet) -> BatchResult<usize>
where
    E: BatchExecutor + ?Sized,
{
    let Some(statement) = set.compile()? else {
        return Ok(0);
    };
    Ok(executor.execute_update(statement).await?)
}

/// Write the [`PatchSource::COLUMNS`] of `items` back to their rows on `chain`.
pub async fn update_by_sid<T, E>(executor: &mut E, chain: &str, items: &[T]) -> BatchResult<usize>
where
    T: PatchSource,
    E: BatchExecutor + ?Sized,
{
    if items.is_empty() {
        return Ok(0);
    }
    execute_batch(executor, BatchPatchSet::from_entities(chain, items)).await
}
