//! Batched, conditional update-by-SID engine.
//!
//! Applies different column values to many rows of one chain in a single statement,
//! inside a transaction owned by the caller.
//!
//! ## Key Components
//! - [`BatchPatchSet`] - the per-row values of one call
//! - [`BatchUpdate`] - the compiled, parameterised statement
//! - [`BatchExecutor`] - the handle a statement runs on
//! - [`PatchSource`] - binds an entity type to its table and fixed columns
//!
//! ## Usage Example
//! ```ignore
//! use diesel_async::{AsyncConnection, scoped_futures::ScopedFutureExt};
//!
//! conn.transaction(|tx| {
//!     async move { update_by_sid(tx, "btc", &balances).await }.scope_boxed()
//! })
//! .await?;
//! ```

pub mod error;
pub mod executor;
pub mod patch;
pub mod statement;

pub use error::{BatchResult, BatchUpdateError};
pub use executor::{execute_batch, update_by_sid, BatchExecutor};
pub use patch::{
    max_rows_per_statement, BatchPatchSet, PatchColumn, PatchSource, PatchValue, RowPatch,
    MAX_BIND_PARAMS,
};
pub use statement::BatchUpdate;
