//! Inscription Indexer storage layer
//!
//! Reads for the API layer go through [`client::IndexerClient`] and the
//! [`repository`] traits. Indexed blocks are written through a
//! [`writer::IndexerWriter`], whose batch updates rewrite many rows of one
//! table in a single statement keyed by chain and SID.

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod log;
pub mod repository;
pub mod writer;

#[cfg(test)]
mod test_helpers;

pub use client::IndexerClient;
pub use config::Config;
pub use error::{Error, Result};
pub use repository::postgres::Repository;
pub use writer::IndexerWriter;
