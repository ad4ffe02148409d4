pub mod address_tx;
pub mod balance;
pub mod balance_txn;
pub mod block;
pub mod inscription;
pub mod inscription_stats;
pub mod transaction;
pub mod utxo;

pub use address_tx::*;
pub use balance::*;
pub use balance_txn::*;
pub use block::*;
pub use inscription::*;
pub use inscription_stats::*;
pub use transaction::*;
pub use utxo::*;
