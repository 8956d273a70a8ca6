//! Termlend Ledger - token custody for the lending protocol
//!
//! Balances are keyed by holder and asset. Every protocol operation
//! emits one `LedgerBatch`, applied atomically by a `TokenLedger`.

pub mod account;
pub mod entry;
pub mod error;
pub mod memory;

pub use account::{AccountKey, Holder, HolderKind};
pub use entry::{LedgerBatch, LedgerOp, OpKind};
pub use error::LedgerError;
pub use memory::{InMemoryLedger, TokenLedger};
