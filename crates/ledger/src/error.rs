//! Ledger errors

use thiserror::Error;

/// Errors that can occur in ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient funds in {account}: available {available}, required {required}")]
    InsufficientFunds {
        account: String,
        available: u64,
        required: u64,
    },

    #[error("Balance overflow in {0}")]
    BalanceOverflow(String),

    #[error("Supply overflow for asset {0}")]
    SupplyOverflow(String),

    #[error("Operation amount must be positive")]
    ZeroAmount,
}
