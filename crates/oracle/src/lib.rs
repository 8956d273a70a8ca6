//! Termlend Price Oracle
//!
//! Slot-stamped price feeds consumed by market refreshes.
//! Ships `MockOracle` for tests; real feeds implement `PriceOracle`.

mod error;
mod mock;
mod types;

pub use error::OracleError;
pub use mock::MockOracle;
pub use types::{ExchangeRate, Price, PriceOracle};
