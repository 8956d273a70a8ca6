//! Risk engine errors

use termlend_core::{AssetId, MarketId, MathError, NamespaceId, Wad};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RiskError {
    #[error("Stale oracle for {asset}: updated at slot {updated_at_slot}, current slot {current_slot}")]
    StaleOracle {
        asset: AssetId,
        updated_at_slot: u64,
        current_slot: u64,
    },

    #[error("Collateral market {0} was not refreshed this slot")]
    StaleCollateral(MarketId),

    #[error("Loan market {0} was not refreshed this slot")]
    StaleLoanOracle(MarketId),

    #[error("Stale data: {0}")]
    StaleData(String),

    #[error("Liquidity cap exceeded on {market}: cap {cap}, would reach {requested}")]
    ExceedsLiquidityCap {
        market: MarketId,
        cap: u64,
        requested: u128,
    },

    #[error("Insufficient collateral in {market}: available {available}, requested {requested}")]
    InsufficientCollateral {
        market: MarketId,
        available: u64,
        requested: u64,
    },

    #[error("No loan in market {0}")]
    NoSuchLoan(MarketId),

    #[error("No collateral in market {0}")]
    NoSuchCollateral(MarketId),

    #[error("Position would be unhealthy: loan value {loan_value}, borrowing power {borrowing_power}")]
    Unhealthy { loan_value: Wad, borrowing_power: Wad },

    #[error("Position is healthy and cannot be liquidated")]
    PositionHealthy,

    #[error("Liquidation would widen the gap from {gap_before} to {gap_after}")]
    LiquidationWidensGap { gap_before: Wad, gap_after: Wad },

    #[error("A matured loan must be liquidated before {0}")]
    MustLiquidateMaturedFirst(MarketId),

    #[error("Loan market {0} has matured")]
    Matured(MarketId),

    #[error("Loan market {0} has not matured yet")]
    NotMatured(MarketId),

    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(#[from] MathError),

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Invalid price for {asset}: {reason}")]
    InvalidPrice { asset: AssetId, reason: String },

    #[error("Invalid market config: {0}")]
    InvalidConfig(String),

    #[error("Market not found: {0}")]
    MarketNotFound(MarketId),

    #[error("Namespace mismatch: expected {expected}, found {found}")]
    NamespaceMismatch {
        expected: NamespaceId,
        found: NamespaceId,
    },

    #[error("Too many {kind} entries in profile (limit {limit})")]
    TooManyEntries { kind: &'static str, limit: usize },
}
