//! Termlend Risk Engine - valuation and liquidation for fixed-term loans
//!
//! Everything in this crate is pure: functions take profile and market state
//! by reference and return updated copies. The protocol service commits them
//! together with the matching ledger batch.

pub mod engine;
pub mod error;
pub mod lending;
pub mod liquidation;
pub mod market;
pub mod profile;
pub mod transitions;

pub use engine::{RiskEngine, Valuation};
pub use error::RiskError;
pub use lending::LendTransition;
pub use liquidation::{
    LiquidationConfig, LiquidationEngine, LiquidationMode, LiquidationOutcome, LiquidationPlan,
};
pub use market::{
    refresh_collateral, refresh_loan_market, CollateralMarketConfig, CollateralMarketState,
    LoanMarketConfig, LoanMarketState,
};
pub use profile::{refresh_profile, MarketLookup, Profile, ProfileCollateral, ProfileLoan};
pub use transitions::{CollateralTransition, LoanTransition, PositionLimits};
