//! Pure state transitions for borrower operations
//!
//! Each function takes the current profile and market by reference and
//! returns updated copies. Nothing is mutated on failure, so the caller can
//! commit the result together with its ledger batch or drop it.

use serde::{Deserialize, Serialize};
use termlend_core::{wad, MarketId, MathError, Wad};

use crate::engine::RiskEngine;
use crate::error::RiskError;
use crate::market::{CollateralMarketState, LoanMarketState};
use crate::profile::{MarketLookup, Profile, ProfileCollateral, ProfileLoan};

/// Maximum entries per profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionLimits {
    pub max_collaterals: usize,
    pub max_loans: usize,
}

impl Default for PositionLimits {
    fn default() -> Self {
        Self {
            max_collaterals: 10,
            max_loans: 10,
        }
    }
}

/// Result of a deposit or withdrawal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollateralTransition {
    pub profile: Profile,
    pub market: CollateralMarketState,
    pub amount: u64,
}

/// Result of a borrow or repayment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanTransition {
    pub profile: Profile,
    pub market: LoanMarketState,
    /// Loan amount added or removed
    pub amount: u64,
    /// Borrow fee in principal units (zero on repay)
    pub fee: u64,
}

impl LoanTransition {
    /// Principal units the borrower receives
    pub fn net_amount(&self) -> u64 {
        self.amount - self.fee
    }
}

/// A view that substitutes one updated collateral or loan market
pub(crate) struct Overlay<'a, M: ?Sized> {
    pub(crate) base: &'a M,
    pub(crate) collateral: Option<&'a CollateralMarketState>,
    pub(crate) loan: Option<&'a LoanMarketState>,
}

impl<M: MarketLookup + ?Sized> MarketLookup for Overlay<'_, M> {
    fn collateral_market(&self, id: &MarketId) -> Option<&CollateralMarketState> {
        match self.collateral {
            Some(market) if &market.id == id => Some(market),
            _ => self.base.collateral_market(id),
        }
    }

    fn loan_market(&self, id: &MarketId) -> Option<&LoanMarketState> {
        match self.loan {
            Some(market) if &market.id == id => Some(market),
            _ => self.base.loan_market(id),
        }
    }
}

pub(crate) fn ensure_positive(amount: u64) -> Result<(), RiskError> {
    if amount == 0 {
        return Err(RiskError::InvalidAmount);
    }
    Ok(())
}

/// Add collateral. No health check; the market must be fresh.
pub fn deposit_collateral(
    profile: &Profile,
    market: &CollateralMarketState,
    amount: u64,
    current_slot: u64,
    limits: &PositionLimits,
) -> Result<CollateralTransition, RiskError> {
    ensure_positive(amount)?;
    profile.ensure_namespace(&market.namespace)?;
    market.ensure_fresh(current_slot)?;
    let total_deposited = market.ensure_capacity(amount)?;

    let mut profile = profile.clone();
    match profile.collateral_mut(&market.id) {
        Some(entry) => {
            entry.amount = entry
                .amount
                .checked_add(amount)
                .ok_or(MathError::Overflow)?;
            entry.reprice(market.collateral_price_wad)?;
        }
        None => {
            if profile.collaterals.len() >= limits.max_collaterals {
                return Err(RiskError::TooManyEntries {
                    kind: "collateral",
                    limit: limits.max_collaterals,
                });
            }
            let mut entry = ProfileCollateral {
                market_id: market.id.clone(),
                amount,
                cached_price_wad: market.collateral_price_wad,
                cached_value_wad: Wad::ZERO,
            };
            entry.reprice(market.collateral_price_wad)?;
            profile.collaterals.push(entry);
        }
    }

    let mut market = market.clone();
    market.total_deposited = total_deposited;

    Ok(CollateralTransition {
        profile,
        market,
        amount,
    })
}

/// Remove collateral, keeping the position healthy
pub fn withdraw_collateral<M: MarketLookup + ?Sized>(
    profile: &Profile,
    market: &CollateralMarketState,
    markets: &M,
    amount: u64,
    current_slot: u64,
) -> Result<CollateralTransition, RiskError> {
    ensure_positive(amount)?;
    profile.ensure_namespace(&market.namespace)?;
    market.ensure_fresh(current_slot)?;
    profile.ensure_fresh(current_slot)?;

    let mut profile = profile.clone();
    let entry = profile
        .collateral_mut(&market.id)
        .ok_or_else(|| RiskError::NoSuchCollateral(market.id.clone()))?;
    if amount > entry.amount {
        return Err(RiskError::InsufficientCollateral {
            market: market.id.clone(),
            available: entry.amount,
            requested: amount,
        });
    }
    entry.amount -= amount;
    entry.reprice(market.collateral_price_wad)?;
    profile.prune();

    let mut market = market.clone();
    market.total_deposited = market
        .total_deposited
        .checked_sub(amount)
        .ok_or(MathError::Underflow)?;

    let view = Overlay {
        base: markets,
        collateral: Some(&market),
        loan: None,
    };
    RiskEngine::new(&view).ensure_healthy(&profile)?;

    Ok(CollateralTransition {
        profile,
        market,
        amount,
    })
}

/// Borrow `amount` against the profile's collateral.
///
/// The loan entry grows by the full `amount`; the borrower receives
/// `amount - fee` principal units.
pub fn mint_liquidity<M: MarketLookup + ?Sized>(
    profile: &Profile,
    market: &LoanMarketState,
    markets: &M,
    amount: u64,
    now: i64,
    current_slot: u64,
    limits: &PositionLimits,
) -> Result<LoanTransition, RiskError> {
    ensure_positive(amount)?;
    profile.ensure_namespace(&market.namespace)?;
    market.ensure_not_matured(now)?;
    profile.ensure_fresh(current_slot)?;
    market.ensure_fresh(current_slot)?;
    let total_borrowed = market.ensure_borrow_capacity(amount)?;
    let fee = wad::bps_of_amount_ceil(amount, market.config.borrow_fee_bps)?;

    let mut profile = profile.clone();
    match profile.loan_mut(&market.id) {
        Some(entry) => {
            entry.amount = entry
                .amount
                .checked_add(amount)
                .ok_or(MathError::Overflow)?;
            entry.reprice(market.loan_price_wad)?;
        }
        None => {
            if profile.loans.len() >= limits.max_loans {
                return Err(RiskError::TooManyEntries {
                    kind: "loan",
                    limit: limits.max_loans,
                });
            }
            let mut entry = ProfileLoan {
                market_id: market.id.clone(),
                oracle_asset_id: market.config.oracle_asset_id.clone(),
                amount,
                cached_price_wad: market.loan_price_wad,
                cached_value_wad: Wad::ZERO,
                maturity_timestamp: market.config.maturity_timestamp,
            };
            entry.reprice(market.loan_price_wad)?;
            profile.loans.push(entry);
        }
    }

    let mut market = market.clone();
    market.total_borrowed = total_borrowed;

    let view = Overlay {
        base: markets,
        collateral: None,
        loan: Some(&market),
    };
    RiskEngine::new(&view).ensure_healthy(&profile)?;

    Ok(LoanTransition {
        profile,
        market,
        amount,
        fee,
    })
}

/// Repay up to `amount`; the excess over the outstanding loan is ignored.
///
/// No freshness or health precondition: repaying only improves a position.
pub fn repay_liquidity(
    profile: &Profile,
    market: &LoanMarketState,
    amount: u64,
) -> Result<LoanTransition, RiskError> {
    ensure_positive(amount)?;
    profile.ensure_namespace(&market.namespace)?;

    let mut profile = profile.clone();
    let entry = profile
        .loan_mut(&market.id)
        .ok_or_else(|| RiskError::NoSuchLoan(market.id.clone()))?;
    let repaid = amount.min(entry.amount);
    entry.amount -= repaid;
    let price = entry.cached_price_wad;
    entry.reprice(price)?;
    profile.prune();

    let mut market = market.clone();
    market.total_borrowed = market
        .total_borrowed
        .checked_sub(repaid)
        .ok_or(MathError::Underflow)?;

    Ok(LoanTransition {
        profile,
        market,
        amount: repaid,
        fee: 0,
    })
}
