//! Liquidation engine for borrower profiles
//!
//! Loans past maturity are closed first and in full. Otherwise a position
//! above its liquidation threshold is closed partially, by a close factor of
//! the gap. Either way the repayment shrinks when the collateral entry cannot
//! cover the penalty-adjusted seize, and grows to pay for every whole
//! collateral unit seized.

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use termlend_core::{MathError, Wad, BPS_DENOMINATOR};

use crate::engine::{RiskEngine, Valuation};
use crate::error::RiskError;
use crate::market::{CollateralMarketState, LoanMarketState};
use crate::profile::{MarketLookup, Profile};
use crate::transitions::Overlay;

/// Configuration for liquidation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationConfig {
    /// Share of the liquidation gap repaid per call in ratio mode
    pub close_factor_bps: u16,
    /// Smallest repayment, unless the loan itself is smaller
    pub min_repay_amount: u64,
}

impl Default for LiquidationConfig {
    fn default() -> Self {
        Self {
            close_factor_bps: 5000, // 50%
            min_repay_amount: 1,
        }
    }
}

/// Why a loan is being liquidated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LiquidationMode {
    /// Loan past maturity; repaid in full
    Matured,
    /// Loan value above the liquidation threshold; repaid by close factor
    Ratio,
}

/// Amounts a liquidation will move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationPlan {
    pub mode: LiquidationMode,
    /// Loan units the liquidator pays
    pub repay_amount: u64,
    /// Collateral units the liquidator receives
    pub seize_amount: u64,
    /// Repayment was reduced to what the collateral entry covers
    pub collateral_constrained: bool,
}

/// Liquidation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidationOutcome {
    pub profile: Profile,
    pub collateral_market: CollateralMarketState,
    pub loan_market: LoanMarketState,
    pub plan: LiquidationPlan,
    pub before: Valuation,
    pub after: Valuation,
}

/// Liquidation engine
#[derive(Debug, Default)]
pub struct LiquidationEngine {
    config: LiquidationConfig,
}

impl LiquidationEngine {
    pub fn new(config: LiquidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LiquidationConfig {
        &self.config
    }

    /// Collateral units owed for `repay_amount` loan units, unclamped.
    ///
    /// `ceil(ceil(repay * loan_price * (1 + penalty)) / collateral_price)`
    pub fn seize_for(
        &self,
        repay_amount: u64,
        loan_price: Wad,
        collateral_price: Wad,
        penalty_bps: u16,
    ) -> Result<u64, MathError> {
        loan_price
            .times_amount(repay_amount)?
            .mul_ratio_ceil(BPS_DENOMINATOR + penalty_bps as u128, BPS_DENOMINATOR)?
            .to_amount_ceil(collateral_price)
    }

    /// Loan units whose penalty-adjusted value `seize_amount` collateral covers.
    ///
    /// `floor(floor(seize * collateral_price / (1 + penalty)) / loan_price)`
    pub fn repay_covered_by(
        &self,
        seize_amount: u64,
        loan_price: Wad,
        collateral_price: Wad,
        penalty_bps: u16,
    ) -> Result<u64, MathError> {
        collateral_price
            .times_amount(seize_amount)?
            .mul_ratio_floor(BPS_DENOMINATOR, BPS_DENOMINATOR + penalty_bps as u128)?
            .to_amount_floor(loan_price)
    }

    /// Clamp a repayment into `[min_repay_amount, loan_amount]`
    fn bound_repay(&self, repay_amount: u64, loan_amount: u64) -> u64 {
        repay_amount
            .max(self.config.min_repay_amount)
            .min(loan_amount)
    }

    /// Check eligibility and compute repay and seize amounts
    pub fn plan<M: MarketLookup + ?Sized>(
        &self,
        profile: &Profile,
        collateral_market: &CollateralMarketState,
        loan_market: &LoanMarketState,
        markets: &M,
        now: i64,
        current_slot: u64,
    ) -> Result<LiquidationPlan, RiskError> {
        profile.ensure_namespace(&collateral_market.namespace)?;
        profile.ensure_namespace(&loan_market.namespace)?;

        if !profile.is_fresh(current_slot) {
            return Err(RiskError::StaleData(format!("profile {}", profile.id)));
        }
        if !collateral_market.is_fresh(current_slot) {
            return Err(RiskError::StaleData(format!(
                "collateral market {}",
                collateral_market.id
            )));
        }
        if !loan_market.is_fresh(current_slot) {
            return Err(RiskError::StaleData(format!("loan market {}", loan_market.id)));
        }

        let loan = profile
            .loan(&loan_market.id)
            .ok_or_else(|| RiskError::NoSuchLoan(loan_market.id.clone()))?;
        let collateral = profile
            .collateral(&collateral_market.id)
            .ok_or_else(|| RiskError::NoSuchCollateral(collateral_market.id.clone()))?;

        let loan_price = loan_market.loan_price_wad;
        let collateral_price = collateral_market.collateral_price_wad;
        let penalty_bps = collateral_market.config.liquidation_penalty_bps;

        let (mode, base_repay) = if profile.has_past_due_loan(now) {
            if !loan.is_past_due(now) {
                return Err(RiskError::MustLiquidateMaturedFirst(loan_market.id.clone()));
            }
            (LiquidationMode::Matured, loan.amount)
        } else {
            let valuation = RiskEngine::new(markets).valuate(profile)?;
            if !valuation.is_under_collateralized() {
                return Err(RiskError::PositionHealthy);
            }
            let target = valuation
                .liquidation_gap()
                .mul_ratio_ceil(self.config.close_factor_bps as u128, BPS_DENOMINATOR)?;
            (LiquidationMode::Ratio, target.to_amount_ceil(loan_price)?)
        };

        let mut repay_amount = self.bound_repay(base_repay, loan.amount);
        let mut seize_amount =
            self.seize_for(repay_amount, loan_price, collateral_price, penalty_bps)?;
        let mut collateral_constrained = false;

        if seize_amount > collateral.amount {
            let repay_value = collateral
                .cached_value_wad
                .mul_ratio_floor(BPS_DENOMINATOR, BPS_DENOMINATOR + penalty_bps as u128)?;
            let constrained = self.bound_repay(repay_value.to_amount_ceil(loan_price)?, loan.amount);
            repay_amount = constrained.min(repay_amount);
            seize_amount = self
                .seize_for(repay_amount, loan_price, collateral_price, penalty_bps)?
                .min(collateral.amount);
            collateral_constrained = true;
        }

        // whole seized units are paid for, so coarse collateral cannot leak value
        let covered = self
            .repay_covered_by(seize_amount, loan_price, collateral_price, penalty_bps)?
            .min(loan.amount);
        repay_amount = repay_amount.max(covered);

        tracing::debug!(
            profile = %profile.id,
            mode = %mode,
            repay_amount,
            seize_amount,
            collateral_constrained,
            "Liquidation planned"
        );

        Ok(LiquidationPlan {
            mode,
            repay_amount,
            seize_amount,
            collateral_constrained,
        })
    }

    /// Plan and apply a liquidation to copies of the profile and markets
    pub fn liquidate<M: MarketLookup + ?Sized>(
        &self,
        profile: &Profile,
        collateral_market: &CollateralMarketState,
        loan_market: &LoanMarketState,
        markets: &M,
        now: i64,
        current_slot: u64,
    ) -> Result<LiquidationOutcome, RiskError> {
        let plan = self.plan(
            profile,
            collateral_market,
            loan_market,
            markets,
            now,
            current_slot,
        )?;
        let before = RiskEngine::new(markets).valuate(profile)?;

        let mut next = profile.clone();
        if let Some(loan) = next.loan_mut(&loan_market.id) {
            loan.amount -= plan.repay_amount;
            loan.reprice(loan_market.loan_price_wad)?;
        }
        if let Some(collateral) = next.collateral_mut(&collateral_market.id) {
            collateral.amount -= plan.seize_amount;
            collateral.reprice(collateral_market.collateral_price_wad)?;
        }
        next.prune();

        let mut loan_market = loan_market.clone();
        loan_market.total_borrowed = loan_market
            .total_borrowed
            .checked_sub(plan.repay_amount)
            .ok_or(MathError::Underflow)?;
        let mut collateral_market = collateral_market.clone();
        collateral_market.total_deposited = collateral_market
            .total_deposited
            .checked_sub(plan.seize_amount)
            .ok_or(MathError::Underflow)?;

        let view = Overlay {
            base: markets,
            collateral: Some(&collateral_market),
            loan: Some(&loan_market),
        };
        let after = RiskEngine::new(&view).valuate(&next)?;

        if plan.mode == LiquidationMode::Ratio
            && !plan.collateral_constrained
            && after.is_under_collateralized()
            && after.liquidation_gap() >= before.liquidation_gap()
            && can_restore_health(&before, collateral_market.config.liquidation_penalty_bps)?
        {
            return Err(RiskError::LiquidationWidensGap {
                gap_before: before.liquidation_gap(),
                gap_after: after.liquidation_gap(),
            });
        }

        Ok(LiquidationOutcome {
            profile: next,
            collateral_market,
            loan_market,
            plan,
            before,
            after,
        })
    }
}

/// Whether the collateral could cover the whole loan plus penalty
fn can_restore_health(valuation: &Valuation, penalty_bps: u16) -> Result<bool, MathError> {
    let owed = valuation
        .loan_value
        .mul_ratio_ceil(BPS_DENOMINATOR + penalty_bps as u128, BPS_DENOMINATOR)?;
    Ok(owed <= valuation.collateral_value)
}
