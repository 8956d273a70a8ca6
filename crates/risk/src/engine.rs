//! Risk engine implementation

use serde::{Deserialize, Serialize};
use termlend_core::Wad;

use crate::error::RiskError;
use crate::profile::{MarketLookup, Profile};

/// Aggregate valuation of one profile, from its cached entry values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Valuation {
    pub collateral_value: Wad,
    pub loan_value: Wad,
    /// `sum(collateral value * ltv)`, each term rounded down
    pub borrowing_power: Wad,
    /// `sum(collateral value * liquidation threshold)`, each term rounded down
    pub liquidation_threshold_value: Wad,
}

impl Valuation {
    pub fn is_healthy(&self) -> bool {
        self.loan_value <= self.borrowing_power
    }

    /// Above the liquidation threshold (maturity is checked separately)
    pub fn is_under_collateralized(&self) -> bool {
        self.loan_value > self.liquidation_threshold_value
    }

    /// Loan value in excess of the liquidation threshold
    pub fn liquidation_gap(&self) -> Wad {
        self.loan_value.saturating_gap(self.liquidation_threshold_value)
    }
}

/// Risk Engine - pure valuation over refreshed profile and market state
///
/// Borrows the market view; never mutates anything.
pub struct RiskEngine<'a, M: ?Sized> {
    markets: &'a M,
}

impl<'a, M: MarketLookup + ?Sized> RiskEngine<'a, M> {
    pub fn new(markets: &'a M) -> Self {
        Self { markets }
    }

    pub fn total_collateral_value(&self, profile: &Profile) -> Result<Wad, RiskError> {
        profile
            .collaterals
            .iter()
            .try_fold(Wad::ZERO, |acc, c| acc.try_add(c.cached_value_wad))
            .map_err(RiskError::from)
    }

    pub fn total_loan_value(&self, profile: &Profile) -> Result<Wad, RiskError> {
        profile
            .loans
            .iter()
            .try_fold(Wad::ZERO, |acc, l| acc.try_add(l.cached_value_wad))
            .map_err(RiskError::from)
    }

    pub fn borrowing_power(&self, profile: &Profile) -> Result<Wad, RiskError> {
        let mut total = Wad::ZERO;
        for entry in &profile.collaterals {
            let market = self.markets.require_collateral_market(&entry.market_id)?;
            total = total.try_add(entry.cached_value_wad.mul_bps_floor(market.config.ltv_bps)?)?;
        }
        Ok(total)
    }

    pub fn liquidation_threshold_value(&self, profile: &Profile) -> Result<Wad, RiskError> {
        let mut total = Wad::ZERO;
        for entry in &profile.collaterals {
            let market = self.markets.require_collateral_market(&entry.market_id)?;
            total = total.try_add(
                entry
                    .cached_value_wad
                    .mul_bps_floor(market.config.liquidation_threshold_bps)?,
            )?;
        }
        Ok(total)
    }

    pub fn valuate(&self, profile: &Profile) -> Result<Valuation, RiskError> {
        Ok(Valuation {
            collateral_value: self.total_collateral_value(profile)?,
            loan_value: self.total_loan_value(profile)?,
            borrowing_power: self.borrowing_power(profile)?,
            liquidation_threshold_value: self.liquidation_threshold_value(profile)?,
        })
    }

    pub fn is_healthy(&self, profile: &Profile) -> Result<bool, RiskError> {
        Ok(self.total_loan_value(profile)? <= self.borrowing_power(profile)?)
    }

    /// Under-collateralized, or holding a loan past maturity
    pub fn is_liquidatable(&self, profile: &Profile, now: i64) -> Result<bool, RiskError> {
        if profile.has_past_due_loan(now) {
            return Ok(true);
        }
        Ok(self.valuate(profile)?.is_under_collateralized())
    }

    /// Fail with `Unhealthy` if loans exceed borrowing power
    pub fn ensure_healthy(&self, profile: &Profile) -> Result<Valuation, RiskError> {
        let valuation = self.valuate(profile)?;
        if !valuation.is_healthy() {
            return Err(RiskError::Unhealthy {
                loan_value: valuation.loan_value,
                borrowing_power: valuation.borrowing_power,
            });
        }
        Ok(valuation)
    }
}
