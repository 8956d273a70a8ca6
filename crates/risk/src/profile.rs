//! Borrower profiles
//!
//! A profile holds at most one collateral entry and one loan entry per
//! market. Entries are created lazily and dropped as soon as their amount
//! reaches zero.

use serde::{Deserialize, Serialize};
use termlend_core::{AssetId, MarketId, NamespaceId, OwnerId, ProfileId, Wad};

use crate::error::RiskError;
use crate::market::{CollateralMarketState, LoanMarketState};

/// Read access to market state by id
pub trait MarketLookup {
    fn collateral_market(&self, id: &MarketId) -> Option<&CollateralMarketState>;
    fn loan_market(&self, id: &MarketId) -> Option<&LoanMarketState>;

    fn require_collateral_market(&self, id: &MarketId) -> Result<&CollateralMarketState, RiskError> {
        self.collateral_market(id)
            .ok_or_else(|| RiskError::MarketNotFound(id.clone()))
    }

    fn require_loan_market(&self, id: &MarketId) -> Result<&LoanMarketState, RiskError> {
        self.loan_market(id)
            .ok_or_else(|| RiskError::MarketNotFound(id.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileCollateral {
    pub market_id: MarketId,
    pub amount: u64,
    pub cached_price_wad: Wad,
    /// `amount * cached_price_wad`
    pub cached_value_wad: Wad,
}

impl ProfileCollateral {
    /// Re-price the entry; the value is always exact
    pub fn reprice(&mut self, price: Wad) -> Result<(), RiskError> {
        self.cached_value_wad = price.times_amount(self.amount)?;
        self.cached_price_wad = price;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileLoan {
    pub market_id: MarketId,
    pub oracle_asset_id: AssetId,
    pub amount: u64,
    pub cached_price_wad: Wad,
    /// `amount * cached_price_wad`
    pub cached_value_wad: Wad,
    pub maturity_timestamp: i64,
}

impl ProfileLoan {
    pub fn reprice(&mut self, price: Wad) -> Result<(), RiskError> {
        self.cached_value_wad = price.times_amount(self.amount)?;
        self.cached_price_wad = price;
        Ok(())
    }

    pub fn is_past_due(&self, now: i64) -> bool {
        self.maturity_timestamp < now
    }
}

/// A borrower's positions within one market namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub owner: OwnerId,
    pub namespace: NamespaceId,
    pub collaterals: Vec<ProfileCollateral>,
    pub loans: Vec<ProfileLoan>,
    pub last_refreshed_slot: Option<u64>,
}

impl Profile {
    pub fn new(owner: OwnerId, namespace: NamespaceId) -> Self {
        Self {
            id: ProfileId::new_v4(),
            owner,
            namespace,
            collaterals: Vec::new(),
            loans: Vec::new(),
            last_refreshed_slot: None,
        }
    }

    pub fn collateral(&self, market_id: &MarketId) -> Option<&ProfileCollateral> {
        self.collaterals.iter().find(|c| &c.market_id == market_id)
    }

    pub fn collateral_mut(&mut self, market_id: &MarketId) -> Option<&mut ProfileCollateral> {
        self.collaterals.iter_mut().find(|c| &c.market_id == market_id)
    }

    pub fn loan(&self, market_id: &MarketId) -> Option<&ProfileLoan> {
        self.loans.iter().find(|l| &l.market_id == market_id)
    }

    pub fn loan_mut(&mut self, market_id: &MarketId) -> Option<&mut ProfileLoan> {
        self.loans.iter_mut().find(|l| &l.market_id == market_id)
    }

    pub fn is_fresh(&self, current_slot: u64) -> bool {
        self.last_refreshed_slot == Some(current_slot)
    }

    pub fn ensure_fresh(&self, current_slot: u64) -> Result<(), RiskError> {
        if self.is_fresh(current_slot) {
            Ok(())
        } else {
            Err(RiskError::StaleData(format!(
                "profile {} was not refreshed in slot {}",
                self.id, current_slot
            )))
        }
    }

    pub fn ensure_namespace(&self, namespace: &NamespaceId) -> Result<(), RiskError> {
        if &self.namespace == namespace {
            Ok(())
        } else {
            Err(RiskError::NamespaceMismatch {
                expected: self.namespace.clone(),
                found: namespace.clone(),
            })
        }
    }

    /// Any loan strictly past its maturity timestamp
    pub fn has_past_due_loan(&self, now: i64) -> bool {
        self.loans.iter().any(|l| l.is_past_due(now))
    }

    /// Drop entries whose amount reached zero
    pub fn prune(&mut self) {
        self.collaterals.retain(|c| c.amount > 0);
        self.loans.retain(|l| l.amount > 0);
    }

    pub fn is_empty(&self) -> bool {
        self.collaterals.is_empty() && self.loans.is_empty()
    }
}

/// Re-value every entry from its market's cached price.
///
/// Every referenced market must have been refreshed in `current_slot`.
/// On error the profile is left untouched.
pub fn refresh_profile<M: MarketLookup + ?Sized>(
    profile: &mut Profile,
    markets: &M,
    current_slot: u64,
) -> Result<(), RiskError> {
    let mut collaterals = profile.collaterals.clone();
    for entry in &mut collaterals {
        let market = markets.require_collateral_market(&entry.market_id)?;
        market.ensure_fresh(current_slot)?;
        entry.reprice(market.collateral_price_wad)?;
    }

    let mut loans = profile.loans.clone();
    for entry in &mut loans {
        let market = markets.require_loan_market(&entry.market_id)?;
        market.ensure_fresh(current_slot)?;
        entry.reprice(market.loan_price_wad)?;
        entry.maturity_timestamp = market.config.maturity_timestamp;
        entry.oracle_asset_id = market.config.oracle_asset_id.clone();
    }

    profile.collaterals = collaterals;
    profile.loans = loans;
    profile.last_refreshed_slot = Some(current_slot);

    tracing::debug!(
        profile = %profile.id,
        collaterals = profile.collaterals.len(),
        loans = profile.loans.len(),
        slot = current_slot,
        "Profile refreshed"
    );
    Ok(())
}
