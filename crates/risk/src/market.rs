//! Collateral and loan markets
//!
//! Configs are set by the namespace owner; states carry the derived prices
//! cached by the last refresh plus the market-wide totals.

use serde::{Deserialize, Serialize};
use termlend_core::{wad, AssetId, MarketId, NamespaceId, Wad, BPS_DENOMINATOR, WAD};
use termlend_oracle::{ExchangeRate, Price};

use crate::error::RiskError;

const MAX_BPS: u16 = BPS_DENOMINATOR as u16;

/// Risk parameters of one collateral asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralMarketConfig {
    /// Share of collateral value that can be borrowed
    pub ltv_bps: u16,
    /// Share of collateral value above which the position is liquidatable
    pub liquidation_threshold_bps: u16,
    /// Bonus paid to liquidators on top of the repaid value
    pub liquidation_penalty_bps: u16,
    /// Maximum `total_deposited`, in base units
    pub liquidity_cap: u64,
    pub collateral_asset_id: AssetId,
    /// Underlying asset priced by the oracle
    pub oracle_asset_id: AssetId,
}

impl CollateralMarketConfig {
    /// Config whose oracle prices the collateral asset directly
    pub fn new(
        collateral_asset_id: AssetId,
        ltv_bps: u16,
        liquidation_threshold_bps: u16,
        liquidation_penalty_bps: u16,
        liquidity_cap: u64,
    ) -> Self {
        Self {
            ltv_bps,
            liquidation_threshold_bps,
            liquidation_penalty_bps,
            liquidity_cap,
            oracle_asset_id: collateral_asset_id.clone(),
            collateral_asset_id,
        }
    }

    /// Price the collateral through a different oracle asset (yield-bearing tokens)
    pub fn with_oracle_asset(mut self, oracle_asset_id: AssetId) -> Self {
        self.oracle_asset_id = oracle_asset_id;
        self
    }

    /// Reject configs under which liquidation could not restore health.
    ///
    /// A liquidation removes `v` of loan value and `v * (1 + penalty) * threshold`
    /// of threshold value, so the gap only shrinks while
    /// `threshold * (1 + penalty) < 1`.
    pub fn validate(&self) -> Result<(), RiskError> {
        if self.ltv_bps == 0 {
            return Err(RiskError::InvalidConfig("ltv_bps must be positive".to_string()));
        }
        if self.ltv_bps > self.liquidation_threshold_bps {
            return Err(RiskError::InvalidConfig(format!(
                "ltv_bps {} exceeds liquidation_threshold_bps {}",
                self.ltv_bps, self.liquidation_threshold_bps
            )));
        }
        if self.liquidation_threshold_bps >= MAX_BPS {
            return Err(RiskError::InvalidConfig(format!(
                "liquidation_threshold_bps {} must be below {}",
                self.liquidation_threshold_bps, MAX_BPS
            )));
        }
        if self.liquidation_penalty_bps > MAX_BPS {
            return Err(RiskError::InvalidConfig(format!(
                "liquidation_penalty_bps {} exceeds {}",
                self.liquidation_penalty_bps, MAX_BPS
            )));
        }
        let effective = self.liquidation_threshold_bps as u128
            * (BPS_DENOMINATOR + self.liquidation_penalty_bps as u128);
        if effective >= BPS_DENOMINATOR * BPS_DENOMINATOR {
            return Err(RiskError::InvalidConfig(format!(
                "threshold {} with penalty {} would not shrink the liquidation gap",
                self.liquidation_threshold_bps, self.liquidation_penalty_bps
            )));
        }
        Ok(())
    }
}

/// Collateral market with its cached price and totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralMarketState {
    pub id: MarketId,
    pub namespace: NamespaceId,
    pub config: CollateralMarketConfig,
    /// Price of one collateral base unit, as of `last_updated_slot`
    pub collateral_price_wad: Wad,
    pub last_updated_slot: Option<u64>,
    pub total_deposited: u64,
}

impl CollateralMarketState {
    pub fn new(id: MarketId, namespace: NamespaceId, config: CollateralMarketConfig) -> Self {
        Self {
            id,
            namespace,
            config,
            collateral_price_wad: Wad::ZERO,
            last_updated_slot: None,
            total_deposited: 0,
        }
    }

    /// Refreshed in exactly `current_slot`
    pub fn is_fresh(&self, current_slot: u64) -> bool {
        self.last_updated_slot == Some(current_slot)
    }

    pub fn ensure_fresh(&self, current_slot: u64) -> Result<(), RiskError> {
        if self.is_fresh(current_slot) {
            Ok(())
        } else {
            Err(RiskError::StaleCollateral(self.id.clone()))
        }
    }

    /// Check that `additional` more units fit under the cap
    pub fn ensure_capacity(&self, additional: u64) -> Result<u64, RiskError> {
        ensure_capacity(&self.id, self.total_deposited, additional, self.config.liquidity_cap)
    }
}

/// Terms of one fixed-maturity loan market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanMarketConfig {
    /// Unix timestamp (seconds) at which loans come due
    pub maturity_timestamp: i64,
    /// Asset whose oracle price values the loans
    pub oracle_asset_id: AssetId,
    /// Fee on lender deposits, in principal units
    pub lending_fee_bps: u16,
    /// Fee on borrowing, in principal units
    pub borrow_fee_bps: u16,
    /// Maximum of `total_borrowed` and of `total_lent`
    pub liquidity_cap: u64,
    /// Asset lenders deposit and borrowers repay with
    pub liquidity_asset_id: AssetId,
    /// Principal token, redeemable 1:1 after maturity
    pub principal_asset_id: AssetId,
    /// Yield token, redeemable for the vault surplus after maturity
    pub yield_asset_id: AssetId,
}

impl LoanMarketConfig {
    /// Validate fee and maturity parameters against the current time
    pub fn validate(&self, now: i64) -> Result<(), RiskError> {
        for (name, bps) in [
            ("lending_fee_bps", self.lending_fee_bps),
            ("borrow_fee_bps", self.borrow_fee_bps),
        ] {
            if bps >= MAX_BPS {
                return Err(RiskError::InvalidConfig(format!(
                    "{name} {bps} must be below {MAX_BPS}"
                )));
            }
        }
        if self.maturity_timestamp <= now {
            return Err(RiskError::InvalidConfig(format!(
                "maturity {} is not in the future (now {})",
                self.maturity_timestamp, now
            )));
        }
        Ok(())
    }
}

/// Loan market with its cached price and totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanMarketState {
    pub id: MarketId,
    pub namespace: NamespaceId,
    pub config: LoanMarketConfig,
    /// Price of one liquidity base unit, as of `last_updated_slot`
    pub loan_price_wad: Wad,
    pub last_updated_slot: Option<u64>,
    pub total_borrowed: u64,
    pub total_lent: u64,
}

impl LoanMarketState {
    pub fn new(id: MarketId, namespace: NamespaceId, config: LoanMarketConfig) -> Self {
        Self {
            id,
            namespace,
            config,
            loan_price_wad: Wad::ZERO,
            last_updated_slot: None,
            total_borrowed: 0,
            total_lent: 0,
        }
    }

    pub fn is_fresh(&self, current_slot: u64) -> bool {
        self.last_updated_slot == Some(current_slot)
    }

    pub fn ensure_fresh(&self, current_slot: u64) -> Result<(), RiskError> {
        if self.is_fresh(current_slot) {
            Ok(())
        } else {
            Err(RiskError::StaleLoanOracle(self.id.clone()))
        }
    }

    /// No new borrowing or lending from the maturity timestamp on
    pub fn is_matured(&self, now: i64) -> bool {
        self.config.maturity_timestamp <= now
    }

    /// Strictly past maturity; such loans are liquidated first
    pub fn is_past_due(&self, now: i64) -> bool {
        self.config.maturity_timestamp < now
    }

    pub fn ensure_not_matured(&self, now: i64) -> Result<(), RiskError> {
        if self.is_matured(now) {
            Err(RiskError::Matured(self.id.clone()))
        } else {
            Ok(())
        }
    }

    pub fn ensure_matured(&self, now: i64) -> Result<(), RiskError> {
        if self.is_matured(now) {
            Ok(())
        } else {
            Err(RiskError::NotMatured(self.id.clone()))
        }
    }

    pub fn ensure_borrow_capacity(&self, additional: u64) -> Result<u64, RiskError> {
        ensure_capacity(&self.id, self.total_borrowed, additional, self.config.liquidity_cap)
    }

    pub fn ensure_lend_capacity(&self, additional: u64) -> Result<u64, RiskError> {
        ensure_capacity(&self.id, self.total_lent, additional, self.config.liquidity_cap)
    }
}

fn ensure_capacity(
    market: &MarketId,
    current: u64,
    additional: u64,
    cap: u64,
) -> Result<u64, RiskError> {
    let requested = current as u128 + additional as u128;
    if requested > cap as u128 {
        return Err(RiskError::ExceedsLiquidityCap {
            market: market.clone(),
            cap,
            requested,
        });
    }
    // requested <= cap, so it fits
    Ok(requested as u64)
}

fn stale_feed(asset: &AssetId, updated_at_slot: u64, current_slot: u64) -> RiskError {
    RiskError::StaleOracle {
        asset: asset.clone(),
        updated_at_slot,
        current_slot,
    }
}

/// Pull a fresh oracle price into a collateral market.
///
/// `collateral_price = oracle_price * WAD / exchange_rate`, rounded down.
/// Nothing is written unless every check passes.
pub fn refresh_collateral(
    market: &mut CollateralMarketState,
    price: &Price,
    exchange_rate: &ExchangeRate,
    current_slot: u64,
) -> Result<(), RiskError> {
    let asset = &market.config.oracle_asset_id;
    if !price.is_fresh(current_slot) {
        return Err(stale_feed(asset, price.updated_at_slot, current_slot));
    }
    if !exchange_rate.is_fresh(current_slot) {
        return Err(stale_feed(asset, exchange_rate.updated_at_slot, current_slot));
    }

    if price.value_wad.is_zero() {
        return Err(RiskError::InvalidPrice {
            asset: asset.clone(),
            reason: "price is zero".to_string(),
        });
    }
    if exchange_rate.rate_wad.is_zero() {
        return Err(RiskError::InvalidPrice {
            asset: asset.clone(),
            reason: "exchange rate is zero".to_string(),
        });
    }

    let raw = wad::mul_div_floor(price.value_wad.raw(), WAD, exchange_rate.rate_wad.raw())?;
    market.collateral_price_wad = Wad::from_raw(raw);
    market.last_updated_slot = Some(current_slot);

    tracing::debug!(
        market = %market.id,
        price = %market.collateral_price_wad,
        slot = current_slot,
        "Collateral market refreshed"
    );
    Ok(())
}

/// Pull a fresh oracle price into a loan market
pub fn refresh_loan_market(
    market: &mut LoanMarketState,
    price: &Price,
    current_slot: u64,
) -> Result<(), RiskError> {
    let asset = &market.config.oracle_asset_id;
    if !price.is_fresh(current_slot) {
        return Err(stale_feed(asset, price.updated_at_slot, current_slot));
    }
    if price.value_wad.is_zero() {
        return Err(RiskError::InvalidPrice {
            asset: asset.clone(),
            reason: "price is zero".to_string(),
        });
    }

    market.loan_price_wad = price.value_wad;
    market.last_updated_slot = Some(current_slot);

    tracing::debug!(
        market = %market.id,
        price = %market.loan_price_wad,
        slot = current_slot,
        "Loan market refreshed"
    );
    Ok(())
}
