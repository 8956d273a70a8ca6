//! Ledger accounts
//!
//! Format: HOLDER_KIND:ID:ASSET
//! Example: USER:alice:SOL, COLLATERAL_VAULT:sol-collateral:SOL

use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{AsRefStr, Display};
use termlend_core::{AssetId, MarketId, OwnerId};

/// Kind of balance holder, used for display and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HolderKind {
    User,
    CollateralVault,
    LiquidityVault,
    FeeReceiver,
}

/// Who holds a balance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Holder {
    /// A user wallet (borrower, lender, liquidator)
    User(OwnerId),
    /// Custody of a collateral market's deposits
    CollateralVault(MarketId),
    /// Liquidity backing a loan market (lender deposits and repayments)
    LiquidityVault(MarketId),
    /// Fee destination of a loan market
    FeeReceiver(MarketId),
}

impl Holder {
    pub fn kind(&self) -> HolderKind {
        match self {
            Holder::User(_) => HolderKind::User,
            Holder::CollateralVault(_) => HolderKind::CollateralVault,
            Holder::LiquidityVault(_) => HolderKind::LiquidityVault,
            Holder::FeeReceiver(_) => HolderKind::FeeReceiver,
        }
    }

    fn id(&self) -> &str {
        match self {
            Holder::User(owner) => owner.as_str(),
            Holder::CollateralVault(market)
            | Holder::LiquidityVault(market)
            | Holder::FeeReceiver(market) => market.as_str(),
        }
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// A single balance: one holder, one asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountKey {
    pub holder: Holder,
    pub asset: AssetId,
}

impl AccountKey {
    pub fn new(holder: Holder, asset: AssetId) -> Self {
        Self { holder, asset }
    }

    pub fn user(owner: &OwnerId, asset: &AssetId) -> Self {
        Self::new(Holder::User(owner.clone()), asset.clone())
    }

    pub fn collateral_vault(market: &MarketId, asset: &AssetId) -> Self {
        Self::new(Holder::CollateralVault(market.clone()), asset.clone())
    }

    pub fn liquidity_vault(market: &MarketId, asset: &AssetId) -> Self {
        Self::new(Holder::LiquidityVault(market.clone()), asset.clone())
    }

    pub fn fee_receiver(market: &MarketId, asset: &AssetId) -> Self {
        Self::new(Holder::FeeReceiver(market.clone()), asset.clone())
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.holder, self.asset)
    }
}
