//! Core oracle types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use termlend_core::{AssetId, Wad};

use crate::OracleError;

/// A price quote stamped with the slot it was published in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Price of one base unit, WAD-scaled
    pub value_wad: Wad,
    /// Slot in which the feed last updated
    pub updated_at_slot: u64,
}

impl Price {
    pub fn new(value_wad: Wad, updated_at_slot: u64) -> Self {
        Self {
            value_wad,
            updated_at_slot,
        }
    }

    /// Fresh means published in exactly `current_slot`
    pub fn is_fresh(&self, current_slot: u64) -> bool {
        self.updated_at_slot == current_slot
    }
}

/// Collateral-token units per underlying unit, WAD-scaled.
///
/// A yield-bearing collateral token appreciates, so the rate falls below
/// 1 WAD as interest accrues and the collateral price rises above the
/// underlying price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub rate_wad: Wad,
    pub updated_at_slot: u64,
}

impl ExchangeRate {
    pub fn new(rate_wad: Wad, updated_at_slot: u64) -> Self {
        Self {
            rate_wad,
            updated_at_slot,
        }
    }

    /// One collateral unit per underlying unit
    pub fn par(slot: u64) -> Self {
        Self::new(Wad::ONE, slot)
    }

    pub fn is_fresh(&self, current_slot: u64) -> bool {
        self.updated_at_slot == current_slot
    }
}

/// Price Oracle trait - interface for price feeds
///
/// Only `get_price` is required. Feeds that do not track wrapped,
/// yield-bearing collateral report no exchange rate and callers treat the
/// asset as trading at par.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Get the latest price for an asset
    async fn get_price(&self, asset: &AssetId) -> Result<Price, OracleError>;

    /// Get the collateral exchange rate for a yield-bearing asset, if any
    async fn get_exchange_rate(&self, _asset: &AssetId) -> Result<Option<ExchangeRate>, OracleError> {
        Ok(None)
    }

    /// Get prices for multiple assets at once
    async fn get_prices(&self, assets: &[AssetId]) -> Vec<Result<Price, OracleError>> {
        let mut results = Vec::new();
        for asset in assets {
            results.push(self.get_price(asset).await);
        }
        results
    }
}
