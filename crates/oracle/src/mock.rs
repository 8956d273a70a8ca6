//! Mock Oracle for testing
//!
//! Holds prices set programmatically. Every price carries the slot it was
//! "published" in, so staleness can be exercised by simply not republishing.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::RwLock;
use termlend_core::{wad, AssetId, Wad};

use crate::error::OracleError;
use crate::types::{ExchangeRate, Price, PriceOracle};

/// Mock Price Oracle for testing
#[derive(Debug, Default)]
pub struct MockOracle {
    prices: RwLock<HashMap<AssetId, Price>>,
    exchange_rates: RwLock<HashMap<AssetId, ExchangeRate>>,
}

impl MockOracle {
    /// Create a new empty mock oracle
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a decimal price (e.g. `dec!(5)`) for an asset at `slot`
    pub fn set_price(&self, asset: AssetId, price: Decimal, slot: u64) -> Result<(), OracleError> {
        let value_wad = wad::from_decimal(price).map_err(|e| OracleError::InvalidPrice {
            asset: asset.clone(),
            reason: e.to_string(),
        })?;
        self.set_price_wad(asset, value_wad, slot);
        Ok(())
    }

    /// Publish a raw WAD price for an asset at `slot`
    pub fn set_price_wad(&self, asset: AssetId, value_wad: Wad, slot: u64) {
        let mut prices = self.prices.write().unwrap_or_else(|e| e.into_inner());
        prices.insert(asset, Price::new(value_wad, slot));
    }

    /// Publish a collateral exchange rate for a yield-bearing asset
    pub fn set_exchange_rate(
        &self,
        asset: AssetId,
        rate: Decimal,
        slot: u64,
    ) -> Result<(), OracleError> {
        let rate_wad = wad::from_decimal(rate).map_err(|e| OracleError::InvalidPrice {
            asset: asset.clone(),
            reason: e.to_string(),
        })?;
        let mut rates = self.exchange_rates.write().unwrap_or_else(|e| e.into_inner());
        rates.insert(asset, ExchangeRate::new(rate_wad, slot));
        Ok(())
    }

    /// Re-publish every known price and rate, unchanged, in `slot`
    pub fn republish_all(&self, slot: u64) {
        let mut prices = self.prices.write().unwrap_or_else(|e| e.into_inner());
        for price in prices.values_mut() {
            price.updated_at_slot = slot;
        }
        let mut rates = self.exchange_rates.write().unwrap_or_else(|e| e.into_inner());
        for rate in rates.values_mut() {
            rate.updated_at_slot = slot;
        }
    }

    /// Remove a price (for testing asset not found error)
    pub fn remove_price(&self, asset: &AssetId) {
        let mut prices = self.prices.write().unwrap_or_else(|e| e.into_inner());
        prices.remove(asset);
    }

    /// Get number of configured feeds
    pub fn feed_count(&self) -> usize {
        self.prices.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl PriceOracle for MockOracle {
    async fn get_price(&self, asset: &AssetId) -> Result<Price, OracleError> {
        let prices = self.prices.read().unwrap_or_else(|e| e.into_inner());
        prices
            .get(asset)
            .copied()
            .ok_or_else(|| OracleError::AssetNotFound {
                asset: asset.clone(),
            })
    }

    async fn get_exchange_rate(&self, asset: &AssetId) -> Result<Option<ExchangeRate>, OracleError> {
        let rates = self.exchange_rates.read().unwrap_or_else(|e| e.into_inner());
        Ok(rates.get(asset).copied())
    }
}
