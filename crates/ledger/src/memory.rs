//! Token ledger interface and an in-memory implementation
//!
//! Custody is external to the risk engine; it only needs atomic batches.

use std::collections::HashMap;
use termlend_core::AssetId;

use crate::account::{AccountKey, Holder};
use crate::entry::{LedgerBatch, LedgerOp};
use crate::error::LedgerError;

/// Token custody consumed by the protocol
pub trait TokenLedger: Send {
    /// Balance of one holder in one asset (0 if unknown)
    fn balance(&self, holder: &Holder, asset: &AssetId) -> u64;

    /// Outstanding supply of an asset minted through this ledger
    fn supply(&self, asset: &AssetId) -> u64;

    /// Apply every op in the batch, or none of them
    fn execute(&mut self, batch: &LedgerBatch) -> Result<(), LedgerError>;

    fn transfer(
        &mut self,
        from: Holder,
        to: Holder,
        asset: &AssetId,
        amount: u64,
    ) -> Result<(), LedgerError> {
        self.execute(&LedgerBatch::new().transfer(from, to, asset, amount))
    }

    fn mint(&mut self, to: Holder, asset: &AssetId, amount: u64) -> Result<(), LedgerError> {
        self.execute(&LedgerBatch::new().mint(to, asset, amount))
    }

    fn burn(&mut self, from: Holder, asset: &AssetId, amount: u64) -> Result<(), LedgerError> {
        self.execute(&LedgerBatch::new().burn(from, asset, amount))
    }
}

/// In-memory balances, used by tests and simulations
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedger {
    balances: HashMap<AccountKey, u64>,
    supply: HashMap<AssetId, u64>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate balances and supplies after applying a batch (without mutating state).
    ///
    /// Only touched entries are returned.
    fn project(
        &self,
        batch: &LedgerBatch,
    ) -> Result<(HashMap<AccountKey, u64>, HashMap<AssetId, u64>), LedgerError> {
        let mut balances: HashMap<AccountKey, u64> = HashMap::new();
        let mut supply: HashMap<AssetId, u64> = HashMap::new();

        for op in batch.ops() {
            if op.amount() == 0 {
                return Err(LedgerError::ZeroAmount);
            }

            if let Some(account) = op.debited() {
                let current = *balances
                    .entry(account.clone())
                    .or_insert_with(|| self.balances.get(&account).copied().unwrap_or(0));
                let next = current
                    .checked_sub(op.amount())
                    .ok_or_else(|| LedgerError::InsufficientFunds {
                        account: account.to_string(),
                        available: current,
                        required: op.amount(),
                    })?;
                balances.insert(account, next);
            }

            if let Some(account) = op.credited() {
                let current = *balances
                    .entry(account.clone())
                    .or_insert_with(|| self.balances.get(&account).copied().unwrap_or(0));
                let next = current
                    .checked_add(op.amount())
                    .ok_or_else(|| LedgerError::BalanceOverflow(account.to_string()))?;
                balances.insert(account, next);
            }

            let asset = op.asset();
            match op {
                LedgerOp::Mint { amount, .. } => {
                    let current = *supply
                        .entry(asset.clone())
                        .or_insert_with(|| self.supply(asset));
                    let next = current
                        .checked_add(*amount)
                        .ok_or_else(|| LedgerError::SupplyOverflow(asset.to_string()))?;
                    supply.insert(asset.clone(), next);
                }
                LedgerOp::Burn { amount, .. } => {
                    let current = *supply
                        .entry(asset.clone())
                        .or_insert_with(|| self.supply(asset));
                    // Burning externally funded balances never drops supply below zero
                    supply.insert(asset.clone(), current.saturating_sub(*amount));
                }
                LedgerOp::Transfer { .. } => {}
            }
        }

        Ok((balances, supply))
    }
}

impl TokenLedger for InMemoryLedger {
    fn balance(&self, holder: &Holder, asset: &AssetId) -> u64 {
        self.balances
            .get(&AccountKey::new(holder.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn supply(&self, asset: &AssetId) -> u64 {
        self.supply.get(asset).copied().unwrap_or(0)
    }

    fn execute(&mut self, batch: &LedgerBatch) -> Result<(), LedgerError> {
        let (balances, supply) = self.project(batch)?;

        for (account, balance) in balances {
            if balance == 0 {
                self.balances.remove(&account);
            } else {
                self.balances.insert(account, balance);
            }
        }
        self.supply.extend(supply);

        tracing::debug!(ops = batch.len(), "Ledger batch applied");
        Ok(())
    }
}
