//! Ledger operations and batches
//!
//! A `LedgerBatch` is applied all-or-nothing: if any operation would
//! overdraw a balance the whole batch is rejected.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use termlend_core::AssetId;

use crate::account::{AccountKey, Holder};

/// Operation kind, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum OpKind {
    Transfer,
    Mint,
    Burn,
}

/// A single token movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerOp {
    Transfer {
        from: Holder,
        to: Holder,
        asset: AssetId,
        amount: u64,
    },
    Mint {
        to: Holder,
        asset: AssetId,
        amount: u64,
    },
    Burn {
        from: Holder,
        asset: AssetId,
        amount: u64,
    },
}

impl LedgerOp {
    pub fn kind(&self) -> OpKind {
        match self {
            LedgerOp::Transfer { .. } => OpKind::Transfer,
            LedgerOp::Mint { .. } => OpKind::Mint,
            LedgerOp::Burn { .. } => OpKind::Burn,
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            LedgerOp::Transfer { amount, .. }
            | LedgerOp::Mint { amount, .. }
            | LedgerOp::Burn { amount, .. } => *amount,
        }
    }

    pub fn asset(&self) -> &AssetId {
        match self {
            LedgerOp::Transfer { asset, .. }
            | LedgerOp::Mint { asset, .. }
            | LedgerOp::Burn { asset, .. } => asset,
        }
    }

    /// Account debited by this op, if any
    pub fn debited(&self) -> Option<AccountKey> {
        match self {
            LedgerOp::Transfer { from, asset, .. } | LedgerOp::Burn { from, asset, .. } => {
                Some(AccountKey::new(from.clone(), asset.clone()))
            }
            LedgerOp::Mint { .. } => None,
        }
    }

    /// Account credited by this op, if any
    pub fn credited(&self) -> Option<AccountKey> {
        match self {
            LedgerOp::Transfer { to, asset, .. } | LedgerOp::Mint { to, asset, .. } => {
                Some(AccountKey::new(to.clone(), asset.clone()))
            }
            LedgerOp::Burn { .. } => None,
        }
    }
}

/// An ordered batch of ledger operations, applied atomically
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerBatch {
    ops: Vec<LedgerOp>,
}

impl LedgerBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transfer; zero amounts are skipped
    pub fn transfer(mut self, from: Holder, to: Holder, asset: &AssetId, amount: u64) -> Self {
        if amount > 0 {
            self.ops.push(LedgerOp::Transfer {
                from,
                to,
                asset: asset.clone(),
                amount,
            });
        }
        self
    }

    /// Add a mint; zero amounts are skipped
    pub fn mint(mut self, to: Holder, asset: &AssetId, amount: u64) -> Self {
        if amount > 0 {
            self.ops.push(LedgerOp::Mint {
                to,
                asset: asset.clone(),
                amount,
            });
        }
        self
    }

    /// Add a burn; zero amounts are skipped
    pub fn burn(mut self, from: Holder, asset: &AssetId, amount: u64) -> Self {
        if amount > 0 {
            self.ops.push(LedgerOp::Burn {
                from,
                asset: asset.clone(),
                amount,
            });
        }
        self
    }

    pub fn ops(&self) -> &[LedgerOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}
