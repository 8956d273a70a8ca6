//! Market registry
//!
//! Markets are addressed by opaque `MarketId`s and grouped under namespaces,
//! each owned by the account allowed to administer it.

use std::collections::HashMap;
use termlend_core::{MarketId, NamespaceId, OwnerId};
use termlend_risk::{CollateralMarketState, LoanMarketState, MarketLookup};

use crate::error::ProtocolError;

#[derive(Debug, Default, Clone)]
pub struct MarketRegistry {
    namespaces: HashMap<NamespaceId, OwnerId>,
    collateral: HashMap<MarketId, CollateralMarketState>,
    loan: HashMap<MarketId, LoanMarketState>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace_owner(&self, namespace: &NamespaceId) -> Result<&OwnerId, ProtocolError> {
        self.namespaces
            .get(namespace)
            .ok_or_else(|| ProtocolError::NamespaceNotFound(namespace.clone()))
    }

    pub fn insert_namespace(
        &mut self,
        namespace: NamespaceId,
        owner: OwnerId,
    ) -> Result<(), ProtocolError> {
        if self.namespaces.contains_key(&namespace) {
            return Err(ProtocolError::NamespaceExists(namespace));
        }
        self.namespaces.insert(namespace, owner);
        Ok(())
    }

    fn ensure_unused(&self, id: &MarketId) -> Result<(), ProtocolError> {
        if self.collateral.contains_key(id) || self.loan.contains_key(id) {
            return Err(ProtocolError::MarketExists(id.clone()));
        }
        Ok(())
    }

    pub fn insert_collateral(&mut self, market: CollateralMarketState) -> Result<(), ProtocolError> {
        self.namespace_owner(&market.namespace)?;
        self.ensure_unused(&market.id)?;
        self.collateral.insert(market.id.clone(), market);
        Ok(())
    }

    pub fn insert_loan(&mut self, market: LoanMarketState) -> Result<(), ProtocolError> {
        self.namespace_owner(&market.namespace)?;
        self.ensure_unused(&market.id)?;
        self.loan.insert(market.id.clone(), market);
        Ok(())
    }

    pub fn collateral(&self, id: &MarketId) -> Result<&CollateralMarketState, ProtocolError> {
        self.collateral
            .get(id)
            .ok_or_else(|| ProtocolError::MarketNotFound(id.clone()))
    }

    pub fn loan(&self, id: &MarketId) -> Result<&LoanMarketState, ProtocolError> {
        self.loan
            .get(id)
            .ok_or_else(|| ProtocolError::MarketNotFound(id.clone()))
    }

    /// Replace a collateral market with its updated state
    pub(crate) fn commit_collateral(&mut self, market: CollateralMarketState) {
        self.collateral.insert(market.id.clone(), market);
    }

    /// Replace a loan market with its updated state
    pub(crate) fn commit_loan(&mut self, market: LoanMarketState) {
        self.loan.insert(market.id.clone(), market);
    }

    pub fn collateral_markets(&self) -> impl Iterator<Item = &CollateralMarketState> {
        self.collateral.values()
    }

    pub fn loan_markets(&self) -> impl Iterator<Item = &LoanMarketState> {
        self.loan.values()
    }
}

impl MarketLookup for MarketRegistry {
    fn collateral_market(&self, id: &MarketId) -> Option<&CollateralMarketState> {
        self.collateral.get(id)
    }

    fn loan_market(&self, id: &MarketId) -> Option<&LoanMarketState> {
        self.loan.get(id)
    }
}
