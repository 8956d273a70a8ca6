//! Namespace and market administration
//!
//! Only the namespace owner may register or reconfigure its markets.

use termlend_core::{MarketId, NamespaceId};
use termlend_risk::{
    CollateralMarketConfig, CollateralMarketState, LoanMarketConfig, LoanMarketState, RiskError,
};

use crate::auth::AuthorizationContext;
use crate::error::ProtocolError;
use crate::events::ProtocolEvent;
use crate::service::{log_rejection, LendingService};

impl LendingService {
    fn require_namespace_owner(
        &self,
        auth: &AuthorizationContext,
        namespace: &NamespaceId,
    ) -> Result<(), ProtocolError> {
        let owner = self.registry.namespace_owner(namespace)?;
        auth.require_owner(owner)
    }

    /// Claim a namespace; the caller becomes its owner
    pub fn register_namespace(
        &mut self,
        auth: &AuthorizationContext,
        namespace: NamespaceId,
    ) -> Result<(), ProtocolError> {
        auth.require_signer()?;
        self.registry
            .insert_namespace(namespace.clone(), auth.owner_id.clone())?;

        tracing::info!(namespace = %namespace, owner = %auth.owner_id, "Namespace registered");
        self.record(ProtocolEvent::NamespaceRegistered {
            namespace,
            owner: auth.owner_id.clone(),
        });
        Ok(())
    }

    pub fn register_collateral_market(
        &mut self,
        auth: &AuthorizationContext,
        market_id: MarketId,
        namespace: NamespaceId,
        config: CollateralMarketConfig,
    ) -> Result<(), ProtocolError> {
        self.require_namespace_owner(auth, &namespace)?;
        config
            .validate()
            .inspect_err(|e| log_rejection("register_collateral_market", e))?;

        self.registry.insert_collateral(CollateralMarketState::new(
            market_id.clone(),
            namespace.clone(),
            config,
        ))?;

        tracing::info!(market = %market_id, namespace = %namespace, "Collateral market registered");
        self.record(ProtocolEvent::CollateralMarketRegistered {
            market: market_id,
            namespace,
        });
        Ok(())
    }

    pub fn register_loan_market(
        &mut self,
        auth: &AuthorizationContext,
        market_id: MarketId,
        namespace: NamespaceId,
        config: LoanMarketConfig,
    ) -> Result<(), ProtocolError> {
        self.require_namespace_owner(auth, &namespace)?;
        config
            .validate(self.clock.unix_timestamp())
            .inspect_err(|e| log_rejection("register_loan_market", e))?;

        self.registry.insert_loan(LoanMarketState::new(
            market_id.clone(),
            namespace.clone(),
            config,
        ))?;

        tracing::info!(market = %market_id, namespace = %namespace, "Loan market registered");
        self.record(ProtocolEvent::LoanMarketRegistered {
            market: market_id,
            namespace,
        });
        Ok(())
    }

    /// Replace a collateral market's risk parameters.
    ///
    /// The collateral asset cannot change and the cap cannot drop below what
    /// is already deposited. The cached price is dropped, so the market must
    /// be refreshed before it is used again.
    pub fn change_collateral_config(
        &mut self,
        auth: &AuthorizationContext,
        market_id: &MarketId,
        config: CollateralMarketConfig,
    ) -> Result<(), ProtocolError> {
        let market = self.registry.collateral(market_id)?;
        self.require_namespace_owner(auth, &market.namespace)?;
        config
            .validate()
            .inspect_err(|e| log_rejection("change_collateral_config", e))?;
        if config.collateral_asset_id != market.config.collateral_asset_id {
            return Err(RiskError::InvalidConfig(format!(
                "collateral asset of {} cannot change",
                market_id
            ))
            .into());
        }
        if config.liquidity_cap < market.total_deposited {
            return Err(RiskError::InvalidConfig(format!(
                "liquidity cap {} is below the {} already deposited in {}",
                config.liquidity_cap, market.total_deposited, market_id
            ))
            .into());
        }

        let mut market = market.clone();
        market.config = config;
        market.last_updated_slot = None;
        self.registry.commit_collateral(market);

        tracing::info!(market = %market_id, "Collateral config changed");
        self.record(ProtocolEvent::MarketConfigChanged {
            market: market_id.clone(),
        });
        Ok(())
    }

    /// Replace a loan market's terms. Its assets cannot change, the cap must
    /// cover what is already borrowed and lent, and the maturity must still
    /// lie in the future.
    pub fn change_loan_market_config(
        &mut self,
        auth: &AuthorizationContext,
        market_id: &MarketId,
        config: LoanMarketConfig,
    ) -> Result<(), ProtocolError> {
        let market = self.registry.loan(market_id)?;
        self.require_namespace_owner(auth, &market.namespace)?;
        config
            .validate(self.clock.unix_timestamp())
            .inspect_err(|e| log_rejection("change_loan_market_config", e))?;
        if config.liquidity_asset_id != market.config.liquidity_asset_id
            || config.principal_asset_id != market.config.principal_asset_id
            || config.yield_asset_id != market.config.yield_asset_id
        {
            return Err(RiskError::InvalidConfig(format!(
                "assets of loan market {} cannot change",
                market_id
            ))
            .into());
        }
        let outstanding = market.total_borrowed.max(market.total_lent);
        if config.liquidity_cap < outstanding {
            return Err(RiskError::InvalidConfig(format!(
                "liquidity cap {} is below the {} outstanding in {}",
                config.liquidity_cap, outstanding, market_id
            ))
            .into());
        }

        let mut market = market.clone();
        market.config = config;
        market.last_updated_slot = None;
        self.registry.commit_loan(market);

        tracing::info!(market = %market_id, "Loan market config changed");
        self.record(ProtocolEvent::MarketConfigChanged {
            market: market_id.clone(),
        });
        Ok(())
    }
}
