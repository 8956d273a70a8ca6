//! Lending service - wires oracle, clock, ledger and the risk engine together
//!
//! Flow for every mutating call: authorize → pure transition → ledger batch →
//! commit state → record event. A failure at any step leaves profiles,
//! markets and balances untouched.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use termlend_core::{Clock, MarketId, NamespaceId, OwnerId, ProfileId, Wad};
use termlend_ledger::{Holder, LedgerBatch, TokenLedger};
use termlend_oracle::{ExchangeRate, PriceOracle};
use termlend_risk::{
    refresh_collateral, refresh_loan_market, refresh_profile, transitions, LiquidationEngine,
    LiquidationPlan, Profile, RiskEngine, RiskError, Valuation,
};

use crate::auth::AuthorizationContext;
use crate::config::ProtocolConfig;
use crate::error::ProtocolError;
use crate::events::{EventRecord, ProtocolEvent};
use crate::registry::MarketRegistry;

/// Result of a borrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowReceipt {
    /// Added to the loan entry
    pub amount: u64,
    /// Principal units routed to the fee receiver
    pub fee: u64,
    /// Principal units minted to the borrower
    pub received: u64,
}

/// Result of a repayment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepayReceipt {
    pub repaid: u64,
    /// Loan amount still outstanding in this market
    pub remaining: u64,
}

/// Result of a liquidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationReport {
    pub plan: LiquidationPlan,
    pub before: Valuation,
    pub after: Valuation,
}

pub(crate) fn log_rejection(operation: &'static str, err: &RiskError) {
    tracing::warn!(operation, error = %err, "Operation rejected");
}

/// Lending service
pub struct LendingService {
    pub(crate) oracle: Arc<dyn PriceOracle>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) ledger: Box<dyn TokenLedger>,
    pub(crate) registry: MarketRegistry,
    profiles: HashMap<ProfileId, Profile>,
    profile_index: HashMap<(OwnerId, NamespaceId), ProfileId>,
    pub(crate) config: ProtocolConfig,
    liquidation: LiquidationEngine,
    events: Vec<EventRecord>,
}

impl LendingService {
    pub fn new(
        config: ProtocolConfig,
        oracle: Arc<dyn PriceOracle>,
        clock: Arc<dyn Clock>,
        ledger: Box<dyn TokenLedger>,
    ) -> Result<Self, ProtocolError> {
        config.validate()?;
        Ok(Self {
            oracle,
            clock,
            ledger,
            registry: MarketRegistry::new(),
            profiles: HashMap::new(),
            profile_index: HashMap::new(),
            liquidation: LiquidationEngine::new(config.liquidation()),
            config,
            events: Vec::new(),
        })
    }

    // === Accessors ===

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn registry(&self) -> &MarketRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &dyn TokenLedger {
        self.ledger.as_ref()
    }

    /// Direct ledger access, for funding accounts outside the protocol
    pub fn ledger_mut(&mut self) -> &mut dyn TokenLedger {
        self.ledger.as_mut()
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn profile(&self, id: &ProfileId) -> Result<&Profile, ProtocolError> {
        self.profiles
            .get(id)
            .ok_or(ProtocolError::ProfileNotFound(*id))
    }

    pub fn profile_id(&self, owner: &OwnerId, namespace: &NamespaceId) -> Option<ProfileId> {
        self.profile_index
            .get(&(owner.clone(), namespace.clone()))
            .copied()
    }

    /// Valuation from the profile's cached entry values
    pub fn valuation(&self, id: &ProfileId) -> Result<Valuation, ProtocolError> {
        let profile = self.profile(id)?;
        Ok(RiskEngine::new(&self.registry).valuate(profile)?)
    }

    pub fn is_liquidatable(&self, id: &ProfileId) -> Result<bool, ProtocolError> {
        let profile = self.profile(id)?;
        Ok(RiskEngine::new(&self.registry).is_liquidatable(profile, self.clock.unix_timestamp())?)
    }

    pub(crate) fn record(&mut self, event: ProtocolEvent) {
        let sequence = self.events.len() as u64 + 1;
        let record = EventRecord::new(sequence, self.clock.current_slot(), event);
        tracing::debug!(sequence, event = record.name(), "Event recorded");
        self.events.push(record);
    }

    fn commit_profile(&mut self, profile: Profile) {
        self.profiles.insert(profile.id, profile);
    }

    // === Profiles ===

    /// Create the caller's profile in `namespace`
    pub fn create_profile(
        &mut self,
        auth: &AuthorizationContext,
        namespace: &NamespaceId,
    ) -> Result<ProfileId, ProtocolError> {
        auth.require_signer()?;
        self.registry.namespace_owner(namespace)?;

        let key = (auth.owner_id.clone(), namespace.clone());
        if self.profile_index.contains_key(&key) {
            return Err(ProtocolError::ProfileExists {
                owner: auth.owner_id.clone(),
                namespace: namespace.clone(),
            });
        }

        let profile = Profile::new(auth.owner_id.clone(), namespace.clone());
        let id = profile.id;
        self.profile_index.insert(key, id);
        self.profiles.insert(id, profile);

        tracing::info!(profile = %id, owner = %auth.owner_id, namespace = %namespace, "Profile created");
        self.record(ProtocolEvent::ProfileCreated {
            profile: id,
            owner: auth.owner_id.clone(),
            namespace: namespace.clone(),
        });
        Ok(id)
    }

    // === Refreshes ===

    /// Pull the oracle price (and exchange rate) into a collateral market
    pub async fn refresh_collateral_market(
        &mut self,
        market_id: &MarketId,
    ) -> Result<Wad, ProtocolError> {
        let slot = self.clock.current_slot();
        let mut market = self.registry.collateral(market_id)?.clone();

        let price = self.oracle.get_price(&market.config.oracle_asset_id).await?;
        let rate = self
            .oracle
            .get_exchange_rate(&market.config.collateral_asset_id)
            .await?
            .unwrap_or_else(|| ExchangeRate::par(slot));

        refresh_collateral(&mut market, &price, &rate, slot)
            .inspect_err(|e| log_rejection("refresh_collateral_market", e))?;
        let price_wad = market.collateral_price_wad;
        self.registry.commit_collateral(market);

        self.record(ProtocolEvent::CollateralMarketRefreshed {
            market: market_id.clone(),
            price_wad,
        });
        Ok(price_wad)
    }

    /// Pull the oracle price into a loan market
    pub async fn refresh_loan_market(&mut self, market_id: &MarketId) -> Result<Wad, ProtocolError> {
        let slot = self.clock.current_slot();
        let mut market = self.registry.loan(market_id)?.clone();

        let price = self.oracle.get_price(&market.config.oracle_asset_id).await?;
        refresh_loan_market(&mut market, &price, slot)
            .inspect_err(|e| log_rejection("refresh_loan_market", e))?;
        let price_wad = market.loan_price_wad;
        self.registry.commit_loan(market);

        self.record(ProtocolEvent::LoanMarketRefreshed {
            market: market_id.clone(),
            price_wad,
        });
        Ok(price_wad)
    }

    /// Refresh every market a profile references, then the profile itself
    pub async fn refresh_all(&mut self, profile_id: &ProfileId) -> Result<(), ProtocolError> {
        let profile = self.profile(profile_id)?;
        let collaterals: Vec<MarketId> =
            profile.collaterals.iter().map(|c| c.market_id.clone()).collect();
        let loans: Vec<MarketId> = profile.loans.iter().map(|l| l.market_id.clone()).collect();

        for market_id in &collaterals {
            self.refresh_collateral_market(market_id).await?;
        }
        for market_id in &loans {
            self.refresh_loan_market(market_id).await?;
        }
        self.refresh_profile(profile_id)
    }

    /// Re-value a profile from its markets' cached prices. Anyone may call it.
    pub fn refresh_profile(&mut self, profile_id: &ProfileId) -> Result<(), ProtocolError> {
        let slot = self.clock.current_slot();
        let mut profile = self.profile(profile_id)?.clone();
        refresh_profile(&mut profile, &self.registry, slot)
            .inspect_err(|e| log_rejection("refresh_profile", e))?;
        self.commit_profile(profile);

        self.record(ProtocolEvent::ProfileRefreshed {
            profile: *profile_id,
        });
        Ok(())
    }

    // === Collateral ===

    pub fn deposit_collateral(
        &mut self,
        auth: &AuthorizationContext,
        profile_id: &ProfileId,
        market_id: &MarketId,
        amount: u64,
    ) -> Result<(), ProtocolError> {
        let slot = self.clock.current_slot();
        let profile = self.profile(profile_id)?;
        auth.require_owner(&profile.owner)?;
        let market = self.registry.collateral(market_id)?;

        let t = transitions::deposit_collateral(profile, market, amount, slot, &self.config.limits())
            .inspect_err(|e| log_rejection("deposit_collateral", e))?;

        let batch = LedgerBatch::new().transfer(
            Holder::User(auth.owner_id.clone()),
            Holder::CollateralVault(market_id.clone()),
            &t.market.config.collateral_asset_id,
            t.amount,
        );
        self.ledger.execute(&batch)?;

        tracing::info!(
            profile = %profile_id,
            market = %market_id,
            amount,
            total_deposited = t.market.total_deposited,
            "Collateral deposited"
        );
        self.commit_profile(t.profile);
        self.registry.commit_collateral(t.market);
        self.record(ProtocolEvent::CollateralDeposited {
            profile: *profile_id,
            market: market_id.clone(),
            amount,
        });
        Ok(())
    }

    pub fn withdraw_collateral(
        &mut self,
        auth: &AuthorizationContext,
        profile_id: &ProfileId,
        market_id: &MarketId,
        amount: u64,
    ) -> Result<(), ProtocolError> {
        let slot = self.clock.current_slot();
        let profile = self.profile(profile_id)?;
        auth.require_owner(&profile.owner)?;
        let market = self.registry.collateral(market_id)?;

        let t = transitions::withdraw_collateral(profile, market, &self.registry, amount, slot)
            .inspect_err(|e| log_rejection("withdraw_collateral", e))?;

        let batch = LedgerBatch::new().transfer(
            Holder::CollateralVault(market_id.clone()),
            Holder::User(auth.owner_id.clone()),
            &t.market.config.collateral_asset_id,
            t.amount,
        );
        self.ledger.execute(&batch)?;

        tracing::info!(
            profile = %profile_id,
            market = %market_id,
            amount,
            "Collateral withdrawn"
        );
        self.commit_profile(t.profile);
        self.registry.commit_collateral(t.market);
        self.record(ProtocolEvent::CollateralWithdrawn {
            profile: *profile_id,
            market: market_id.clone(),
            amount,
        });
        Ok(())
    }

    // === Loans ===

    /// Borrow against collateral: the loan entry grows by `amount`, the
    /// borrower is minted `amount - fee` principal units
    pub fn mint_liquidity_with_collateral(
        &mut self,
        auth: &AuthorizationContext,
        profile_id: &ProfileId,
        market_id: &MarketId,
        amount: u64,
    ) -> Result<BorrowReceipt, ProtocolError> {
        let slot = self.clock.current_slot();
        let now = self.clock.unix_timestamp();
        let profile = self.profile(profile_id)?;
        auth.require_owner(&profile.owner)?;
        let market = self.registry.loan(market_id)?;

        let t = transitions::mint_liquidity(
            profile,
            market,
            &self.registry,
            amount,
            now,
            slot,
            &self.config.limits(),
        )
        .inspect_err(|e| log_rejection("mint_liquidity_with_collateral", e))?;

        let principal = &t.market.config.principal_asset_id;
        let batch = LedgerBatch::new()
            .mint(Holder::User(auth.owner_id.clone()), principal, t.net_amount())
            .mint(Holder::FeeReceiver(market_id.clone()), principal, t.fee);
        self.ledger.execute(&batch)?;

        let receipt = BorrowReceipt {
            amount: t.amount,
            fee: t.fee,
            received: t.net_amount(),
        };
        tracing::info!(
            profile = %profile_id,
            market = %market_id,
            amount,
            fee = t.fee,
            total_borrowed = t.market.total_borrowed,
            "Liquidity minted"
        );
        self.commit_profile(t.profile);
        self.registry.commit_loan(t.market);
        self.record(ProtocolEvent::LiquidityMinted {
            profile: *profile_id,
            market: market_id.clone(),
            amount,
            fee: receipt.fee,
        });
        Ok(receipt)
    }

    /// Repay up to `amount` of the loan in `market_id` with liquidity
    pub fn repay_liquidity(
        &mut self,
        auth: &AuthorizationContext,
        profile_id: &ProfileId,
        market_id: &MarketId,
        amount: u64,
    ) -> Result<RepayReceipt, ProtocolError> {
        let profile = self.profile(profile_id)?;
        auth.require_owner(&profile.owner)?;
        let market = self.registry.loan(market_id)?;

        let t = transitions::repay_liquidity(profile, market, amount)
            .inspect_err(|e| log_rejection("repay_liquidity", e))?;

        let batch = LedgerBatch::new().transfer(
            Holder::User(auth.owner_id.clone()),
            Holder::LiquidityVault(market_id.clone()),
            &t.market.config.liquidity_asset_id,
            t.amount,
        );
        self.ledger.execute(&batch)?;

        let receipt = RepayReceipt {
            repaid: t.amount,
            remaining: t.profile.loan(market_id).map(|l| l.amount).unwrap_or(0),
        };
        tracing::info!(
            profile = %profile_id,
            market = %market_id,
            repaid = receipt.repaid,
            remaining = receipt.remaining,
            "Liquidity repaid"
        );
        self.commit_profile(t.profile);
        self.registry.commit_loan(t.market);
        self.record(ProtocolEvent::LiquidityRepaid {
            profile: *profile_id,
            market: market_id.clone(),
            amount: receipt.repaid,
        });
        Ok(receipt)
    }

    // === Liquidation ===

    /// Liquidate one loan of a profile against one of its collaterals.
    ///
    /// Any signer may liquidate. The liquidator pays the repay amount in the
    /// loan's liquidity asset and receives the seized collateral.
    pub fn liquidate(
        &mut self,
        auth: &AuthorizationContext,
        profile_id: &ProfileId,
        collateral_market_id: &MarketId,
        loan_market_id: &MarketId,
    ) -> Result<LiquidationReport, ProtocolError> {
        auth.require_signer()?;
        let slot = self.clock.current_slot();
        let now = self.clock.unix_timestamp();
        let profile = self.profile(profile_id)?;
        let collateral_market = self.registry.collateral(collateral_market_id)?;
        let loan_market = self.registry.loan(loan_market_id)?;

        let outcome = self
            .liquidation
            .liquidate(
                profile,
                collateral_market,
                loan_market,
                &self.registry,
                now,
                slot,
            )
            .inspect_err(|e| log_rejection("liquidate", e))?;
        let plan = outcome.plan;

        let liquidator = Holder::User(auth.owner_id.clone());
        let batch = LedgerBatch::new()
            .transfer(
                liquidator.clone(),
                Holder::LiquidityVault(loan_market_id.clone()),
                &outcome.loan_market.config.liquidity_asset_id,
                plan.repay_amount,
            )
            .transfer(
                Holder::CollateralVault(collateral_market_id.clone()),
                liquidator,
                &outcome.collateral_market.config.collateral_asset_id,
                plan.seize_amount,
            );
        self.ledger.execute(&batch)?;

        tracing::info!(
            profile = %profile_id,
            liquidator = %auth.owner_id,
            mode = %plan.mode,
            repay_amount = plan.repay_amount,
            seize_amount = plan.seize_amount,
            "Profile liquidated"
        );
        let report = LiquidationReport {
            plan,
            before: outcome.before,
            after: outcome.after,
        };
        self.commit_profile(outcome.profile);
        self.registry.commit_collateral(outcome.collateral_market);
        self.registry.commit_loan(outcome.loan_market);
        self.record(ProtocolEvent::Liquidated {
            profile: *profile_id,
            liquidator: auth.owner_id.clone(),
            collateral_market: collateral_market_id.clone(),
            loan_market: loan_market_id.clone(),
            mode: plan.mode,
            repay_amount: plan.repay_amount,
            seize_amount: plan.seize_amount,
        });
        Ok(report)
    }
}
