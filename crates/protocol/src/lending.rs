//! Lender operations
//!
//! Lenders fund a loan market's liquidity vault before maturity and hold
//! principal and yield tokens until they redeem after maturity.

use serde::{Deserialize, Serialize};
use termlend_core::MarketId;
use termlend_ledger::{Holder, LedgerBatch};
use termlend_risk::lending;

use crate::auth::AuthorizationContext;
use crate::error::ProtocolError;
use crate::events::ProtocolEvent;
use crate::service::{log_rejection, LendingService};

/// Tokens minted for a lender deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendReceipt {
    pub principal: u64,
    pub yield_units: u64,
    pub fee: u64,
}

impl LendingService {
    /// Deposit liquidity; mint principal (net of the lending fee) and yield
    pub fn deposit_and_mint(
        &mut self,
        auth: &AuthorizationContext,
        market_id: &MarketId,
        amount: u64,
    ) -> Result<LendReceipt, ProtocolError> {
        auth.require_signer()?;
        let now = self.clock.unix_timestamp();
        let market = self.registry.loan(market_id)?;

        let t = lending::deposit_and_mint(market, amount, now)
            .inspect_err(|e| log_rejection("deposit_and_mint", e))?;

        let lender = Holder::User(auth.owner_id.clone());
        let config = &t.market.config;
        let batch = LedgerBatch::new()
            .transfer(
                lender.clone(),
                Holder::LiquidityVault(market_id.clone()),
                &config.liquidity_asset_id,
                t.amount,
            )
            .mint(lender.clone(), &config.principal_asset_id, t.principal_out)
            .mint(
                Holder::FeeReceiver(market_id.clone()),
                &config.principal_asset_id,
                t.fee,
            )
            .mint(lender, &config.yield_asset_id, t.yield_out);
        self.ledger.execute(&batch)?;

        let receipt = LendReceipt {
            principal: t.principal_out,
            yield_units: t.yield_out,
            fee: t.fee,
        };
        tracing::info!(
            lender = %auth.owner_id,
            market = %market_id,
            amount,
            fee = t.fee,
            total_lent = t.market.total_lent,
            "Lender deposited"
        );
        self.registry.commit_loan(t.market);
        self.record(ProtocolEvent::LenderDeposited {
            lender: auth.owner_id.clone(),
            market: market_id.clone(),
            amount,
            fee: receipt.fee,
        });
        Ok(receipt)
    }

    /// Burn principal units for the same amount of liquidity, after maturity
    pub fn redeem_principal(
        &mut self,
        auth: &AuthorizationContext,
        market_id: &MarketId,
        amount: u64,
    ) -> Result<u64, ProtocolError> {
        auth.require_signer()?;
        let now = self.clock.unix_timestamp();
        let market = self.registry.loan(market_id)?;

        let payout = lending::redeem_principal(market, amount, now)
            .inspect_err(|e| log_rejection("redeem_principal", e))?;

        let holder = Holder::User(auth.owner_id.clone());
        let batch = LedgerBatch::new()
            .burn(holder.clone(), &market.config.principal_asset_id, amount)
            .transfer(
                Holder::LiquidityVault(market_id.clone()),
                holder,
                &market.config.liquidity_asset_id,
                payout,
            );
        self.ledger.execute(&batch)?;

        tracing::info!(holder = %auth.owner_id, market = %market_id, amount, "Principal redeemed");
        self.record(ProtocolEvent::PrincipalRedeemed {
            holder: auth.owner_id.clone(),
            market: market_id.clone(),
            amount,
        });
        Ok(payout)
    }

    /// Burn yield units for their share of the vault surplus, after maturity
    pub fn redeem_yield(
        &mut self,
        auth: &AuthorizationContext,
        market_id: &MarketId,
        amount: u64,
    ) -> Result<u64, ProtocolError> {
        auth.require_signer()?;
        let now = self.clock.unix_timestamp();
        let market = self.registry.loan(market_id)?;
        let config = &market.config;

        let vault = Holder::LiquidityVault(market_id.clone());
        let payout = lending::redeem_yield(
            market,
            amount,
            self.ledger.balance(&vault, &config.liquidity_asset_id),
            self.ledger.supply(&config.principal_asset_id),
            self.ledger.supply(&config.yield_asset_id),
            now,
        )
        .inspect_err(|e| log_rejection("redeem_yield", e))?;

        let holder = Holder::User(auth.owner_id.clone());
        let batch = LedgerBatch::new()
            .burn(holder.clone(), &config.yield_asset_id, amount)
            .transfer(vault, holder, &config.liquidity_asset_id, payout);
        self.ledger.execute(&batch)?;

        tracing::info!(
            holder = %auth.owner_id,
            market = %market_id,
            amount,
            payout,
            "Yield redeemed"
        );
        self.record(ProtocolEvent::YieldRedeemed {
            holder: auth.owner_id.clone(),
            market: market_id.clone(),
            amount,
            payout,
        });
        Ok(payout)
    }
}
