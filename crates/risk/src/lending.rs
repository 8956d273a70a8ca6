//! Lender-side market transitions
//!
//! Lenders deposit liquidity before maturity and receive principal and yield
//! tokens. After maturity, principal redeems 1:1 and yield redeems pro rata
//! for whatever the vault holds beyond outstanding principal.

use termlend_core::{wad, MathError};

use crate::error::RiskError;
use crate::market::LoanMarketState;
use crate::transitions::ensure_positive;

/// Result of a lender deposit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LendTransition {
    pub market: LoanMarketState,
    /// Liquidity moved into the vault
    pub amount: u64,
    /// Principal units routed to the fee receiver
    pub fee: u64,
    /// Principal units minted to the lender
    pub principal_out: u64,
    /// Yield units minted to the lender
    pub yield_out: u64,
}

/// Deposit `amount` of liquidity into an open loan market
pub fn deposit_and_mint(
    market: &LoanMarketState,
    amount: u64,
    now: i64,
) -> Result<LendTransition, RiskError> {
    ensure_positive(amount)?;
    market.ensure_not_matured(now)?;
    let total_lent = market.ensure_lend_capacity(amount)?;
    let fee = wad::bps_of_amount_ceil(amount, market.config.lending_fee_bps)?;

    let mut market = market.clone();
    market.total_lent = total_lent;

    Ok(LendTransition {
        market,
        amount,
        fee,
        principal_out: amount - fee,
        yield_out: amount,
    })
}

/// Principal redeems 1:1 once the market has matured
pub fn redeem_principal(market: &LoanMarketState, amount: u64, now: i64) -> Result<u64, RiskError> {
    ensure_positive(amount)?;
    market.ensure_matured(now)?;
    Ok(amount)
}

/// Liquidity paid for `amount` yield units after maturity.
///
/// `floor((vault_liquidity - principal_supply) * amount / yield_supply)`;
/// zero when the vault holds no surplus.
pub fn redeem_yield(
    market: &LoanMarketState,
    amount: u64,
    vault_liquidity: u64,
    principal_supply: u64,
    yield_supply: u64,
    now: i64,
) -> Result<u64, RiskError> {
    ensure_positive(amount)?;
    market.ensure_matured(now)?;
    if amount > yield_supply {
        return Err(RiskError::InvalidAmount);
    }

    let surplus = vault_liquidity.saturating_sub(principal_supply);
    let payout = wad::mul_div_floor(surplus as u128, amount as u128, yield_supply as u128)?;
    u64::try_from(payout).map_err(|_| RiskError::from(MathError::Overflow))
}
