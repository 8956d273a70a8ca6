//! Integration tests for oracle + risk engine + ledger through the lending service

use std::io::Write;
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use termlend_core::{AssetId, ManualClock, MarketId, NamespaceId, OwnerId, ProfileId, Wad};
use termlend_ledger::{Holder, InMemoryLedger, LedgerError, TokenLedger};
use termlend_oracle::{MockOracle, OracleError};
use termlend_protocol::{
    AuthorizationContext, LendingService, ProtocolConfig, ProtocolError, ProtocolEvent,
};
use termlend_risk::{CollateralMarketConfig, LiquidationMode, LoanMarketConfig, RiskError};

const START_TS: i64 = 1_000;
const MATURITY: i64 = 10_000;

struct Harness {
    service: LendingService,
    oracle: Arc<MockOracle>,
    clock: Arc<ManualClock>,
    alice: ProfileId,
}

fn sol() -> AssetId {
    AssetId::new("SOL")
}

fn usdc() -> AssetId {
    AssetId::new("USDC")
}

fn pt(market: &str) -> AssetId {
    AssetId::new(format!("PT-{market}"))
}

fn yt(market: &str) -> AssetId {
    AssetId::new(format!("YT-{market}"))
}

fn ns() -> NamespaceId {
    NamespaceId::new("main")
}

fn sol_market() -> MarketId {
    MarketId::new("sol-col")
}

fn usdc_dec() -> MarketId {
    MarketId::new("usdc-dec")
}

fn usdc_jun() -> MarketId {
    MarketId::new("usdc-jun")
}

fn admin() -> AuthorizationContext {
    AuthorizationContext::signer("admin")
}

fn alice() -> AuthorizationContext {
    AuthorizationContext::signer("alice")
}

fn bob() -> AuthorizationContext {
    AuthorizationContext::signer("bob")
}

fn user(name: &str) -> Holder {
    Holder::User(OwnerId::new(name))
}

fn loan_config(maturity: i64, name: &str) -> LoanMarketConfig {
    LoanMarketConfig {
        maturity_timestamp: maturity,
        oracle_asset_id: usdc(),
        lending_fee_bps: 10,
        borrow_fee_bps: 30,
        liquidity_cap: 1_000_000_000_000,
        liquidity_asset_id: usdc(),
        principal_asset_id: pt(name),
        yield_asset_id: yt(name),
    }
}

/// One SOL collateral market (5 per unit by default) and one USDC loan market
fn setup_with_prices(sol_price: Decimal, usdc_price: Decimal) -> Harness {
    let clock = Arc::new(ManualClock::new(1, START_TS));
    let oracle = Arc::new(MockOracle::new());
    oracle.set_price(sol(), sol_price, 1).unwrap();
    oracle.set_price(usdc(), usdc_price, 1).unwrap();

    let mut service = LendingService::new(
        ProtocolConfig::default(),
        oracle.clone(),
        clock.clone(),
        Box::new(InMemoryLedger::new()),
    )
    .unwrap();

    service.register_namespace(&admin(), ns()).unwrap();
    service
        .register_collateral_market(
            &admin(),
            sol_market(),
            ns(),
            CollateralMarketConfig::new(sol(), 9000, 9500, 500, 10_000_000_000),
        )
        .unwrap();
    service
        .register_loan_market(&admin(), usdc_dec(), ns(), loan_config(MATURITY, "usdc-dec"))
        .unwrap();

    let alice_id = service.create_profile(&alice(), &ns()).unwrap();
    service
        .ledger_mut()
        .mint(user("alice"), &sol(), 20_000_000_000)
        .unwrap();

    Harness {
        service,
        oracle,
        clock,
        alice: alice_id,
    }
}

fn setup() -> Harness {
    setup_with_prices(dec!(5), dec!(1))
}

impl Harness {
    /// Next slot, with every oracle feed republished unchanged
    fn advance_slot(&self) -> u64 {
        let slot = self.clock.advance_slot();
        self.oracle.republish_all(slot);
        slot
    }

    /// Refresh every registered market, then alice's profile
    async fn refresh(&mut self) {
        let collateral: Vec<MarketId> = self
            .service
            .registry()
            .collateral_markets()
            .map(|m| m.id.clone())
            .collect();
        let loans: Vec<MarketId> = self
            .service
            .registry()
            .loan_markets()
            .map(|m| m.id.clone())
            .collect();

        for id in &collateral {
            self.service.refresh_collateral_market(id).await.unwrap();
        }
        for id in &loans {
            self.service.refresh_loan_market(id).await.unwrap();
        }
        self.service.refresh_profile(&self.alice).unwrap();
    }

    fn balance(&self, holder: &Holder, asset: &AssetId) -> u64 {
        self.service.ledger().balance(holder, asset)
    }

    fn deposit(&mut self, amount: u64) {
        self.service
            .deposit_collateral(&alice(), &self.alice, &sol_market(), amount)
            .unwrap();
    }
}

// ============================================================================
// Borrowing power and health
// ============================================================================

#[tokio::test]
async fn test_borrowing_power_boundary() {
    let mut h = setup();
    h.refresh().await;
    h.deposit(100);
    h.service.refresh_profile(&h.alice).unwrap();

    let valuation = h.service.valuation(&h.alice).unwrap();
    assert_eq!(valuation.collateral_value, Wad::from_integer(500));
    assert_eq!(valuation.borrowing_power, Wad::from_integer(450));

    let receipt = h
        .service
        .mint_liquidity_with_collateral(&alice(), &h.alice, &usdc_dec(), 450)
        .unwrap();
    // 450 * 0.3% = 1.35 -> 2
    assert_eq!(receipt.fee, 2);
    assert_eq!(receipt.received, 448);
    assert_eq!(h.balance(&user("alice"), &pt("usdc-dec")), 448);
    assert_eq!(
        h.balance(&Holder::FeeReceiver(usdc_dec()), &pt("usdc-dec")),
        2
    );

    let result = h
        .service
        .mint_liquidity_with_collateral(&alice(), &h.alice, &usdc_dec(), 1);
    assert!(matches!(
        result,
        Err(ProtocolError::Risk(RiskError::Unhealthy { .. }))
    ));

    // rejected borrow left everything untouched
    let profile = h.service.profile(&h.alice).unwrap();
    assert_eq!(profile.loan(&usdc_dec()).unwrap().amount, 450);
    assert_eq!(
        h.service.registry().loan(&usdc_dec()).unwrap().total_borrowed,
        450
    );
    assert_eq!(h.balance(&user("alice"), &pt("usdc-dec")), 448);

    let valuation = h.service.valuation(&h.alice).unwrap();
    assert!(valuation.loan_value <= valuation.borrowing_power);
}

#[tokio::test]
async fn test_liquidity_cap() {
    let mut h = setup();
    h.refresh().await;

    let result =
        h.service
            .deposit_collateral(&alice(), &h.alice, &sol_market(), 10_000_000_001);
    assert!(matches!(
        result,
        Err(ProtocolError::Risk(RiskError::ExceedsLiquidityCap { .. }))
    ));
    assert_eq!(
        h.service.registry().collateral(&sol_market()).unwrap().total_deposited,
        0
    );
    assert_eq!(h.balance(&user("alice"), &sol()), 20_000_000_000);

    h.deposit(10_000_000_000);
    assert_eq!(
        h.service.registry().collateral(&sol_market()).unwrap().total_deposited,
        10_000_000_000
    );
}

#[tokio::test]
async fn test_deposit_withdraw_round_trip() {
    let mut h = setup();
    h.refresh().await;
    h.deposit(60);

    let before = h
        .service
        .profile(&h.alice)
        .unwrap()
        .collateral(&sol_market())
        .unwrap()
        .clone();

    h.deposit(40);
    h.service
        .withdraw_collateral(&alice(), &h.alice, &sol_market(), 40)
        .unwrap();

    let after = h
        .service
        .profile(&h.alice)
        .unwrap()
        .collateral(&sol_market())
        .unwrap()
        .clone();
    assert_eq!(after, before);
    assert_eq!(h.balance(&user("alice"), &sol()), 20_000_000_000 - 60);
    assert_eq!(h.balance(&Holder::CollateralVault(sol_market()), &sol()), 60);

    // full withdrawal removes the entry
    h.service
        .withdraw_collateral(&alice(), &h.alice, &sol_market(), 60)
        .unwrap();
    assert!(h
        .service
        .profile(&h.alice)
        .unwrap()
        .collateral(&sol_market())
        .is_none());
}

#[tokio::test]
async fn test_withdraw_rejects_unhealthy() {
    let mut h = setup();
    h.refresh().await;
    h.deposit(100);
    h.service
        .mint_liquidity_with_collateral(&alice(), &h.alice, &usdc_dec(), 400)
        .unwrap();

    // 89 * 5 * 0.9 = 400.5 still covers 400
    h.service
        .withdraw_collateral(&alice(), &h.alice, &sol_market(), 11)
        .unwrap();
    let result = h
        .service
        .withdraw_collateral(&alice(), &h.alice, &sol_market(), 1);
    assert!(matches!(
        result,
        Err(ProtocolError::Risk(RiskError::Unhealthy { .. }))
    ));
    assert_eq!(
        h.service
            .profile(&h.alice)
            .unwrap()
            .collateral(&sol_market())
            .unwrap()
            .amount,
        89
    );
}

// ============================================================================
// Freshness
// ============================================================================

#[tokio::test]
async fn test_withdraw_against_unrefreshed_market() {
    let mut h = setup();
    h.refresh().await;
    h.deposit(100);

    h.advance_slot();
    let result = h
        .service
        .withdraw_collateral(&alice(), &h.alice, &sol_market(), 10);
    assert!(matches!(
        result,
        Err(ProtocolError::Risk(RiskError::StaleCollateral(_)))
    ));

    h.refresh().await;
    h.service
        .withdraw_collateral(&alice(), &h.alice, &sol_market(), 10)
        .unwrap();
}

#[tokio::test]
async fn test_refresh_profile_twice_is_stable() {
    let mut h = setup();
    h.refresh().await;
    h.deposit(100);
    h.service
        .mint_liquidity_with_collateral(&alice(), &h.alice, &usdc_dec(), 100)
        .unwrap();

    h.service.refresh_profile(&h.alice).unwrap();
    let first = h.service.profile(&h.alice).unwrap().clone();
    h.service.refresh_profile(&h.alice).unwrap();
    assert_eq!(h.service.profile(&h.alice).unwrap(), &first);
}

#[tokio::test]
async fn test_stale_oracle_rejected() {
    let mut h = setup();
    h.clock.advance_slot();

    let result = h.service.refresh_collateral_market(&sol_market()).await;
    assert!(matches!(
        result,
        Err(ProtocolError::Risk(RiskError::StaleOracle { .. }))
    ));

    h.oracle.remove_price(&usdc());
    let result = h.service.refresh_loan_market(&usdc_dec()).await;
    assert!(matches!(
        result,
        Err(ProtocolError::Oracle(OracleError::AssetNotFound { .. }))
    ));
}

#[tokio::test]
async fn test_profile_refresh_needs_fresh_markets() {
    let mut h = setup();
    h.refresh().await;
    h.deposit(100);

    h.advance_slot();
    let result = h.service.refresh_profile(&h.alice);
    assert!(matches!(
        result,
        Err(ProtocolError::Risk(RiskError::StaleCollateral(_)))
    ));

    h.service.refresh_all(&h.alice).await.unwrap();
    assert!(h.service.profile(&h.alice).unwrap().is_fresh(2));
}

#[tokio::test]
async fn test_yield_bearing_collateral_price() {
    let mut h = setup();
    let psol = AssetId::new("pSOL");
    h.oracle.set_exchange_rate(psol.clone(), dec!(0.8), 1).unwrap();
    h.service
        .register_collateral_market(
            &admin(),
            MarketId::new("psol-col"),
            ns(),
            CollateralMarketConfig::new(psol, 8000, 9000, 500, 1_000_000).with_oracle_asset(sol()),
        )
        .unwrap();

    let price = h
        .service
        .refresh_collateral_market(&MarketId::new("psol-col"))
        .await
        .unwrap();
    // 5 / 0.8
    assert_eq!(price, Wad::from_raw(6_250_000_000_000_000_000));
}

// ============================================================================
// Repay
// ============================================================================

#[tokio::test]
async fn test_repay_partial_then_capped() {
    let mut h = setup();
    h.refresh().await;
    h.deposit(100);
    h.service
        .mint_liquidity_with_collateral(&alice(), &h.alice, &usdc_dec(), 200)
        .unwrap();
    h.service
        .ledger_mut()
        .mint(user("alice"), &usdc(), 1_000)
        .unwrap();

    let receipt = h
        .service
        .repay_liquidity(&alice(), &h.alice, &usdc_dec(), 50)
        .unwrap();
    assert_eq!(receipt.repaid, 50);
    assert_eq!(receipt.remaining, 150);

    let receipt = h
        .service
        .repay_liquidity(&alice(), &h.alice, &usdc_dec(), 1_000)
        .unwrap();
    assert_eq!(receipt.repaid, 150);
    assert_eq!(receipt.remaining, 0);
    assert!(h.service.profile(&h.alice).unwrap().loan(&usdc_dec()).is_none());
    assert_eq!(h.balance(&user("alice"), &usdc()), 800);
    assert_eq!(h.balance(&Holder::LiquidityVault(usdc_dec()), &usdc()), 200);
    assert_eq!(
        h.service.registry().loan(&usdc_dec()).unwrap().total_borrowed,
        0
    );

    let result = h
        .service
        .repay_liquidity(&alice(), &h.alice, &usdc_dec(), 1);
    assert!(matches!(
        result,
        Err(ProtocolError::Risk(RiskError::NoSuchLoan(_)))
    ));
}

#[tokio::test]
async fn test_repay_without_funds_changes_nothing() {
    let mut h = setup();
    h.refresh().await;
    h.deposit(100);
    h.service
        .mint_liquidity_with_collateral(&alice(), &h.alice, &usdc_dec(), 200)
        .unwrap();

    let result = h
        .service
        .repay_liquidity(&alice(), &h.alice, &usdc_dec(), 50);
    assert!(matches!(
        result,
        Err(ProtocolError::Ledger(LedgerError::InsufficientFunds { .. }))
    ));
    assert_eq!(
        h.service
            .profile(&h.alice)
            .unwrap()
            .loan(&usdc_dec())
            .unwrap()
            .amount,
        200
    );
    assert_eq!(
        h.service.registry().loan(&usdc_dec()).unwrap().total_borrowed,
        200
    );
}

// ============================================================================
// Liquidation
// ============================================================================

#[tokio::test]
async fn test_matured_loan_liquidated_first() {
    let mut h = setup();
    h.service
        .register_loan_market(&admin(), usdc_jun(), ns(), loan_config(2_000, "usdc-jun"))
        .unwrap();
    h.refresh().await;
    h.deposit(100);
    h.service
        .mint_liquidity_with_collateral(&alice(), &h.alice, &usdc_jun(), 100)
        .unwrap();
    h.service
        .mint_liquidity_with_collateral(&alice(), &h.alice, &usdc_dec(), 100)
        .unwrap();
    assert!(!h.service.is_liquidatable(&h.alice).unwrap());

    h.clock.set_timestamp(2_001);
    h.advance_slot();
    h.refresh().await;
    assert!(h.service.is_liquidatable(&h.alice).unwrap());
    h.service.ledger_mut().mint(user("bob"), &usdc(), 1_000).unwrap();

    let result = h
        .service
        .liquidate(&bob(), &h.alice, &sol_market(), &usdc_dec());
    assert!(matches!(
        result,
        Err(ProtocolError::Risk(RiskError::MustLiquidateMaturedFirst(_)))
    ));

    let report = h
        .service
        .liquidate(&bob(), &h.alice, &sol_market(), &usdc_jun())
        .unwrap();
    assert_eq!(report.plan.mode, LiquidationMode::Matured);
    assert_eq!(report.plan.repay_amount, 100);
    // ceil(100 * 1.05 / 5)
    assert_eq!(report.plan.seize_amount, 21);

    let profile = h.service.profile(&h.alice).unwrap();
    assert!(profile.loan(&usdc_jun()).is_none());
    assert_eq!(profile.loan(&usdc_dec()).unwrap().amount, 100);
    assert_eq!(profile.collateral(&sol_market()).unwrap().amount, 79);

    assert_eq!(h.balance(&user("bob"), &usdc()), 900);
    assert_eq!(h.balance(&user("bob"), &sol()), 21);
    assert_eq!(h.balance(&Holder::LiquidityVault(usdc_jun()), &usdc()), 100);
    assert_eq!(h.balance(&Holder::CollateralVault(sol_market()), &sol()), 79);
    assert_eq!(
        h.service.registry().collateral(&sol_market()).unwrap().total_deposited,
        79
    );

    // remaining position is healthy
    let result = h
        .service
        .liquidate(&bob(), &h.alice, &sol_market(), &usdc_dec());
    assert!(matches!(
        result,
        Err(ProtocolError::Risk(RiskError::PositionHealthy))
    ));
}

#[tokio::test]
async fn test_ratio_liquidation_reduces_gap() {
    // 6-decimal tokens: 5 USD per SOL, 1 USD per USDC
    let mut h = setup_with_prices(dec!(0.000005), dec!(0.000001));
    h.refresh().await;
    h.deposit(100_000_000);
    h.service
        .mint_liquidity_with_collateral(&alice(), &h.alice, &usdc_dec(), 450_000_000)
        .unwrap();
    h.service
        .ledger_mut()
        .mint(user("bob"), &usdc(), 100_000_000)
        .unwrap();

    let result = h
        .service
        .liquidate(&bob(), &h.alice, &sol_market(), &usdc_dec());
    assert!(matches!(
        result,
        Err(ProtocolError::Risk(RiskError::PositionHealthy))
    ));

    let slot = h.advance_slot();
    h.oracle.set_price(sol(), dec!(0.0000045), slot).unwrap();
    h.refresh().await;

    let report = h
        .service
        .liquidate(&bob(), &h.alice, &sol_market(), &usdc_dec())
        .unwrap();
    assert_eq!(report.plan.mode, LiquidationMode::Ratio);
    // half of the 22.5 USD gap
    assert_eq!(report.plan.repay_amount, 11_250_000);
    assert_eq!(report.plan.seize_amount, 2_625_000);
    assert!(report.after.loan_value < report.before.loan_value);
    assert!(
        report.after.liquidation_gap() < report.before.liquidation_gap()
            || report.after.is_healthy()
    );

    assert_eq!(
        h.service
            .profile(&h.alice)
            .unwrap()
            .loan(&usdc_dec())
            .unwrap()
            .amount,
        438_750_000
    );
    assert_eq!(h.balance(&user("bob"), &sol()), 2_625_000);
}

#[tokio::test]
async fn test_ratio_liquidation_with_whole_collateral_units() {
    let mut h = setup_with_prices(dec!(1000), dec!(1));
    h.refresh().await;
    h.deposit(10);
    h.service
        .mint_liquidity_with_collateral(&alice(), &h.alice, &usdc_dec(), 9_000)
        .unwrap();
    h.service
        .ledger_mut()
        .mint(user("bob"), &usdc(), 10_000)
        .unwrap();

    let slot = h.advance_slot();
    h.oracle.set_price(sol(), dec!(947), slot).unwrap();
    h.refresh().await;

    let report = h
        .service
        .liquidate(&bob(), &h.alice, &sol_market(), &usdc_dec())
        .unwrap();
    // the 3.5 gap needs only 2 USDC, but the one seized SOL costs 947 / 1.05
    assert_eq!(report.plan.mode, LiquidationMode::Ratio);
    assert_eq!(report.plan.seize_amount, 1);
    assert_eq!(report.plan.repay_amount, 901);
    assert!(report.after.liquidation_gap() < report.before.liquidation_gap());

    assert_eq!(h.balance(&user("bob"), &usdc()), 9_099);
    assert_eq!(h.balance(&user("bob"), &sol()), 1);
    assert_eq!(
        h.service
            .profile(&h.alice)
            .unwrap()
            .loan(&usdc_dec())
            .unwrap()
            .amount,
        8_099
    );
}

#[tokio::test]
async fn test_liquidation_requires_fresh_data() {
    let mut h = setup();
    h.service
        .register_loan_market(&admin(), usdc_jun(), ns(), loan_config(2_000, "usdc-jun"))
        .unwrap();
    h.refresh().await;
    h.deposit(100);
    h.service
        .mint_liquidity_with_collateral(&alice(), &h.alice, &usdc_jun(), 100)
        .unwrap();

    h.clock.set_timestamp(2_001);
    h.advance_slot();

    let result = h
        .service
        .liquidate(&bob(), &h.alice, &sol_market(), &usdc_jun());
    assert!(matches!(
        result,
        Err(ProtocolError::Risk(RiskError::StaleData(_)))
    ));
}

// ============================================================================
// Lender side
// ============================================================================

#[tokio::test]
async fn test_lender_deposit_and_redeem() {
    let mut h = setup();
    let carol = AuthorizationContext::signer("carol");
    h.service
        .ledger_mut()
        .mint(user("carol"), &usdc(), 1_000)
        .unwrap();

    let receipt = h.service.deposit_and_mint(&carol, &usdc_dec(), 1_000).unwrap();
    assert_eq!(receipt.fee, 1);
    assert_eq!(receipt.principal, 999);
    assert_eq!(receipt.yield_units, 1_000);
    assert_eq!(h.balance(&user("carol"), &pt("usdc-dec")), 999);
    assert_eq!(h.balance(&user("carol"), &yt("usdc-dec")), 1_000);
    assert_eq!(h.service.registry().loan(&usdc_dec()).unwrap().total_lent, 1_000);

    let early = h.service.redeem_principal(&carol, &usdc_dec(), 999);
    assert!(matches!(
        early,
        Err(ProtocolError::Risk(RiskError::NotMatured(_)))
    ));

    // interest earned by the vault
    h.service
        .ledger_mut()
        .mint(Holder::LiquidityVault(usdc_dec()), &usdc(), 50)
        .unwrap();
    h.clock.set_timestamp(MATURITY);

    let late = h.service.deposit_and_mint(&carol, &usdc_dec(), 1);
    assert!(matches!(late, Err(ProtocolError::Risk(RiskError::Matured(_)))));

    assert_eq!(h.service.redeem_principal(&carol, &usdc_dec(), 999).unwrap(), 999);
    assert_eq!(h.balance(&user("carol"), &usdc()), 999);

    // surplus = 51 in vault - 1 principal outstanding
    assert_eq!(h.service.redeem_yield(&carol, &usdc_dec(), 1_000).unwrap(), 50);
    assert_eq!(h.balance(&user("carol"), &usdc()), 1_049);
    assert_eq!(h.service.ledger().supply(&yt("usdc-dec")), 0);
}

// ============================================================================
// Authorization and administration
// ============================================================================

#[tokio::test]
async fn test_only_owner_mutates_profile() {
    let mut h = setup();
    h.refresh().await;
    h.deposit(100);

    let result = h
        .service
        .withdraw_collateral(&bob(), &h.alice, &sol_market(), 10);
    assert!(matches!(result, Err(ProtocolError::Unauthorized(_))));

    let unsigned = AuthorizationContext::unsigned("alice");
    let result = h
        .service
        .deposit_collateral(&unsigned, &h.alice, &sol_market(), 10);
    assert!(matches!(result, Err(ProtocolError::Unauthorized(_))));

    let result = h
        .service
        .liquidate(&AuthorizationContext::unsigned("bob"), &h.alice, &sol_market(), &usdc_dec());
    assert!(matches!(result, Err(ProtocolError::Unauthorized(_))));
}

#[tokio::test]
async fn test_market_administration() {
    let mut h = setup();

    let result = h.service.register_collateral_market(
        &bob(),
        MarketId::new("eth-col"),
        ns(),
        CollateralMarketConfig::new(AssetId::new("ETH"), 8000, 9000, 500, 1_000),
    );
    assert!(matches!(result, Err(ProtocolError::Unauthorized(_))));

    let result = h.service.register_collateral_market(
        &admin(),
        MarketId::new("eth-col"),
        ns(),
        CollateralMarketConfig::new(AssetId::new("ETH"), 9600, 9000, 500, 1_000),
    );
    assert!(matches!(
        result,
        Err(ProtocolError::Risk(RiskError::InvalidConfig(_)))
    ));

    let result =
        h.service
            .register_loan_market(&admin(), usdc_jun(), ns(), loan_config(START_TS, "usdc-jun"));
    assert!(matches!(
        result,
        Err(ProtocolError::Risk(RiskError::InvalidConfig(_)))
    ));

    let result = h.service.create_profile(&alice(), &ns());
    assert!(matches!(result, Err(ProtocolError::ProfileExists { .. })));

    // a config change drops the cached price
    h.refresh().await;
    h.service
        .change_collateral_config(
            &admin(),
            &sol_market(),
            CollateralMarketConfig::new(sol(), 8000, 9000, 500, 10_000_000_000),
        )
        .unwrap();
    let result = h
        .service
        .deposit_collateral(&alice(), &h.alice, &sol_market(), 10);
    assert!(matches!(
        result,
        Err(ProtocolError::Risk(RiskError::StaleCollateral(_)))
    ));

    let result = h.service.change_collateral_config(
        &admin(),
        &sol_market(),
        CollateralMarketConfig::new(AssetId::new("ETH"), 8000, 9000, 500, 1_000),
    );
    assert!(matches!(
        result,
        Err(ProtocolError::Risk(RiskError::InvalidConfig(_)))
    ));
}

#[tokio::test]
async fn test_cap_cannot_drop_below_outstanding() {
    let mut h = setup();
    h.refresh().await;
    h.deposit(100);
    h.service
        .mint_liquidity_with_collateral(&alice(), &h.alice, &usdc_dec(), 50)
        .unwrap();

    let result = h.service.change_collateral_config(
        &admin(),
        &sol_market(),
        CollateralMarketConfig::new(sol(), 9000, 9500, 500, 99),
    );
    assert!(matches!(
        result,
        Err(ProtocolError::Risk(RiskError::InvalidConfig(_)))
    ));
    h.service
        .change_collateral_config(
            &admin(),
            &sol_market(),
            CollateralMarketConfig::new(sol(), 9000, 9500, 500, 100),
        )
        .unwrap();

    let mut lowered = loan_config(MATURITY, "usdc-dec");
    lowered.liquidity_cap = 49;
    let result = h
        .service
        .change_loan_market_config(&admin(), &usdc_dec(), lowered.clone());
    assert!(matches!(
        result,
        Err(ProtocolError::Risk(RiskError::InvalidConfig(_)))
    ));
    assert_eq!(
        h.service.registry().loan(&usdc_dec()).unwrap().config.liquidity_cap,
        1_000_000_000_000
    );

    lowered.liquidity_cap = 50;
    h.service
        .change_loan_market_config(&admin(), &usdc_dec(), lowered)
        .unwrap();
}

#[tokio::test]
async fn test_ledger_failure_is_atomic() {
    let mut h = setup();
    h.refresh().await;
    let bob_id = h.service.create_profile(&bob(), &ns()).unwrap();

    let result = h
        .service
        .deposit_collateral(&bob(), &bob_id, &sol_market(), 10);
    assert!(matches!(
        result,
        Err(ProtocolError::Ledger(LedgerError::InsufficientFunds { .. }))
    ));
    assert!(h.service.profile(&bob_id).unwrap().is_empty());
    assert_eq!(
        h.service.registry().collateral(&sol_market()).unwrap().total_deposited,
        0
    );
}

#[tokio::test]
async fn test_events_recorded() {
    let mut h = setup();
    h.refresh().await;
    h.deposit(100);

    let events = h.service.events();
    assert!(matches!(
        events.first().map(|r| &r.event),
        Some(ProtocolEvent::NamespaceRegistered { .. })
    ));
    assert!(events
        .iter()
        .any(|r| matches!(r.event, ProtocolEvent::ProfileCreated { .. })));
    assert!(matches!(
        events.last().map(|r| &r.event),
        Some(ProtocolEvent::CollateralDeposited { amount: 100, .. })
    ));
    assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
}

#[test]
fn test_service_rejects_invalid_config_file() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(file, r#"{{ "close_factor_bps": 0 }}"#)?;
    let config = ProtocolConfig::from_file(file.path())?;

    let result = LendingService::new(
        config,
        Arc::new(MockOracle::new()),
        Arc::new(ManualClock::new(0, 0)),
        Box::new(InMemoryLedger::new()),
    );
    assert!(matches!(result, Err(ProtocolError::InvalidConfig(_))));
    Ok(())
}
