//! Protocol events
//!
//! One event is recorded for every committed transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;
use termlend_core::{MarketId, NamespaceId, OwnerId, ProfileId, Wad};
use termlend_risk::LiquidationMode;

/// Events emitted by the lending service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ProtocolEvent {
    NamespaceRegistered {
        namespace: NamespaceId,
        owner: OwnerId,
    },
    CollateralMarketRegistered {
        market: MarketId,
        namespace: NamespaceId,
    },
    LoanMarketRegistered {
        market: MarketId,
        namespace: NamespaceId,
    },
    MarketConfigChanged {
        market: MarketId,
    },
    ProfileCreated {
        profile: ProfileId,
        owner: OwnerId,
        namespace: NamespaceId,
    },
    CollateralMarketRefreshed {
        market: MarketId,
        price_wad: Wad,
    },
    LoanMarketRefreshed {
        market: MarketId,
        price_wad: Wad,
    },
    ProfileRefreshed {
        profile: ProfileId,
    },
    CollateralDeposited {
        profile: ProfileId,
        market: MarketId,
        amount: u64,
    },
    CollateralWithdrawn {
        profile: ProfileId,
        market: MarketId,
        amount: u64,
    },
    LiquidityMinted {
        profile: ProfileId,
        market: MarketId,
        amount: u64,
        fee: u64,
    },
    LiquidityRepaid {
        profile: ProfileId,
        market: MarketId,
        amount: u64,
    },
    Liquidated {
        profile: ProfileId,
        liquidator: OwnerId,
        collateral_market: MarketId,
        loan_market: MarketId,
        mode: LiquidationMode,
        repay_amount: u64,
        seize_amount: u64,
    },
    LenderDeposited {
        lender: OwnerId,
        market: MarketId,
        amount: u64,
        fee: u64,
    },
    PrincipalRedeemed {
        holder: OwnerId,
        market: MarketId,
        amount: u64,
    },
    YieldRedeemed {
        holder: OwnerId,
        market: MarketId,
        amount: u64,
        payout: u64,
    },
}

/// A recorded event with its position in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub slot: u64,
    pub timestamp: DateTime<Utc>,
    pub event: ProtocolEvent,
}

impl EventRecord {
    pub fn new(sequence: u64, slot: u64, event: ProtocolEvent) -> Self {
        Self {
            sequence,
            slot,
            timestamp: Utc::now(),
            event,
        }
    }

    pub fn name(&self) -> &str {
        self.event.as_ref()
    }
}
