//! Termlend Protocol - fixed-term lending operations
//!
//! `LendingService` is the single entry point: it owns the market registry,
//! borrower profiles and the token ledger, and applies every operation as one
//! all-or-nothing step. Market refreshes are async because they await the
//! oracle; every other operation is synchronous.

pub mod admin;
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod lending;
pub mod registry;
pub mod service;

pub use auth::AuthorizationContext;
pub use config::ProtocolConfig;
pub use error::ProtocolError;
pub use events::{EventRecord, ProtocolEvent};
pub use lending::LendReceipt;
pub use registry::MarketRegistry;
pub use service::{BorrowReceipt, LendingService, LiquidationReport, RepayReceipt};
