//! Protocol errors

use termlend_core::{MarketId, NamespaceId, OwnerId, ProfileId};
use termlend_ledger::LedgerError;
use termlend_oracle::OracleError;
use termlend_risk::RiskError;
use thiserror::Error;

/// Errors returned by protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error(transparent)]
    Risk(#[from] RiskError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(ProfileId),

    #[error("Profile already exists for {owner} in {namespace}")]
    ProfileExists {
        owner: OwnerId,
        namespace: NamespaceId,
    },

    #[error("Market not found: {0}")]
    MarketNotFound(MarketId),

    #[error("Market already registered: {0}")]
    MarketExists(MarketId),

    #[error("Namespace not found: {0}")]
    NamespaceNotFound(NamespaceId),

    #[error("Namespace already registered: {0}")]
    NamespaceExists(NamespaceId),

    #[error("Invalid protocol config: {0}")]
    InvalidConfig(String),
}

impl ProtocolError {
    /// The underlying risk error, if this is one
    pub fn as_risk(&self) -> Option<&RiskError> {
        match self {
            ProtocolError::Risk(err) => Some(err),
            _ => None,
        }
    }
}
