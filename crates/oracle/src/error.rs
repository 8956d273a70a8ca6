//! Oracle error types

use termlend_core::AssetId;
use thiserror::Error;

/// Oracle-related errors
#[derive(Debug, Error)]
pub enum OracleError {
    /// No feed configured for the asset
    #[error("No price feed for asset: {asset}")]
    AssetNotFound { asset: AssetId },

    /// Price data is invalid
    #[error("Invalid price for {asset}: {reason}")]
    InvalidPrice { asset: AssetId, reason: String },

    /// A remote feed could not be reached
    #[error("Oracle feed unavailable: {source}")]
    Unavailable {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
