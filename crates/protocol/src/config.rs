//! Protocol configuration
//!
//! Loaded from JSON; missing fields fall back to defaults.

use serde::{Deserialize, Serialize};
use termlend_core::BPS_DENOMINATOR;
use termlend_risk::{LiquidationConfig, PositionLimits};

use crate::error::ProtocolError;

/// Configuration for the lending service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Share of the liquidation gap repaid per ratio-mode liquidation
    #[serde(default = "default_close_factor_bps")]
    pub close_factor_bps: u16,

    #[serde(default = "default_max_entries")]
    pub max_collaterals_per_profile: usize,

    #[serde(default = "default_max_entries")]
    pub max_loans_per_profile: usize,

    /// Smallest liquidation repayment, in loan base units
    #[serde(default = "default_min_repay_amount")]
    pub min_repay_amount: u64,
}

fn default_close_factor_bps() -> u16 {
    5000
}

fn default_max_entries() -> usize {
    10
}

fn default_min_repay_amount() -> u64 {
    1
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            close_factor_bps: default_close_factor_bps(),
            max_collaterals_per_profile: default_max_entries(),
            max_loans_per_profile: default_max_entries(),
            min_repay_amount: default_min_repay_amount(),
        }
    }
}

impl ProtocolConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.close_factor_bps == 0 || self.close_factor_bps as u128 > BPS_DENOMINATOR {
            return Err(ProtocolError::InvalidConfig(format!(
                "close_factor_bps {} must be in 1..={}",
                self.close_factor_bps, BPS_DENOMINATOR
            )));
        }
        if self.max_collaterals_per_profile == 0 || self.max_loans_per_profile == 0 {
            return Err(ProtocolError::InvalidConfig(
                "profile entry limits must be positive".to_string(),
            ));
        }
        if self.min_repay_amount == 0 {
            return Err(ProtocolError::InvalidConfig(
                "min_repay_amount must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn liquidation(&self) -> LiquidationConfig {
        LiquidationConfig {
            close_factor_bps: self.close_factor_bps,
            min_repay_amount: self.min_repay_amount,
        }
    }

    pub fn limits(&self) -> PositionLimits {
        PositionLimits {
            max_collaterals: self.max_collaterals_per_profile,
            max_loans: self.max_loans_per_profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ProtocolConfig::default();
        assert_eq!(config.close_factor_bps, 5000);
        assert_eq!(config.max_collaterals_per_profile, 10);
        assert_eq!(config.max_loans_per_profile, 10);
        assert_eq!(config.min_repay_amount, 1);
        assert!(config.validate().is_ok());
        assert_eq!(config.liquidation(), LiquidationConfig::default());
        assert_eq!(config.limits(), PositionLimits::default());
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{ "close_factor_bps": 2500 }"#;
        let config: ProtocolConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.close_factor_bps, 2500);
        assert_eq!(config.max_loans_per_profile, 10); // default
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_collaterals_per_profile": 3, "min_repay_amount": 100 }}"#).unwrap();

        let config = ProtocolConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_collaterals_per_profile, 3);
        assert_eq!(config.min_repay_amount, 100);
        assert_eq!(config.close_factor_bps, 5000);
    }

    #[test]
    fn test_config_from_bad_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = ProtocolConfig::from_file(file.path()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_invalid_close_factor() {
        let config = ProtocolConfig {
            close_factor_bps: 10_001,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ProtocolError::InvalidConfig(_))));
    }
}
