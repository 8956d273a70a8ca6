//! Caller authorization
//!
//! Every mutating operation receives an `AuthorizationContext` describing who
//! is calling and whether they signed.

use serde::{Deserialize, Serialize};
use termlend_core::OwnerId;

use crate::error::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationContext {
    pub owner_id: OwnerId,
    pub can_sign: bool,
}

impl AuthorizationContext {
    /// A caller that signed the request
    pub fn signer(owner_id: impl Into<OwnerId>) -> Self {
        Self {
            owner_id: owner_id.into(),
            can_sign: true,
        }
    }

    /// A caller identified but not signing
    pub fn unsigned(owner_id: impl Into<OwnerId>) -> Self {
        Self {
            owner_id: owner_id.into(),
            can_sign: false,
        }
    }

    pub fn require_signer(&self) -> Result<(), ProtocolError> {
        if self.can_sign {
            Ok(())
        } else {
            Err(ProtocolError::Unauthorized(format!(
                "{} did not sign",
                self.owner_id
            )))
        }
    }

    /// Signed by exactly `owner`
    pub fn require_owner(&self, owner: &OwnerId) -> Result<(), ProtocolError> {
        self.require_signer()?;
        if &self.owner_id != owner {
            return Err(ProtocolError::Unauthorized(format!(
                "{} is not {}",
                self.owner_id, owner
            )));
        }
        Ok(())
    }
}
