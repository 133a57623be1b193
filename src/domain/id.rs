use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::error::SettlementError;

/// The provider's transaction identifier. Together with the provider name it
/// forms the natural external deduplication key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderTxId(String);

impl ProviderTxId {
    pub fn new(id: impl Into<String>) -> Result<Self, SettlementError> {
        let id = id.into();
        if id.is_empty() || id.len() > 128 {
            return Err(SettlementError::Validation(format!(
                "ProviderTxId must be 1..=128 chars, got {} chars",
                id.len()
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Customer-facing coupon code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponCode(String);

impl CouponCode {
    pub fn new(code: impl Into<String>) -> Result<Self, SettlementError> {
        let code = code.into();
        if code.is_empty() || code.len() > 64 {
            return Err(SettlementError::Validation(format!(
                "CouponCode must be 1..=64 chars, got {} chars",
                code.len()
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
