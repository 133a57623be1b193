use {
    super::error::SettlementError,
    super::id::CouponCode,
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
};

#[derive(Debug, Clone)]
pub enum Discount {
    /// Whole-number percent off the base price, floor-rounded.
    Percent(i64),
    /// Fixed amount off, clamped so the total never goes negative.
    Fixed(MoneyAmount),
}

/// Read-only coupon snapshot. Validity is checked by the orchestrator *before*
/// the price is computed, so an expired coupon surfaces as an explicit error
/// rather than a silently undiscounted charge.
#[derive(Debug, Clone)]
pub struct Coupon {
    pub code: CouponCode,
    pub discount: Discount,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl Coupon {
    /// Usable iff active and `now` lies within `[starts_at, ends_at]`.
    /// A missing bound is unbounded on that side.
    pub fn check_usable(&self, now: DateTime<Utc>) -> Result<(), SettlementError> {
        if !self.is_active {
            return Err(SettlementError::CouponInactive(self.code.as_str().into()));
        }
        if self.starts_at.is_some_and(|starts_at| now < starts_at) {
            return Err(SettlementError::CouponNotStarted(self.code.as_str().into()));
        }
        if self.ends_at.is_some_and(|ends_at| now > ends_at) {
            return Err(SettlementError::CouponExpired(self.code.as_str().into()));
        }
        Ok(())
    }
}
