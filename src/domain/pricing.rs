//! Effective price recomputation. Pure function, no I/O: given the course
//! snapshot, an already-validated coupon, and the processing instant, produce
//! the authoritative charge. Integer minor units and floor rounding only —
//! re-running with the same inputs must be byte-identical, because the result
//! is compared against the provider-declared amount on every retry.

use {
    super::coupon::{Coupon, Discount},
    super::course::CoursePricing,
    super::error::SettlementError,
    super::money::{Currency, MoneyAmount},
    chrono::{DateTime, Utc},
    serde::Serialize,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub base: MoneyAmount,
    pub discount: MoneyAmount,
    pub net: MoneyAmount,
    pub tax: MoneyAmount,
    pub total: MoneyAmount,
    pub currency: Currency,
}

/// Recompute the charge. The caller must have rejected an unusable coupon
/// before calling — a coupon passed here is applied unconditionally.
pub fn quote(
    course: &CoursePricing,
    coupon: Option<&Coupon>,
    now: DateTime<Utc>,
) -> Result<Quote, SettlementError> {
    // min() guards against a misconfigured sale price above list.
    let base = if course.sale_active(now) {
        course
            .sale_price
            .map_or(course.list_price, |sale| sale.min(course.list_price))
    } else {
        course.list_price
    };

    let discount = match coupon.map(|c| &c.discount) {
        None => MoneyAmount::new(0)?,
        Some(Discount::Percent(pct)) => {
            if !(0..=100).contains(pct) {
                return Err(SettlementError::Validation(format!(
                    "percent discount out of range: {pct}"
                )));
            }
            base.percent_floor(*pct)
                .ok_or_else(|| SettlementError::Validation("discount overflow".into()))?
        }
        // Clamp so the working total never goes negative.
        Some(Discount::Fixed(amount)) => (*amount).min(base),
    };

    let net = base.saturating_sub(discount);

    let tax = match (course.tax_included, course.tax_rate_percent) {
        (false, Some(rate)) => {
            if rate < 0 {
                return Err(SettlementError::Validation(format!(
                    "negative tax rate: {rate}"
                )));
            }
            net.percent_floor(rate)
                .ok_or_else(|| SettlementError::Validation("tax overflow".into()))?
        }
        _ => MoneyAmount::new(0)?,
    };

    let total = net
        .checked_add(tax)
        .ok_or_else(|| SettlementError::Validation("total overflow".into()))?;

    Ok(Quote {
        base,
        discount,
        net,
        tax,
        total,
        currency: course.currency,
    })
}
