use {
    super::money::{Currency, MoneyAmount},
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

/// Read-only pricing snapshot for one course, loaded at settlement time.
/// The declared amount on the wire is never trusted — this is the authority.
#[derive(Debug, Clone)]
pub struct CoursePricing {
    pub course_id: Uuid,
    pub list_price: MoneyAmount,
    pub sale_price: Option<MoneyAmount>,
    pub sale_ends_at: Option<DateTime<Utc>>,
    pub currency: Currency,
    pub tax_included: bool,
    pub tax_rate_percent: Option<i64>,
}

impl CoursePricing {
    /// A sale is honored only while it has a price, an explicit end, and that
    /// end is still in the future at the processing instant.
    pub fn sale_active(&self, now: DateTime<Utc>) -> bool {
        match (self.sale_price, self.sale_ends_at) {
            (Some(_), Some(ends_at)) => ends_at > now,
            _ => false,
        }
    }
}
