use {
    super::money::{Currency, MoneyAmount},
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

use super::id::ProviderTxId;

/// Input for the payment INSERT. One row exists per `(provider,
/// provider_tx_id)`; the storage layer's unique constraint enforces it and a
/// conflicting insert is a success no-op, not an error.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id: Uuid,
    pub provider: String,
    pub provider_tx_id: ProviderTxId,
    pub enrollment_id: Uuid,
    pub amount: MoneyAmount,
    pub currency: Currency,
    pub paid_at: DateTime<Utc>,
    /// Original webhook payload, kept verbatim for reconciliation.
    pub raw: serde_json::Value,
}
