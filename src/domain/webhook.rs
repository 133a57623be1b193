use {
    super::error::SettlementError,
    super::id::{CouponCode, ProviderTxId},
    super::money::{Currency, MoneyAmount},
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

/// Raw JSON shape of one payment notification. Kept separate from
/// [`WebhookRequest`] so structural violations surface as `PAYLOAD_INVALID`
/// instead of leaking serde internals downstream.
#[derive(Debug, Deserialize)]
struct RawWebhookBody {
    provider: String,
    provider_tx_id: String,
    enrollment_id: Uuid,
    #[serde(default)]
    #[allow(dead_code)]
    course_id: Option<Uuid>,
    #[serde(default)]
    #[allow(dead_code)]
    user_id: Option<Uuid>,
    amount_cents: i64,
    currency_code: String,
    #[serde(default)]
    coupon_code: Option<String>,
}

/// Validated webhook request, one per delivery.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    pub provider: String,
    pub provider_tx_id: ProviderTxId,
    pub enrollment_id: Uuid,
    pub declared_amount: MoneyAmount,
    pub declared_currency: Currency,
    pub coupon_code: Option<CouponCode>,
    /// Payload as delivered, persisted on the payment row.
    pub raw: serde_json::Value,
}

impl WebhookRequest {
    pub fn parse(body: &[u8]) -> Result<Self, SettlementError> {
        let raw: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| SettlementError::InvalidPayload(format!("malformed JSON: {e}")))?;
        let parsed: RawWebhookBody = serde_json::from_value(raw.clone())
            .map_err(|e| SettlementError::InvalidPayload(e.to_string()))?;

        if parsed.provider.is_empty() {
            return Err(SettlementError::InvalidPayload("provider is empty".into()));
        }

        let invalid = |e: SettlementError| SettlementError::InvalidPayload(e.to_string());

        Ok(Self {
            provider: parsed.provider,
            provider_tx_id: ProviderTxId::new(parsed.provider_tx_id).map_err(invalid)?,
            enrollment_id: parsed.enrollment_id,
            declared_amount: MoneyAmount::new(parsed.amount_cents).map_err(invalid)?,
            declared_currency: Currency::try_from(parsed.currency_code.as_str())
                .map_err(invalid)?,
            coupon_code: parsed
                .coupon_code
                .map(CouponCode::new)
                .transpose()
                .map_err(invalid)?,
            raw,
        })
    }

    /// Logical idempotency key: `provider + "_" + provider_tx_id`.
    pub fn logical_key(&self) -> String {
        format!("{}_{}", self.provider, self.provider_tx_id.as_str())
    }
}

/// What a completed settlement looks like, both as the live response and as
/// the cached idempotency result replayed on duplicate delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub status: super::enrollment::EnrollmentStatus,
    pub enrollment_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_body() -> serde_json::Value {
        serde_json::json!({
            "provider": "toss",
            "provider_tx_id": "tx_20260827_0001",
            "enrollment_id": "0192e6a0-0000-7000-8000-000000000001",
            "amount_cents": 29000,
            "currency_code": "KRW",
        })
    }

    #[test]
    fn parses_minimal_valid_body() {
        let req = WebhookRequest::parse(valid_body().to_string().as_bytes()).unwrap();
        assert_eq!(req.provider, "toss");
        assert_eq!(req.declared_amount.cents(), 29000);
        assert!(req.coupon_code.is_none());
        assert_eq!(req.logical_key(), "toss_tx_20260827_0001");
    }

    #[test]
    fn malformed_json_is_payload_invalid() {
        let err = WebhookRequest::parse(b"{not json").unwrap_err();
        assert_eq!(err.code(), "PAYLOAD_INVALID");
    }

    #[test]
    fn missing_field_is_payload_invalid() {
        let mut body = valid_body();
        body.as_object_mut().unwrap().remove("amount_cents");
        let err = WebhookRequest::parse(body.to_string().as_bytes()).unwrap_err();
        assert_eq!(err.code(), "PAYLOAD_INVALID");
    }

    #[test]
    fn negative_amount_is_payload_invalid() {
        let mut body = valid_body();
        body["amount_cents"] = serde_json::json!(-100);
        let err = WebhookRequest::parse(body.to_string().as_bytes()).unwrap_err();
        assert_eq!(err.code(), "PAYLOAD_INVALID");
    }

    #[test]
    fn unknown_currency_is_payload_invalid() {
        let mut body = valid_body();
        body["currency_code"] = serde_json::json!("XXX");
        let err = WebhookRequest::parse(body.to_string().as_bytes()).unwrap_err();
        assert_eq!(err.code(), "PAYLOAD_INVALID");
    }

    #[test]
    fn empty_tx_id_is_payload_invalid() {
        let mut body = valid_body();
        body["provider_tx_id"] = serde_json::json!("");
        let err = WebhookRequest::parse(body.to_string().as_bytes()).unwrap_err();
        assert_eq!(err.code(), "PAYLOAD_INVALID");
    }
}
