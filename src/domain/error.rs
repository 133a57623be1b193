use thiserror::Error;

/// Everything that can stop a settlement. Each variant maps to a stable wire
/// code so the payment provider's retry machinery can branch on it.
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("webhook signature: {0}")]
    InvalidSignature(String),

    #[error("signature replay within window")]
    SignatureReplay,

    #[error("payload: {0}")]
    InvalidPayload(String),

    #[error("enrollment not found: {0}")]
    EnrollmentNotFound(uuid::Uuid),

    #[error("course not found: {0}")]
    CourseNotFound(uuid::Uuid),

    #[error("unknown coupon: {0}")]
    CouponInvalid(String),

    #[error("coupon is not active: {0}")]
    CouponInactive(String),

    #[error("coupon not yet valid: {0}")]
    CouponNotStarted(String),

    #[error("coupon expired: {0}")]
    CouponExpired(String),

    #[error("amount mismatch: recomputed {expected} cents, declared {declared} cents")]
    AmountMismatch { expected: i64, declared: i64 },

    #[error("currency mismatch: course is {expected}, declared {declared}")]
    CurrencyMismatch { expected: String, declared: String },

    #[error("payment insert: {0}")]
    PaymentInsert(String),

    #[error("enrollment update: {0}")]
    EnrollUpdate(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SettlementError {
    /// Stable error code surfaced on the wire as `{code, message}`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSignature(_) => "WEBHOOK_INVALID_SIG",
            Self::SignatureReplay => "SIGNATURE_REPLAY",
            Self::InvalidPayload(_) => "PAYLOAD_INVALID",
            Self::EnrollmentNotFound(_) => "ENROLL_NOT_FOUND",
            Self::CourseNotFound(_) => "COURSE_NOT_FOUND",
            Self::CouponInvalid(_) => "COUPON_INVALID",
            Self::CouponInactive(_) => "COUPON_INACTIVE",
            Self::CouponNotStarted(_) => "COUPON_NOT_STARTED",
            Self::CouponExpired(_) => "COUPON_EXPIRED",
            Self::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::PaymentInsert(_) => "PAYMENT_INSERT",
            Self::EnrollUpdate(_) => "ENROLL_UPDATE",
            Self::Validation(_) => "VALIDATION",
            Self::Database(_) | Self::Serialization(_) => "INTERNAL",
        }
    }
}
