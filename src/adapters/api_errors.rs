use crate::domain::error::SettlementError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Newtype so the domain error can carry an axum response mapping without the
/// domain layer knowing about HTTP.
pub struct ApiError(pub SettlementError);

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let (status, message) = match &self.0 {
            SettlementError::InvalidSignature(_) | SettlementError::SignatureReplay => {
                (StatusCode::UNAUTHORIZED, self.0.to_string())
            }
            SettlementError::InvalidPayload(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            SettlementError::EnrollmentNotFound(_) | SettlementError::CourseNotFound(_) => {
                (StatusCode::NOT_FOUND, self.0.to_string())
            }
            SettlementError::CouponInvalid(_)
            | SettlementError::CouponInactive(_)
            | SettlementError::CouponNotStarted(_)
            | SettlementError::CouponExpired(_)
            | SettlementError::AmountMismatch { .. }
            | SettlementError::CurrencyMismatch { .. }
            | SettlementError::Validation(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string())
            }
            SettlementError::PaymentInsert(err) | SettlementError::EnrollUpdate(err) => {
                tracing::error!("storage error during settlement: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage error".to_string(),
                )
            }
            SettlementError::Database(err) => {
                tracing::error!("database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
            SettlementError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "code": code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
