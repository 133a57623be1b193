//! The settlement orchestrator: one webhook delivery in, one durable
//! enrollment in. Sequence: idempotency reservation, catalog loads, price
//! recomputation, amount/currency validation, payment insert, conditional
//! enrollment transition, finalize. Signature verification and payload
//! parsing happen at the HTTP edge before this runs.
//!
//! Failure after the reservation leaves the record unfinalized so the
//! provider's retry can re-attempt; every side effect below is individually
//! idempotent (unique payment row, conditional status update), so
//! re-execution is always safe.

use {
    crate::domain::error::SettlementError,
    crate::domain::payment::NewPayment,
    crate::domain::pricing,
    crate::domain::store::{Reservation, SettlementStore},
    crate::domain::webhook::{SettlementReceipt, WebhookRequest},
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

pub const SCOPE_PAYMENT: &str = "payment";

#[derive(Debug)]
pub enum SettlementOutcome {
    /// Fresh settlement completed and finalized.
    Settled(SettlementReceipt),
    /// Duplicate delivery of an already-settled transaction; the cached
    /// first result, replayed verbatim.
    Replayed(serde_json::Value),
    /// Another invocation holds the reservation and has not finished.
    InFlight,
}

pub async fn settle(
    store: &dyn SettlementStore,
    request: &WebhookRequest,
    now: DateTime<Utc>,
) -> Result<SettlementOutcome, SettlementError> {
    let token = match store.reserve(SCOPE_PAYMENT, &request.logical_key()).await? {
        Reservation::Cached(result) => {
            tracing::info!(key = %request.logical_key(), "duplicate delivery, replaying cached result");
            return Ok(SettlementOutcome::Replayed(result));
        }
        Reservation::InFlight => {
            tracing::info!(key = %request.logical_key(), "duplicate delivery, settlement in flight");
            return Ok(SettlementOutcome::InFlight);
        }
        Reservation::Fresh(token) => token,
    };

    let enrollment = store
        .load_enrollment(request.enrollment_id)
        .await?
        .ok_or(SettlementError::EnrollmentNotFound(request.enrollment_id))?;

    let course = store
        .load_course_pricing(enrollment.course_id)
        .await?
        .ok_or(SettlementError::CourseNotFound(enrollment.course_id))?;

    let coupon = match &request.coupon_code {
        Some(code) => {
            let coupon = store
                .load_coupon(code.as_str())
                .await?
                .ok_or_else(|| SettlementError::CouponInvalid(code.as_str().into()))?;
            coupon.check_usable(now)?;
            Some(coupon)
        }
        None => None,
    };

    let quote = pricing::quote(&course, coupon.as_ref(), now)?;

    // The declared figure is the provider's echo of a client-supplied amount.
    // The recomputed quote is authoritative.
    if quote.total != request.declared_amount {
        return Err(SettlementError::AmountMismatch {
            expected: quote.total.cents(),
            declared: request.declared_amount.cents(),
        });
    }
    if course.currency != request.declared_currency {
        return Err(SettlementError::CurrencyMismatch {
            expected: course.currency.as_str().into(),
            declared: request.declared_currency.as_str().into(),
        });
    }

    let payment = NewPayment {
        id: Uuid::now_v7(),
        provider: request.provider.clone(),
        provider_tx_id: request.provider_tx_id.clone(),
        enrollment_id: enrollment.id,
        amount: quote.total,
        currency: quote.currency,
        paid_at: now,
        raw: request.raw.clone(),
    };

    let inserted = store
        .insert_payment(&payment)
        .await
        .map_err(as_payment_insert)?;
    if !inserted {
        // A concurrent attempt already wrote the row; per the uniqueness
        // contract this is success, not an error.
        tracing::info!(tx = %request.provider_tx_id, "payment row already present");
    }

    let transitioned = store
        .mark_enrolled(enrollment.id)
        .await
        .map_err(as_enroll_update)?;
    if !transitioned {
        tracing::info!(enrollment_id = %enrollment.id, "enrollment already transitioned");
    }

    let receipt = SettlementReceipt {
        status: crate::domain::enrollment::EnrollmentStatus::Enrolled,
        enrollment_id: enrollment.id,
    };
    store
        .finalize(&token, &serde_json::to_value(&receipt)?)
        .await?;

    tracing::info!(
        enrollment_id = %enrollment.id,
        total = %quote.total,
        currency = %quote.currency,
        payment_inserted = inserted,
        transitioned,
        "settlement finalized"
    );

    Ok(SettlementOutcome::Settled(receipt))
}

fn as_payment_insert(e: SettlementError) -> SettlementError {
    match e {
        SettlementError::Database(err) => SettlementError::PaymentInsert(err.to_string()),
        other => other,
    }
}

fn as_enroll_update(e: SettlementError) -> SettlementError {
    match e {
        SettlementError::Database(err) => SettlementError::EnrollUpdate(err.to_string()),
        other => other,
    }
}
