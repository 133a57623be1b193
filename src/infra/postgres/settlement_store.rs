//! sqlx-backed [`SettlementStore`]. The two unique constraints —
//! `idempotency_records (scope, key_hash)` and `payments (provider,
//! provider_tx_id)` — are the concurrency primitives; there is no
//! application-level locking.

use {
    crate::domain::coupon::{Coupon, Discount},
    crate::domain::course::CoursePricing,
    crate::domain::enrollment::{Enrollment, EnrollmentStatus},
    crate::domain::error::SettlementError,
    crate::domain::id::CouponCode,
    crate::domain::money::{Currency, MoneyAmount},
    crate::domain::payment::NewPayment,
    crate::domain::store::{Reservation, ReserveToken, SettlementStore, key_hash},
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    std::{future::Future, pin::Pin},
    uuid::Uuid,
};

/// An unfinalized reservation older than this is considered abandoned (the
/// original invocation failed or was killed) and may be taken over by a
/// retry. Concurrent duplicates inside the window still see in-flight.
const STALE_RESERVATION_SECS: i64 = 60;

#[derive(Clone)]
pub struct PgSettlementStore {
    pool: PgPool,
}

impl PgSettlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SettlementError>> + Send + 'a>>;

impl SettlementStore for PgSettlementStore {
    fn reserve<'a>(
        &'a self,
        scope: &'a str,
        logical_key: &'a str,
    ) -> StoreFuture<'a, Reservation> {
        Box::pin(async move {
            let hash = key_hash(scope, logical_key);

            let inserted: Option<bool> = sqlx::query_scalar(
                r#"
                INSERT INTO idempotency_records (scope, key_hash)
                VALUES ($1, $2)
                ON CONFLICT (scope, key_hash) DO NOTHING
                RETURNING true
                "#,
            )
            .bind(scope)
            .bind(&hash)
            .fetch_optional(&self.pool)
            .await?;

            if inserted.is_some() {
                return Ok(Reservation::Fresh(ReserveToken {
                    scope: scope.to_string(),
                    key_hash: hash,
                }));
            }

            let existing: Option<(Option<serde_json::Value>,)> =
                sqlx::query_as("SELECT result FROM idempotency_records WHERE scope = $1 AND key_hash = $2")
                    .bind(scope)
                    .bind(&hash)
                    .fetch_optional(&self.pool)
                    .await?;

            match existing {
                Some((Some(result),)) => Ok(Reservation::Cached(result)),
                _ => {
                    // Unfinalized. A retry may take over an abandoned
                    // reservation; the conditional update keeps takeover
                    // race-safe across instances.
                    let taken = sqlx::query(
                        r#"
                        UPDATE idempotency_records
                        SET reserved_at = now()
                        WHERE scope = $1 AND key_hash = $2
                          AND result IS NULL
                          AND reserved_at < now() - make_interval(secs => $3)
                        "#,
                    )
                    .bind(scope)
                    .bind(&hash)
                    .bind(STALE_RESERVATION_SECS as f64)
                    .execute(&self.pool)
                    .await?;

                    if taken.rows_affected() > 0 {
                        Ok(Reservation::Fresh(ReserveToken {
                            scope: scope.to_string(),
                            key_hash: hash,
                        }))
                    } else {
                        Ok(Reservation::InFlight)
                    }
                }
            }
        })
    }

    fn finalize<'a>(
        &'a self,
        token: &'a ReserveToken,
        result: &'a serde_json::Value,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            // First completed execution is authoritative; later calls no-op.
            sqlx::query(
                r#"
                UPDATE idempotency_records
                SET result = $3, finalized_at = now()
                WHERE scope = $1 AND key_hash = $2 AND result IS NULL
                "#,
            )
            .bind(&token.scope)
            .bind(&token.key_hash)
            .bind(result)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    fn load_enrollment(&self, id: Uuid) -> StoreFuture<'_, Option<Enrollment>> {
        Box::pin(async move {
            let row: Option<(Uuid, Uuid, Uuid, String, String)> = sqlx::query_as(
                "SELECT id, user_id, course_id, status, source FROM enrollments WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            row.map(|(id, user_id, course_id, status, source)| {
                Ok::<_, SettlementError>(Enrollment {
                    id,
                    user_id,
                    course_id,
                    status: EnrollmentStatus::try_from(status.as_str())?,
                    source,
                })
            })
            .transpose()
        })
    }

    fn load_course_pricing(&self, course_id: Uuid) -> StoreFuture<'_, Option<CoursePricing>> {
        Box::pin(async move {
            let row: Option<(
                i64,
                Option<i64>,
                Option<DateTime<Utc>>,
                String,
                bool,
                Option<i64>,
            )> = sqlx::query_as(
                r#"
                SELECT list_price_cents, sale_price_cents, sale_ends_at,
                       currency, tax_included, tax_rate_percent
                FROM courses WHERE id = $1
                "#,
            )
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;

            row.map(
                |(list, sale, sale_ends_at, currency, tax_included, tax_rate_percent)| {
                    Ok::<_, SettlementError>(CoursePricing {
                        course_id,
                        list_price: MoneyAmount::new(list)?,
                        sale_price: sale.map(MoneyAmount::new).transpose()?,
                        sale_ends_at,
                        currency: Currency::try_from(currency.as_str())?,
                        tax_included,
                        tax_rate_percent,
                    })
                },
            )
            .transpose()
        })
    }

    fn load_coupon<'a>(&'a self, code: &'a str) -> StoreFuture<'a, Option<Coupon>> {
        Box::pin(async move {
            let row: Option<(
                String,
                String,
                Option<i64>,
                Option<i64>,
                bool,
                Option<DateTime<Utc>>,
                Option<DateTime<Utc>>,
            )> = sqlx::query_as(
                r#"
                SELECT code, discount_type, percent, amount_cents,
                       is_active, starts_at, ends_at
                FROM coupons WHERE code = $1
                "#,
            )
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

            row.map(
                |(code, discount_type, percent, amount_cents, is_active, starts_at, ends_at)| {
                    let discount = match discount_type.as_str() {
                        "percent" => Discount::Percent(percent.ok_or_else(|| {
                            SettlementError::Validation(format!(
                                "percent coupon {code} has no percent value"
                            ))
                        })?),
                        "fixed" => Discount::Fixed(MoneyAmount::new(amount_cents.ok_or_else(
                            || {
                                SettlementError::Validation(format!(
                                    "fixed coupon {code} has no amount"
                                ))
                            },
                        )?)?),
                        other => {
                            return Err(SettlementError::Validation(format!(
                                "unknown discount type: {other}"
                            )));
                        }
                    };
                    Ok::<_, SettlementError>(Coupon {
                        code: CouponCode::new(code)?,
                        discount,
                        is_active,
                        starts_at,
                        ends_at,
                    })
                },
            )
            .transpose()
        })
    }

    fn insert_payment<'a>(&'a self, payment: &'a NewPayment) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let result = sqlx::query(
                r#"
                INSERT INTO payments
                    (id, provider, provider_tx_id, enrollment_id,
                     amount_cents, currency, status, paid_at, raw)
                VALUES ($1, $2, $3, $4, $5, $6, 'succeeded', $7, $8)
                ON CONFLICT (provider, provider_tx_id) DO NOTHING
                "#,
            )
            .bind(payment.id)
            .bind(&payment.provider)
            .bind(payment.provider_tx_id.as_str())
            .bind(payment.enrollment_id)
            .bind(payment.amount.cents())
            .bind(payment.currency.as_str())
            .bind(payment.paid_at)
            .bind(&payment.raw)
            .execute(&self.pool)
            .await?;

            Ok(result.rows_affected() > 0)
        })
    }

    fn mark_enrolled(&self, enrollment_id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query(
                r#"
                UPDATE enrollments
                SET status = 'ENROLLED', updated_at = now()
                WHERE id = $1 AND status = 'PENDING'
                "#,
            )
            .bind(enrollment_id)
            .execute(&self.pool)
            .await?;

            Ok(result.rows_affected() > 0)
        })
    }
}
