#![allow(dead_code)]

use {
    chrono::{DateTime, TimeDelta, Utc},
    enroll_settle::domain::coupon::{Coupon, Discount},
    enroll_settle::domain::course::CoursePricing,
    enroll_settle::domain::enrollment::{Enrollment, EnrollmentStatus},
    enroll_settle::domain::error::SettlementError,
    enroll_settle::domain::id::{CouponCode, ProviderTxId},
    enroll_settle::domain::money::{Currency, MoneyAmount},
    enroll_settle::domain::payment::NewPayment,
    enroll_settle::domain::store::{Reservation, ReserveToken, SettlementStore, key_hash},
    enroll_settle::domain::webhook::WebhookRequest,
    std::collections::HashMap,
    std::future::Future,
    std::pin::Pin,
    std::sync::Mutex,
    std::sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    uuid::Uuid,
};

const STALE_RESERVATION_SECS: i64 = 60;

struct IdemRecord {
    result: Option<serde_json::Value>,
    reserved_at: DateTime<Utc>,
}

/// In-memory [`SettlementStore`] with the same atomicity contract as the
/// Postgres one: insert-if-absent under a single lock, unique payments,
/// conditional enrollment transition. Lets the orchestrator be exercised
/// without a database.
#[derive(Default)]
pub struct MemStore {
    enrollments: Mutex<HashMap<Uuid, Enrollment>>,
    courses: Mutex<HashMap<Uuid, CoursePricing>>,
    coupons: Mutex<HashMap<String, Coupon>>,
    payments: Mutex<HashMap<(String, String), NewPayment>>,
    idem: Mutex<HashMap<(String, String), IdemRecord>>,
    /// Number of successful PENDING → ENROLLED transitions, ever.
    pub transitions: AtomicUsize,
    /// Number of finalize calls that actually wrote a result.
    pub finalized_writes: AtomicUsize,
    /// When set, reserve fails as if the backing store were unreachable.
    pub reserve_unavailable: AtomicBool,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_enrollment(&self, enrollment: Enrollment) {
        self.enrollments
            .lock()
            .unwrap()
            .insert(enrollment.id, enrollment);
    }

    pub fn add_course(&self, course: CoursePricing) {
        self.courses
            .lock()
            .unwrap()
            .insert(course.course_id, course);
    }

    pub fn add_coupon(&self, coupon: Coupon) {
        self.coupons
            .lock()
            .unwrap()
            .insert(coupon.code.as_str().to_string(), coupon);
    }

    pub fn payment_count(&self) -> usize {
        self.payments.lock().unwrap().len()
    }

    pub fn enrollment_status(&self, id: Uuid) -> Option<EnrollmentStatus> {
        self.enrollments.lock().unwrap().get(&id).map(|e| e.status)
    }

    pub fn cached_result(&self, scope: &str, logical_key: &str) -> Option<serde_json::Value> {
        let hash = key_hash(scope, logical_key);
        self.idem
            .lock()
            .unwrap()
            .get(&(scope.to_string(), hash))
            .and_then(|r| r.result.clone())
    }

    pub fn has_reservation(&self, scope: &str, logical_key: &str) -> bool {
        let hash = key_hash(scope, logical_key);
        self.idem
            .lock()
            .unwrap()
            .contains_key(&(scope.to_string(), hash))
    }

    /// Backdate a reservation, simulating an abandoned in-flight settlement.
    pub fn age_reservation(&self, scope: &str, logical_key: &str, secs: i64) {
        let hash = key_hash(scope, logical_key);
        if let Some(record) = self
            .idem
            .lock()
            .unwrap()
            .get_mut(&(scope.to_string(), hash))
        {
            record.reserved_at -= TimeDelta::seconds(secs);
        }
    }
}

type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SettlementError>> + Send + 'a>>;

fn ready<'a, T: Send + 'a>(value: Result<T, SettlementError>) -> StoreFuture<'a, T> {
    Box::pin(async move { value })
}

impl SettlementStore for MemStore {
    fn reserve<'a>(
        &'a self,
        scope: &'a str,
        logical_key: &'a str,
    ) -> StoreFuture<'a, Reservation> {
        if self.reserve_unavailable.load(Ordering::SeqCst) {
            return ready(Err(SettlementError::Database(sqlx::Error::PoolTimedOut)));
        }

        let now = Utc::now();
        let hash = key_hash(scope, logical_key);
        let token = ReserveToken {
            scope: scope.to_string(),
            key_hash: hash.clone(),
        };

        let mut idem = self.idem.lock().unwrap();
        let outcome = match idem.entry((scope.to_string(), hash)) {
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(IdemRecord {
                    result: None,
                    reserved_at: now,
                });
                Reservation::Fresh(token)
            }
            std::collections::hash_map::Entry::Occupied(mut e) => match &e.get().result {
                Some(result) => Reservation::Cached(result.clone()),
                None => {
                    if now - e.get().reserved_at > TimeDelta::seconds(STALE_RESERVATION_SECS) {
                        e.get_mut().reserved_at = now;
                        Reservation::Fresh(token)
                    } else {
                        Reservation::InFlight
                    }
                }
            },
        };
        drop(idem);

        ready(Ok(outcome))
    }

    fn finalize<'a>(
        &'a self,
        token: &'a ReserveToken,
        result: &'a serde_json::Value,
    ) -> StoreFuture<'a, ()> {
        let mut idem = self.idem.lock().unwrap();
        if let Some(record) = idem.get_mut(&(token.scope.clone(), token.key_hash.clone())) {
            if record.result.is_none() {
                record.result = Some(result.clone());
                self.finalized_writes.fetch_add(1, Ordering::SeqCst);
            }
        }
        drop(idem);
        ready(Ok(()))
    }

    fn load_enrollment(&self, id: Uuid) -> StoreFuture<'_, Option<Enrollment>> {
        ready(Ok(self.enrollments.lock().unwrap().get(&id).cloned()))
    }

    fn load_course_pricing(&self, course_id: Uuid) -> StoreFuture<'_, Option<CoursePricing>> {
        ready(Ok(self.courses.lock().unwrap().get(&course_id).cloned()))
    }

    fn load_coupon<'a>(&'a self, code: &'a str) -> StoreFuture<'a, Option<Coupon>> {
        ready(Ok(self.coupons.lock().unwrap().get(code).cloned()))
    }

    fn insert_payment<'a>(&'a self, payment: &'a NewPayment) -> StoreFuture<'a, bool> {
        let key = (
            payment.provider.clone(),
            payment.provider_tx_id.as_str().to_string(),
        );
        let mut payments = self.payments.lock().unwrap();
        let inserted = match payments.entry(key) {
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(payment.clone());
                true
            }
            std::collections::hash_map::Entry::Occupied(_) => false,
        };
        drop(payments);
        ready(Ok(inserted))
    }

    fn mark_enrolled(&self, enrollment_id: Uuid) -> StoreFuture<'_, bool> {
        let mut enrollments = self.enrollments.lock().unwrap();
        let transitioned = match enrollments.get_mut(&enrollment_id) {
            Some(e) if e.status == EnrollmentStatus::Pending => {
                e.status = EnrollmentStatus::Enrolled;
                self.transitions.fetch_add(1, Ordering::SeqCst);
                true
            }
            _ => false,
        };
        drop(enrollments);
        ready(Ok(transitioned))
    }
}

// ── Fixtures ───────────────────────────────────────────────────────────────

pub fn cents(v: i64) -> MoneyAmount {
    MoneyAmount::new(v).unwrap()
}

pub fn make_course(list: i64, sale: Option<i64>, sale_ends_secs: Option<i64>) -> CoursePricing {
    CoursePricing {
        course_id: Uuid::now_v7(),
        list_price: cents(list),
        sale_price: sale.map(cents),
        sale_ends_at: sale_ends_secs.map(|s| Utc::now() + TimeDelta::seconds(s)),
        currency: Currency::Krw,
        tax_included: true,
        tax_rate_percent: None,
    }
}

pub fn make_enrollment(course_id: Uuid, status: EnrollmentStatus) -> Enrollment {
    Enrollment {
        id: Uuid::now_v7(),
        user_id: Uuid::now_v7(),
        course_id,
        status,
        source: "web".to_string(),
    }
}

pub fn make_percent_coupon(code: &str, pct: i64, ends_secs: Option<i64>) -> Coupon {
    Coupon {
        code: CouponCode::new(code).unwrap(),
        discount: Discount::Percent(pct),
        is_active: true,
        starts_at: None,
        ends_at: ends_secs.map(|s| Utc::now() + TimeDelta::seconds(s)),
    }
}

pub fn make_request(
    tx_id: &str,
    enrollment_id: Uuid,
    amount: i64,
    coupon: Option<&str>,
) -> WebhookRequest {
    WebhookRequest {
        provider: "toss".to_string(),
        provider_tx_id: ProviderTxId::new(tx_id).unwrap(),
        enrollment_id,
        declared_amount: cents(amount),
        declared_currency: Currency::Krw,
        coupon_code: coupon.map(|c| CouponCode::new(c).unwrap()),
        raw: serde_json::json!({"provider": "toss", "provider_tx_id": tx_id}),
    }
}

/// Seed a PENDING enrollment plus its course; returns the enrollment id.
pub fn seed_pending(store: &MemStore, course: CoursePricing) -> Uuid {
    let enrollment = make_enrollment(course.course_id, EnrollmentStatus::Pending);
    let id = enrollment.id;
    store.add_course(course);
    store.add_enrollment(enrollment);
    id
}
