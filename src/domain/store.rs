use {
    super::coupon::Coupon,
    super::course::CoursePricing,
    super::enrollment::Enrollment,
    super::error::SettlementError,
    super::payment::NewPayment,
    sha2::{Digest, Sha256},
    std::{future::Future, pin::Pin},
    uuid::Uuid,
};

/// Handle to a reservation this caller owns; required by `finalize`.
#[derive(Debug, Clone)]
pub struct ReserveToken {
    pub scope: String,
    pub key_hash: String,
}

/// Outcome of an idempotency reservation attempt.
#[derive(Debug)]
pub enum Reservation {
    /// First observer — caller must run the settlement and finalize.
    Fresh(ReserveToken),
    /// Already settled; replay this result verbatim.
    Cached(serde_json::Value),
    /// Reserved elsewhere with no result yet — do not re-execute side effects.
    InFlight,
}

/// Stable hash of `scope + ":" + logical_key`, the durable dedup key.
pub fn key_hash(scope: &str, logical_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(scope.as_bytes());
    hasher.update(b":");
    hasher.update(logical_key.as_bytes());
    hex::encode(hasher.finalize())
}

type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SettlementError>> + Send + 'a>>;

/// The persistence seam for one settlement: the durable idempotency ledger
/// plus the catalog/enrollment/payment rows it reads and mutates. Both
/// uniqueness guarantees (idempotency `(scope, key_hash)` and payment
/// `(provider, provider_tx_id)`) must be atomic constraints in the backing
/// store — multiple stateless instances race on them.
pub trait SettlementStore: Send + Sync {
    /// Atomic insert-if-absent on `(scope, hash(logical_key))`. Must fail
    /// closed when the backing store is unreachable.
    fn reserve<'a>(&'a self, scope: &'a str, logical_key: &'a str)
    -> StoreFuture<'a, Reservation>;

    /// Write the result iff none was written yet; second call is a no-op.
    fn finalize<'a>(
        &'a self,
        token: &'a ReserveToken,
        result: &'a serde_json::Value,
    ) -> StoreFuture<'a, ()>;

    fn load_enrollment(&self, id: Uuid) -> StoreFuture<'_, Option<Enrollment>>;

    fn load_course_pricing(&self, course_id: Uuid) -> StoreFuture<'_, Option<CoursePricing>>;

    fn load_coupon<'a>(&'a self, code: &'a str) -> StoreFuture<'a, Option<Coupon>>;

    /// Returns false when the `(provider, provider_tx_id)` row already exists
    /// — a duplicate insert is a success no-op.
    fn insert_payment<'a>(&'a self, payment: &'a NewPayment) -> StoreFuture<'a, bool>;

    /// Conditional PENDING → ENROLLED transition. Returns false when another
    /// caller already transitioned the row; that is not an error.
    fn mark_enrolled(&self, enrollment_id: Uuid) -> StoreFuture<'_, bool>;
}
