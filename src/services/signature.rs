//! Inbound webhook authentication: HMAC-SHA256 over `"{timestamp}.{body}"`,
//! a bounded staleness window, and a best-effort replay cache.
//!
//! The cache is process-local and therefore a hardening layer only — the
//! durable idempotency ledger is the sole cross-instance replay authority.
//! It is injected as a trait so a scaled deployment can point it at a shared
//! store without touching call sites.

use {
    crate::domain::error::SettlementError,
    hmac::{Hmac, Mac},
    sha2::Sha256,
    std::collections::HashMap,
    std::sync::Mutex,
    tokio::sync::watch,
};

type HmacSha256 = Hmac<Sha256>;

/// Accept timestamps at most this many seconds from server time.
pub const REPLAY_WINDOW_SECS: i64 = 300;

/// Seen-signature cache. `check_and_put` must be atomic per key: it records
/// the key and reports whether it was already present.
pub trait ReplayCache: Send + Sync {
    fn check_and_put(&self, key: &str, now_unix: i64) -> bool;
    fn sweep(&self, now_unix: i64);
}

#[derive(Default)]
pub struct InMemoryReplayCache {
    entries: Mutex<HashMap<String, i64>>,
}

impl InMemoryReplayCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReplayCache for InMemoryReplayCache {
    fn check_and_put(&self, key: &str, now_unix: i64) -> bool {
        let mut entries = self.entries.lock().expect("replay cache poisoned");
        // Keep the first-sighting timestamp: a hit must not refresh the entry,
        // or a steady replay stream would outlive the sweep window.
        match entries.entry(key.to_string()) {
            std::collections::hash_map::Entry::Occupied(_) => true,
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(now_unix);
                false
            }
        }
    }

    fn sweep(&self, now_unix: i64) {
        let mut entries = self.entries.lock().expect("replay cache poisoned");
        entries.retain(|_, seen_at| now_unix - *seen_at <= REPLAY_WINDOW_SECS);
    }
}

pub fn hmac_sha256_hex(secret: &[u8], message: &[u8]) -> String {
    // HMAC accepts keys of any length per RFC 2104.
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key size");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify one delivery. Returns `WEBHOOK_INVALID_SIG` for a missing header,
/// unparsable or stale timestamp, or signature mismatch; `SIGNATURE_REPLAY`
/// when an otherwise-valid signature was already seen within the window.
pub fn verify(
    raw_body: &[u8],
    signature_header: Option<&str>,
    timestamp_header: Option<&str>,
    secret: &[u8],
    replay_scope: &str,
    cache: &dyn ReplayCache,
    now_unix: i64,
) -> Result<(), SettlementError> {
    let signature = signature_header
        .ok_or_else(|| SettlementError::InvalidSignature("missing X-Signature header".into()))?;
    let timestamp = timestamp_header
        .ok_or_else(|| SettlementError::InvalidSignature("missing X-Timestamp header".into()))?;

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SettlementError::InvalidSignature(format!("bad timestamp: {timestamp}")))?;

    if (now_unix - ts).abs() > REPLAY_WINDOW_SECS {
        return Err(SettlementError::InvalidSignature(format!(
            "timestamp outside {REPLAY_WINDOW_SECS}s window"
        )));
    }

    let provided = hex::decode(signature)
        .map_err(|_| SettlementError::InvalidSignature("signature is not hex".into()))?;

    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key size");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(raw_body);
    // verify_slice compares in constant time.
    mac.verify_slice(&provided)
        .map_err(|_| SettlementError::InvalidSignature("signature mismatch".into()))?;

    let cache_key = format!("{timestamp}:{signature}:{replay_scope}");
    if cache.check_and_put(&cache_key, now_unix) {
        return Err(SettlementError::SignatureReplay);
    }

    Ok(())
}

/// Periodically evict cache entries older than the window.
pub async fn run_sweeper(cache: std::sync::Arc<dyn ReplayCache>, mut shutdown: watch::Receiver<bool>) {
    tracing::info!("replay cache sweeper started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("replay cache sweeper shutting down");
                return;
            }
            _ = tokio::time::sleep(std::time::Duration::from_secs(60)) => {}
        }

        cache.sweep(chrono::Utc::now().timestamp());
    }
}
