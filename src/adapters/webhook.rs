use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::webhook::WebhookRequest,
        services::{
            settlement::{self, SettlementOutcome},
            signature,
        },
    },
    axum::{
        Json,
        body::Bytes,
        extract::State,
        http::{HeaderMap, StatusCode},
    },
    uuid::Uuid,
};

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[tracing::instrument(
    name = "payment_webhook",
    skip_all,
    fields(request_id = tracing::field::Empty, tx = tracing::field::Empty)
)]
pub async fn payment_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let request_id = Uuid::now_v7();
    let started = std::time::Instant::now();
    tracing::Span::current().record("request_id", tracing::field::display(request_id));

    // Nothing is trusted before this returns: no parse, no store reads.
    signature::verify(
        &body,
        header_str(&headers, "X-Signature"),
        header_str(&headers, "X-Timestamp"),
        state.webhook_secret.as_bytes(),
        settlement::SCOPE_PAYMENT,
        state.replay_cache.as_ref(),
        chrono::Utc::now().timestamp(),
    )?;

    let request = WebhookRequest::parse(&body)?;
    tracing::Span::current().record("tx", tracing::field::display(&request.logical_key()));

    match settlement::settle(state.store.as_ref(), &request, chrono::Utc::now()).await? {
        SettlementOutcome::Settled(receipt) => Ok((
            StatusCode::OK,
            Json(serde_json::json!({
                "status": receipt.status,
                "enrollment_id": receipt.enrollment_id,
                "request_id": request_id,
                "latency_ms": started.elapsed().as_millis() as u64,
            })),
        )),
        SettlementOutcome::Replayed(result) => Ok((
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "duplicate",
                "cached": true,
                "result": result,
            })),
        )),
        SettlementOutcome::InFlight => Ok((
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "code": "DUP_TX",
                "message": "settlement for this transaction is in flight",
            })),
        )),
    }
}
