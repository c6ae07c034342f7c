//! Yoco checkout creation and webhook settlement
//!
//! POST /api/yoco/webhook must receive the raw body for HMAC verification.

use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::error::{AppError, ErrorCode};
use shared::models::PaymentProvider;
use uuid::Uuid;

use crate::auth::UserIdentity;
use crate::db;
use crate::error::internal;
use crate::payments::{PaymentOutcome, Settlement};
use crate::payments::yoco::{self, CheckoutSession, SignatureHeaders, WebhookEvent};
use crate::services::payment;
use crate::state::AppState;

use super::ApiResult;

const PROVIDER: &str = "yoco";

#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    pub order_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CreateCheckoutResponse {
    pub checkout_id: String,
    pub redirect_url: String,
    /// Amount in cents
    pub amount: i64,
    pub currency: String,
}

/// POST /api/yoco/checkout
pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(req): Json<CreateCheckoutRequest>,
) -> ApiResult<CreateCheckoutResponse> {
    let order = payment::payable_order_for(&state, req.order_id, user.user_id).await?;

    let session = CheckoutSession::for_order(&order, &state.site_url);
    let created = state.yoco.create_checkout(&session).await?;

    db::orders::set_payment_reference(
        &state.pool,
        order.id,
        PaymentProvider::Yoco,
        &created.id,
        shared::util::now_millis(),
    )
    .await
    .map_err(internal)?;

    tracing::info!(
        order_id = %order.id,
        checkout_id = %created.id,
        amount = session.amount,
        "Yoco checkout created"
    );

    Ok(Json(CreateCheckoutResponse {
        checkout_id: created.id,
        redirect_url: created.redirect_url,
        amount: session.amount,
        currency: session.currency,
    }))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Webhook acknowledgement; the gateway only looks at the status code
fn reject(err: AppError) -> Response {
    let body = json!({ "received": false, "code": err.code, "error": err.message });
    (err.http_status(), Json(body)).into_response()
}

fn duplicate_ack() -> Response {
    Json(json!({ "received": true, "duplicate": true })).into_response()
}

/// POST /api/yoco/webhook
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // 1. Signature
    let signature = header(&headers, "webhook-signature")
        .or_else(|| header(&headers, "x-webhook-signature"))
        .unwrap_or("");

    match state.yoco_webhook_secret.as_deref() {
        Some(secret) => {
            let sig_headers = SignatureHeaders {
                signature,
                webhook_id: header(&headers, "webhook-id"),
                timestamp: header(&headers, "webhook-timestamp"),
            };
            let now_secs = chrono::Utc::now().timestamp();
            if let Err(e) = yoco::verify_webhook_signature(&body, sig_headers, secret, now_secs) {
                tracing::warn!(error = e, "Yoco webhook signature verification failed");
                return reject(AppError::invalid_signature());
            }
        }
        None if state.is_development() => {
            tracing::warn!("YOCO_WEBHOOK_SECRET not set, accepting unsigned webhook (development)");
        }
        None => {
            tracing::error!("YOCO_WEBHOOK_SECRET not set, rejecting webhook");
            return reject(AppError::with_message(
                ErrorCode::InvalidSignature,
                "Webhook secret not configured",
            ));
        }
    }

    // 2. Parse
    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse Yoco webhook JSON");
            return reject(AppError::validation("Invalid payload"));
        }
    };
    let order_id = event.payload.metadata.order_id;
    tracing::info!(
        event_id = %event.id,
        event_type = %event.event_type,
        order_id = %order_id,
        "Received Yoco webhook"
    );

    // 3. Idempotency
    let now = shared::util::now_millis();
    match db::webhook_events::record(&state.pool, PROVIDER, &event.id, &event.event_type, now).await
    {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(event_id = %event.id, "Duplicate Yoco webhook event, skipping");
            return duplicate_ack();
        }
        Err(e) => {
            tracing::error!(%e, "DB error recording Yoco webhook event");
            return reject(AppError::new(ErrorCode::DatabaseError));
        }
    }

    // 4. Settle
    let Some(outcome) = event.outcome() else {
        tracing::debug!(event_type = %event.event_type, "Unhandled Yoco webhook event");
        return Json(json!({ "received": true, "processed": false })).into_response();
    };

    match settle(&state, &event, outcome).await {
        Ok(response) => response,
        Err(err) => {
            if err.http_status().is_server_error()
                && let Err(e) = db::webhook_events::forget(&state.pool, PROVIDER, &event.id).await
            {
                tracing::error!(%e, event_id = %event.id, "Failed to release webhook event");
            }
            reject(err)
        }
    }
}

async fn settle(
    state: &AppState,
    event: &WebhookEvent,
    outcome: PaymentOutcome,
) -> Result<Response, AppError> {
    let order_id = event.payload.metadata.order_id;
    let order = match db::orders::find_by_id(&state.pool, order_id).await {
        Ok(Some(o)) => o,
        Ok(None) => {
            tracing::warn!(order_id = %order_id, "Yoco webhook for unknown order");
            return Err(AppError::new(ErrorCode::OrderNotFound));
        }
        Err(e) => {
            tracing::error!(%e, "DB error loading order for Yoco webhook");
            return Err(AppError::new(ErrorCode::DatabaseError));
        }
    };

    let order = match yoco::settlement(outcome, event.payload.amount, order.total_amount) {
        Settlement::Confirm => {
            payment::confirm_payment(
                state,
                order_id,
                PaymentProvider::Yoco,
                Some(event.payment_reference()),
            )
            .await?
            .order
        }
        Settlement::AmountMismatch => {
            tracing::error!(
                order_id = %order_id,
                expected = shared::util::to_cents(order.total_amount),
                received = ?event.payload.amount,
                "Yoco payment amount mismatch"
            );
            payment::record_unsuccessful(
                state,
                order_id,
                PaymentOutcome::Failed,
                PaymentProvider::Yoco,
            )
            .await?;
            return Err(AppError::new(ErrorCode::PaymentAmountMismatch)
                .with_detail("expected", shared::util::to_cents(order.total_amount)));
        }
        Settlement::Unsuccessful(outcome) => {
            payment::record_unsuccessful(state, order_id, outcome, PaymentProvider::Yoco)
                .await?
                .unwrap_or(order)
        }
    };

    Ok(Json(json!({
        "received": true,
        "processed": true,
        "order_id": order.id,
        "status": order.status,
        "payment_status": order.payment_status,
    }))
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn duplicate_events_are_acknowledged() {
        let response = duplicate_ack();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["received"], true);
        assert_eq!(body["duplicate"], true);
    }

    #[tokio::test]
    async fn amount_mismatch_is_a_bad_request() {
        let response = reject(AppError::new(ErrorCode::PaymentAmountMismatch));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["received"], false);
        assert_eq!(body["code"], 5002);
    }

    #[tokio::test]
    async fn bad_signatures_are_unauthorized() {
        let response = reject(AppError::invalid_signature());
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Invalid signature");
    }
}
