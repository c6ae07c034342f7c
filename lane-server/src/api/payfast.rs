//! PayFast payment form and ITN (instant transaction notification) handling

use axum::{
    Extension, Form, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use shared::models::PaymentProvider;
use std::net::IpAddr;
use uuid::Uuid;

use crate::auth::UserIdentity;
use crate::db;
use crate::error::internal;
use crate::payments::{PaymentOutcome, Settlement};
use crate::payments::payfast::{self, PaymentForm};
use crate::services::payment;
use crate::state::AppState;

use super::ApiResult;

const PROVIDER: &str = "payfast";

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
}

/// POST /api/payfast/create-payment
///
/// Returns the signed form; the browser posts it to PayFast.
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(req): Json<CreatePaymentRequest>,
) -> ApiResult<PaymentForm> {
    let order = payment::payable_order_for(&state, req.order_id, user.user_id).await?;

    let now = shared::util::now_millis();
    let form = state.payfast.build_payment_form(&order, &state.site_url, now)?;
    let m_payment_id = form
        .payment_data
        .get("m_payment_id")
        .cloned()
        .unwrap_or_else(|| payfast::merchant_payment_id(&order.order_number, now));

    db::orders::set_payment_reference(
        &state.pool,
        order.id,
        PaymentProvider::Payfast,
        &m_payment_id,
        now,
    )
    .await
    .map_err(internal)?;

    tracing::info!(
        order_id = %order.id,
        m_payment_id = %m_payment_id,
        sandbox = state.payfast.sandbox,
        "PayFast payment form created"
    );
    Ok(Json(form))
}

fn field<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

/// First forwarded address, else `x-real-ip`
fn source_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next());
    let real_ip = headers.get("x-real-ip").and_then(|v| v.to_str().ok());
    forwarded
        .or(real_ip)
        .and_then(|ip| ip.trim().parse().ok())
}

/// POST /api/payfast/notify
///
/// PayFast retries anything other than 200, so only malformed or forged
/// notifications are refused.
pub async fn handle_notify(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(fields): Form<Vec<(String, String)>>,
) -> (StatusCode, &'static str) {
    match source_ip(&headers) {
        Some(ip) if payfast::is_payfast_ip(ip) => {}
        Some(ip) => tracing::warn!(%ip, "PayFast ITN from unexpected source address"),
        None => tracing::warn!("PayFast ITN without a source address"),
    }

    // 1. Signature
    if !state.payfast.verify_itn(&fields) {
        tracing::warn!("PayFast ITN signature verification failed");
        return (StatusCode::BAD_REQUEST, "Invalid signature");
    }

    // 2. Merchant
    if field(&fields, "merchant_id") != Some(state.payfast.merchant_id.as_str()) {
        tracing::warn!(
            merchant_id = ?field(&fields, "merchant_id"),
            "PayFast ITN for a different merchant"
        );
        return (StatusCode::BAD_REQUEST, "Invalid merchant");
    }

    // 3. Order
    let Some(order_id) = field(&fields, "custom_str1").and_then(|v| v.parse::<Uuid>().ok()) else {
        tracing::warn!("PayFast ITN missing order id");
        return (StatusCode::BAD_REQUEST, "Missing order id");
    };
    let order = match db::orders::find_by_id(&state.pool, order_id).await {
        Ok(Some(o)) => o,
        Ok(None) => {
            tracing::warn!(order_id = %order_id, "PayFast ITN for unknown order");
            return (StatusCode::NOT_FOUND, "Order not found");
        }
        Err(e) => {
            tracing::error!(%e, "DB error loading order for PayFast ITN");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error");
        }
    };

    // 4. Idempotency
    let pf_payment_id = field(&fields, "pf_payment_id").unwrap_or_default();
    let payment_status = field(&fields, "payment_status").unwrap_or_default();
    if !pf_payment_id.is_empty() {
        let now = shared::util::now_millis();
        match db::webhook_events::record(&state.pool, PROVIDER, pf_payment_id, payment_status, now)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(pf_payment_id, "Duplicate PayFast ITN, skipping");
                return (StatusCode::OK, "OK");
            }
            Err(e) => {
                tracing::error!(%e, "DB error recording PayFast ITN");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error");
            }
        }
    }

    tracing::info!(
        order_id = %order_id,
        pf_payment_id,
        payment_status,
        "Received PayFast ITN"
    );

    // 5. Settle
    let amount_gross = field(&fields, "amount_gross");
    let result = match payfast::settlement(payment_status, amount_gross, order.total_amount) {
        Settlement::Confirm => {
            let reference = Some(pf_payment_id).filter(|r| !r.is_empty());
            payment::confirm_payment(&state, order_id, PaymentProvider::Payfast, reference)
                .await
                .map(|_| ())
        }
        settlement => {
            if settlement == Settlement::AmountMismatch {
                tracing::error!(
                    order_id = %order_id,
                    expected = %order.total_amount,
                    received = ?amount_gross,
                    "PayFast payment amount mismatch"
                );
            }
            let outcome = settlement.failure_outcome().unwrap_or(PaymentOutcome::Failed);
            payment::record_unsuccessful(&state, order_id, outcome, PaymentProvider::Payfast)
                .await
                .map(|_| ())
        }
    };

    if let Err(e) = result {
        let err: shared::error::AppError = e.into();
        if !pf_payment_id.is_empty()
            && let Err(e) = db::webhook_events::forget(&state.pool, PROVIDER, pf_payment_id).await
        {
            tracing::error!(%e, pf_payment_id, "Failed to release PayFast ITN");
        }
        tracing::error!(code = ?err.code, order_id = %order_id, "PayFast ITN processing failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Processing failed");
    }
    (StatusCode::OK, "OK")
}
