//! Yoco hosted checkout via REST API
//!
//! Checkouts are created server-side with the secret key; settlement arrives
//! as a signed webhook. Two signature schemes are accepted:
//!
//! - `<hex>` / `sha256=<hex>`: HMAC-SHA256 of the raw body
//! - `v1,<base64> [v1,<base64> ...]`: HMAC-SHA256 of `{id}.{timestamp}.{body}`
//!   keyed with the base64 part of a `whsec_` secret

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use shared::models::Order;
use uuid::Uuid;

use super::{GatewayError, PaymentOutcome, Settlement};

type HmacSha256 = Hmac<Sha256>;

pub const CURRENCY: &str = "ZAR";

/// Maximum age of a timestamped (`v1,`) signature
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Yoco checkout API client
#[derive(Clone)]
pub struct YocoClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl YocoClient {
    pub fn new(api_base: &str, secret_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    /// POST {api_base}/checkouts
    pub async fn create_checkout(
        &self,
        session: &CheckoutSession,
    ) -> Result<CheckoutCreated, GatewayError> {
        let resp = self
            .http
            .post(format!("{}/checkouts", self.api_base))
            .bearer_auth(&self.secret_key)
            .json(session)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let created: CheckoutCreated = resp
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;
        if created.id.is_empty() || created.redirect_url.is_empty() {
            return Err(GatewayError::Malformed(
                "checkout response missing id or redirectUrl".into(),
            ));
        }
        Ok(created)
    }
}

/// Body of `POST /checkouts`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    /// Amount in cents
    pub amount: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub failure_url: String,
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMetadata {
    pub order_id: Uuid,
    pub order_number: String,
    pub user_id: Option<Uuid>,
}

impl CheckoutSession {
    /// Checkout for the full order total, returning to pages under `site_url`
    pub fn for_order(order: &Order, site_url: &str) -> Self {
        let id = order.id;
        Self {
            amount: shared::util::to_cents(order.total_amount),
            currency: CURRENCY.to_string(),
            success_url: format!("{site_url}/account?payment=success&orderId={id}"),
            cancel_url: format!("{site_url}/cart/payment/cancelled?orderId={id}"),
            failure_url: format!("{site_url}/cart/payment/failed?orderId={id}"),
            metadata: CheckoutMetadata {
                order_id: id,
                order_number: order.order_number.clone(),
                user_id: order.user_id,
            },
        }
    }
}

/// Relevant part of the create-checkout response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCreated {
    pub id: String,
    pub redirect_url: String,
}

// ============================================================================
// Webhooks
// ============================================================================

/// Webhook event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: WebhookPayload,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub id: String,
    pub status: Option<String>,
    /// Amount in cents
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub payment_id: Option<String>,
    pub metadata: WebhookMetadata,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMetadata {
    pub order_id: Uuid,
}

impl WebhookEvent {
    /// Settlement this event describes, `None` for informational events
    pub fn outcome(&self) -> Option<PaymentOutcome> {
        classify(&self.event_type, self.payload.status.as_deref())
    }

    /// Reference stored on the order: the payment id if present, else the checkout id
    pub fn payment_reference(&self) -> &str {
        self.payload
            .payment_id
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.payload.id)
    }
}

/// Settlement for an event's outcome given the amount Yoco reports (cents)
pub fn settlement(
    outcome: PaymentOutcome,
    paid_cents: Option<i64>,
    total: rust_decimal::Decimal,
) -> Settlement {
    match outcome {
        PaymentOutcome::Paid if paid_cents == Some(shared::util::to_cents(total)) => {
            Settlement::Confirm
        }
        PaymentOutcome::Paid => Settlement::AmountMismatch,
        other => Settlement::Unsuccessful(other),
    }
}

fn classify(event_type: &str, status: Option<&str>) -> Option<PaymentOutcome> {
    let succeeded = matches!(status, Some("completed" | "succeeded"));
    match (event_type, status) {
        ("checkout.payment_received" | "payment.succeeded", _) if succeeded => {
            Some(PaymentOutcome::Paid)
        }
        ("payment.failed", _) | (_, Some("failed")) => Some(PaymentOutcome::Failed),
        ("checkout.cancelled", _) | (_, Some("cancelled")) => Some(PaymentOutcome::Cancelled),
        ("checkout.expired", _) | (_, Some("expired")) => Some(PaymentOutcome::Expired),
        _ => None,
    }
}

/// Signature-related webhook headers
#[derive(Debug, Clone, Copy)]
pub struct SignatureHeaders<'a> {
    pub signature: &'a str,
    pub webhook_id: Option<&'a str>,
    pub timestamp: Option<&'a str>,
}

/// Verify a webhook signature in either accepted scheme (constant-time)
pub fn verify_webhook_signature(
    body: &[u8],
    headers: SignatureHeaders<'_>,
    secret: &str,
    now_secs: i64,
) -> Result<(), &'static str> {
    let signature = headers.signature.trim();
    if signature.is_empty() {
        return Err("Missing signature");
    }

    if signature.split_whitespace().any(|e| e.starts_with("v1,")) {
        return verify_timestamped(body, headers, signature, secret, now_secs);
    }

    let hex_sig = signature.strip_prefix("sha256=").unwrap_or(signature);
    let sig_bytes = hex::decode(hex_sig).map_err(|_| "Invalid signature hex")?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(body);
    mac.verify_slice(&sig_bytes)
        .map_err(|_| "Webhook signature mismatch")
}

fn verify_timestamped(
    body: &[u8],
    headers: SignatureHeaders<'_>,
    signature: &str,
    secret: &str,
    now_secs: i64,
) -> Result<(), &'static str> {
    let id = headers.webhook_id.ok_or("Missing webhook-id header")?;
    let timestamp = headers.timestamp.ok_or("Missing webhook-timestamp header")?;

    let ts: i64 = timestamp.trim().parse().map_err(|_| "Invalid timestamp")?;
    if (now_secs - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err("Webhook timestamp outside tolerance");
    }

    let key = match secret.strip_prefix("whsec_") {
        Some(encoded) => BASE64.decode(encoded).map_err(|_| "Invalid webhook secret")?,
        None => secret.as_bytes().to_vec(),
    };
    let mut mac = HmacSha256::new_from_slice(&key).map_err(|_| "HMAC key error")?;
    mac.update(id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.trim().as_bytes());
    mac.update(b".");
    mac.update(body);

    let matched = signature
        .split_whitespace()
        .filter_map(|entry| entry.strip_prefix("v1,"))
        .filter_map(|b64| BASE64.decode(b64).ok())
        .any(|candidate| mac.clone().verify_slice(&candidate).is_ok());

    if matched {
        Ok(())
    } else {
        Err("Webhook signature mismatch")
    }
}
