//! Payment gateway integrations via REST / hosted forms (no SDK dependency)
//!
//! - `yoco`: hosted checkout API + signed JSON webhooks
//! - `payfast`: signed redirect form + ITN callbacks

pub mod payfast;
pub mod yoco;

use shared::error::{AppError, ErrorCode};

/// Failure talking to a payment gateway
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected gateway response: {0}")]
    Malformed(String),
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        tracing::error!(error = %e, "Payment gateway error");
        AppError::new(ErrorCode::PaymentGatewayError)
    }
}

/// How a gateway notification settles an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Paid,
    Cancelled,
    Expired,
    Failed,
}

impl PaymentOutcome {
    /// Payment status recorded for a non-successful outcome
    pub fn payment_status(self) -> shared::models::PaymentStatus {
        use shared::models::PaymentStatus;
        match self {
            PaymentOutcome::Paid => PaymentStatus::Paid,
            PaymentOutcome::Cancelled => PaymentStatus::Cancelled,
            PaymentOutcome::Expired => PaymentStatus::Expired,
            PaymentOutcome::Failed => PaymentStatus::Failed,
        }
    }
}

/// What a settled gateway notification asks of the order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Paid in full: confirm the order
    Confirm,
    /// Paid, but not the order total: record a failure
    AmountMismatch,
    /// Cancel the order with this outcome
    Unsuccessful(PaymentOutcome),
}

impl Settlement {
    /// Outcome recorded on the order when it is not confirmed
    pub fn failure_outcome(self) -> Option<PaymentOutcome> {
        match self {
            Settlement::Confirm => None,
            Settlement::AmountMismatch => Some(PaymentOutcome::Failed),
            Settlement::Unsuccessful(outcome) => Some(outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_errors_map_to_bad_gateway() {
        let err: AppError = GatewayError::Malformed("no id".into()).into();
        assert_eq!(err.code, ErrorCode::PaymentGatewayError);
        assert_eq!(err.http_status(), http::StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn mismatched_amounts_record_a_failure() {
        assert_eq!(Settlement::Confirm.failure_outcome(), None);
        assert_eq!(
            Settlement::AmountMismatch.failure_outcome(),
            Some(PaymentOutcome::Failed)
        );
        assert_eq!(
            Settlement::Unsuccessful(PaymentOutcome::Expired).failure_outcome(),
            Some(PaymentOutcome::Expired)
        );
    }
}
