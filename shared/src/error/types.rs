//! `AppError` and the JSON body clients receive for it

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

type Details = HashMap<String, Value>;

/// Handler failure: a numeric [`ErrorCode`], a customer-safe message and
/// optional structured details (offending field, stock left, ...).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<Details>,
}

impl AppError {
    /// Error carrying the code's default message
    pub fn new(code: ErrorCode) -> Self {
        Self::with_message(code, code.message())
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(Details::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// `"{resource} not found"`, with the resource name in the details
    pub fn not_found(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{resource} not found"))
            .with_detail("resource", resource)
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::TokenInvalid, msg)
    }

    pub fn token_expired() -> Self {
        Self::new(ErrorCode::TokenExpired)
    }

    /// Too many requests; `retry_after` holds the seconds until the window resets
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::new(ErrorCode::RateLimited).with_detail("retry_after", retry_after_secs)
    }

    /// Gateway callback whose signature does not verify
    pub fn invalid_signature() -> Self {
        Self::new(ErrorCode::InvalidSignature)
    }

    /// Order status change the lifecycle does not allow (409)
    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        let (from, to) = (from.into(), to.into());
        Self::with_message(
            ErrorCode::InvalidStatusTransition,
            format!("Cannot change order status from {from} to {to}"),
        )
        .with_detail("from", from)
        .with_detail("to", to)
    }
}

/// Error response body: `{"code": 4001, "message": "...", "details": {...}}`
///
/// Successful responses are the bare payload, so only failures use this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Details>,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code.code(),
            message: err.message.clone(),
            details: err.details.clone(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if self.code.category() == ErrorCategory::System {
            tracing::error!(code = %self.code, message = %self.message, "System error occurred");
        }
        (self.http_status(), axum::Json(ErrorBody::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_and_custom_messages() {
        let err = AppError::new(ErrorCode::StoreClosed);
        assert_eq!(err.message, ErrorCode::StoreClosed.message());
        assert!(err.details.is_none());

        let err = AppError::with_message(ErrorCode::OrderNotFound, "No such order");
        assert_eq!(err.to_string(), "No such order");
        assert_eq!(err.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn details_accumulate() {
        let err = AppError::validation("Phone number is required")
            .with_detail("field", "customer.phone")
            .with_detail("line", 3);
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        let details = err.details.unwrap();
        assert_eq!(details["field"], "customer.phone");
        assert_eq!(details["line"], 3);
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = AppError::not_found("Profile");
        assert_eq!(err.message, "Profile not found");
        assert_eq!(err.details.unwrap()["resource"], "Profile");
    }

    #[test]
    fn auth_and_gateway_failures_are_unauthorized() {
        for err in [
            AppError::invalid_token("bad token"),
            AppError::token_expired(),
            AppError::invalid_signature(),
        ] {
            assert_eq!(err.http_status(), StatusCode::UNAUTHORIZED, "{:?}", err.code);
        }
    }

    #[test]
    fn invalid_transition_details() {
        let err = AppError::invalid_transition("completed", "preparing");
        assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
        assert_eq!(err.message, "Cannot change order status from completed to preparing");
        let details = err.details.unwrap();
        assert_eq!(details["from"], "completed");
        assert_eq!(details["to"], "preparing");
    }

    #[test]
    fn rate_limited_carries_retry_after() {
        let err = AppError::rate_limited(42);
        assert_eq!(err.http_status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.details.unwrap()["retry_after"], 42);
    }

    #[test]
    fn error_body_omits_empty_details() {
        let body = ErrorBody::from(&AppError::new(ErrorCode::OrderNotPayable));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], 4010);
        assert!(json.get("details").is_none());

        let body = ErrorBody::from(&AppError::rate_limited(5));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["details"]["retry_after"], 5);
    }
}
