//! Thin clients for the agent-facing backend endpoints
//!
//! Authentication (OTP login, logout) and the account views the flow does
//! not own: profile refresh, transaction history and the daily summary.

pub mod account;
pub mod auth;

pub use account::{AccountService, DailySummary, TransactionPage, TransactionRecord};
pub use auth::AuthService;

use crate::payments::types::extract_error_message;
use crate::payments::{PaymentError, PaymentResult};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// Decode a 2xx body that is either `{success, data: T}` or a bare `T`.
pub(crate) fn unwrap_envelope<T: DeserializeOwned>(body: JsonValue) -> PaymentResult<T> {
    if body.get("success").and_then(JsonValue::as_bool) == Some(false) {
        return Err(PaymentError::ApiError {
            status: 200,
            message: extract_error_message(Some(&body), "Request was not successful"),
            body: Some(body),
        });
    }

    let payload = match body.get("data") {
        Some(data) if !data.is_null() => data.clone(),
        _ => body,
    };
    serde_json::from_value(payload).map_err(|e| PaymentError::MalformedResponse {
        message: format!("unexpected response shape: {}", e),
    })
}
