use crate::wallets::AuthMethod;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Which way money moves for the customer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    CashIn,
    CashOut,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::CashIn => "cash_in",
            Direction::CashOut => "cash_out",
        }
    }

    /// Sign applied to the agent balance when computing it locally.
    pub fn balance_sign(&self) -> f64 {
        match self {
            Direction::CashIn => 1.0,
            Direction::CashOut => -1.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::CashIn => "Cash-in",
            Direction::CashOut => "Cash-out",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a successful customer-info lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerRecord {
    pub given_name: String,
    pub family_name: String,
    pub msisdn: String,
    pub kyc_status: String,
}

impl CustomerRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
            .trim()
            .to_string()
    }
}

/// Everything an adapter needs to submit one transaction.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub direction: Direction,
    pub wallet_id: String,
    pub method: AuthMethod,
    /// Normalized MSISDN used as the party identifier (ledger path)
    pub msisdn: Option<String>,
    pub voucher_number: Option<String>,
    pub amount: f64,
    pub pin: Option<String>,
    pub otp: Option<String>,
    pub description: String,
    /// Unique per submission attempt
    pub reference: String,
}

/// A transaction the provider accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTransaction {
    pub transaction_id: Option<String>,
    /// Post-transaction agent balance reported by the server
    pub balance_after: Option<f64>,
    /// Amount the provider actually settled, when it says so
    pub amount_settled: Option<f64>,
    /// Reason surfaced alongside a nominal success
    pub advisory_reason: Option<String>,
}

/// Normalized outcome of a submission, identical for every adapter.
///
/// The split between `Declined` and `Rejected` is explicit: a decline always
/// carries the transaction id the provider attributed it to, a rejection
/// never does.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Completed(CompletedTransaction),
    Declined {
        transaction_id: String,
        reason: String,
    },
    Rejected {
        reason: String,
    },
}

/// Pull a human-readable message out of a structured error body.
///
/// Priority: `error` string, `message` string, `details`, then `fallback`.
/// A nested `{"error": {"message": ..}}` object is also understood.
pub fn extract_error_message(body: Option<&JsonValue>, fallback: &str) -> String {
    let Some(body) = body else {
        return fallback.to_string();
    };

    let non_empty = |v: Option<&JsonValue>| {
        v.and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    if let Some(message) = non_empty(body.get("error")) {
        return message;
    }
    if let Some(message) = non_empty(body.get("error").and_then(|e| e.get("message"))) {
        return message;
    }
    if let Some(message) = non_empty(body.get("message")) {
        return message;
    }
    match body.get("details") {
        Some(JsonValue::Null) | None => {}
        Some(JsonValue::String(s)) if !s.trim().is_empty() => return s.trim().to_string(),
        Some(JsonValue::String(_)) => {}
        Some(other) => return other.to_string(),
    }

    fallback.to_string()
}

// ---------------------------------------------------------------------------
// Ledger-backed API wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CustomerInfoRequest {
    pub msisdn: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CashWithStatusRequest {
    pub amount: f64,
    pub party_id: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerEnvelope<T> {
    pub success: Option<bool>,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerInfoData {
    #[serde(alias = "givenName", alias = "first_name")]
    pub given_name: Option<String>,
    #[serde(alias = "familyName", alias = "last_name")]
    pub family_name: Option<String>,
    #[serde(default)]
    pub msisdn: Option<String>,
    #[serde(default, alias = "kyc_verification", alias = "kycStatus")]
    pub kyc_status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CashResultData {
    #[serde(
        default,
        alias = "id",
        alias = "transactionId",
        deserialize_with = "lenient_id"
    )]
    pub transaction_id: Option<String>,
    #[serde(
        default,
        alias = "new_balance",
        alias = "balanceAfter",
        deserialize_with = "lenient_amount"
    )]
    pub balance_after: Option<f64>,
    #[serde(default, alias = "failure_reason", alias = "status_reason")]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// External voucher API wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoucherRedeemRequest {
    pub voucher_number: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    pub reference: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoucherEnvelope {
    pub response: VoucherResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoucherResponse {
    #[serde(rename = "Trailer", default)]
    pub trailer: JsonValue,
    #[serde(rename = "Body", default)]
    pub body: Option<VoucherBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoucherBody {
    #[serde(rename = "AmountRedeemed", default, deserialize_with = "lenient_amount")]
    pub amount_redeemed: Option<f64>,
    #[serde(rename = "UniqueTransactionId", default, deserialize_with = "lenient_id")]
    pub unique_transaction_id: Option<String>,
}

/// Identifiers arrive as strings or bare numbers depending on the backend.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<JsonValue>::deserialize(deserializer)? {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s)),
        Some(JsonValue::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected string or number identifier, got {}",
            other
        ))),
    }
}

/// Amounts arrive as JSON numbers or decimal strings such as `"600.00"`.
fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<JsonValue>::deserialize(deserializer)? {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| de::Error::custom("amount out of range")),
        Some(JsonValue::String(s)) if s.trim().is_empty() => Ok(None),
        Some(JsonValue::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid amount {:?}", s))),
        Some(other) => Err(de::Error::custom(format!(
            "expected number or numeric string amount, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_message_priority() {
        let body = json!({"error": "E", "message": "M", "details": "D"});
        assert_eq!(extract_error_message(Some(&body), "F"), "E");

        let body = json!({"message": "M", "details": "D"});
        assert_eq!(extract_error_message(Some(&body), "F"), "M");

        let body = json!({"details": "D"});
        assert_eq!(extract_error_message(Some(&body), "F"), "D");

        let body = json!({"unrelated": true});
        assert_eq!(extract_error_message(Some(&body), "F"), "F");
        assert_eq!(extract_error_message(None, "F"), "F");
    }

    #[test]
    fn error_message_skips_blank_fields() {
        let body = json!({"error": "  ", "message": "Customer not registered"});
        assert_eq!(
            extract_error_message(Some(&body), "F"),
            "Customer not registered"
        );
    }

    #[test]
    fn error_message_understands_nested_error_object() {
        let body = json!({"error": {"code": 42, "message": "Velocity limit"}});
        assert_eq!(extract_error_message(Some(&body), "F"), "Velocity limit");
    }

    #[test]
    fn structured_details_are_rendered_compactly() {
        let body = json!({"details": {"field": "amount"}});
        assert_eq!(
            extract_error_message(Some(&body), "F"),
            r#"{"field":"amount"}"#
        );
    }

    #[test]
    fn cash_result_accepts_field_aliases() {
        let data: CashResultData = serde_json::from_value(json!({
            "id": "TX9",
            "new_balance": 42.5,
            "failure_reason": "PIN_TIMEOUT"
        }))
        .unwrap();
        assert_eq!(data.transaction_id.as_deref(), Some("TX9"));
        assert_eq!(data.balance_after, Some(42.5));
        assert_eq!(data.reason.as_deref(), Some("PIN_TIMEOUT"));
    }

    #[test]
    fn voucher_request_uses_pascal_case() {
        let request = VoucherRedeemRequest {
            voucher_number: "V123".to_string(),
            amount: 200.0,
            pin: None,
            reference: "ref".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["VoucherNumber"], "V123");
        assert!(json.get("Pin").is_none());
    }

    #[test]
    fn direction_sign() {
        assert_eq!(Direction::CashIn.balance_sign(), 1.0);
        assert_eq!(Direction::CashOut.balance_sign(), -1.0);
    }
}
