use crate::config::VoucherApiConfig;
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::{AdapterKind, ProviderAdapter};
use crate::payments::types::{
    extract_error_message, CompletedTransaction, Direction, SubmissionOutcome, SubmitRequest,
    VoucherEnvelope, VoucherRedeemRequest,
};
use crate::payments::utils::{Auth, HttpReply, PortalHttpClient};
use crate::wallets::AuthMethod;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

const STATUS_CODE_KEY: &str = "statuscode";
const STATUS_MESSAGE_KEYS: [&str; 3] = ["StatusMessage", "StatusDescription", "Message"];

/// Adapter for the external voucher-redemption API.
///
/// No customer lookup exists on this path; redemption is submitted directly
/// with the voucher number and the customer's PIN.
pub struct VoucherAdapter {
    config: VoucherApiConfig,
    http: PortalHttpClient,
}

impl VoucherAdapter {
    pub fn new(config: VoucherApiConfig) -> PaymentResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(PaymentError::Unsupported {
                message: "voucher API key is not configured".to_string(),
            });
        }

        Ok(Self {
            config,
            http: PortalHttpClient::new()?,
        })
    }

    fn redeem_url(&self, direction: Direction) -> String {
        let path = match direction {
            Direction::CashIn => "/redeem/cashin",
            Direction::CashOut => "/redeem/cashout",
        };
        format!("{}{}", self.config.base_url, path)
    }
}

#[async_trait]
impl ProviderAdapter for VoucherAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Voucher
    }

    async fn submit(&self, request: SubmitRequest) -> PaymentResult<SubmissionOutcome> {
        if request.method != AuthMethod::Voucher {
            return Err(PaymentError::Unsupported {
                message: format!(
                    "{} transactions are not supported for {} without customer lookup",
                    request.method, request.wallet_id
                ),
            });
        }

        let voucher_number = request
            .voucher_number
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or(PaymentError::ValidationError {
                message: "voucher number is required".to_string(),
                field: Some("voucher_number".to_string()),
            })?;

        let payload = serde_json::to_value(VoucherRedeemRequest {
            voucher_number,
            amount: request.amount,
            pin: request.pin.clone(),
            reference: request.reference.clone(),
        })
        .map_err(|e| PaymentError::ValidationError {
            message: format!("failed to encode request: {}", e),
            field: None,
        })?;

        debug!(
            direction = %request.direction,
            wallet = %request.wallet_id,
            amount = request.amount,
            "redeeming voucher"
        );

        let reply = self
            .http
            .send_json(
                reqwest::Method::POST,
                &self.redeem_url(request.direction),
                Auth::ApiKey(&self.config.api_key),
                Some(&payload),
                self.config.timeout(),
            )
            .await?;

        let outcome = normalize_voucher_reply(reply)?;
        if let SubmissionOutcome::Completed(done) = &outcome {
            info!(
                transaction_id = ?done.transaction_id,
                amount = ?done.amount_settled,
                "voucher redeemed"
            );
        }
        Ok(outcome)
    }
}

/// Map a redemption reply to the normalized outcome.
///
/// A non-zero status code anywhere in the trailer is a failure regardless of
/// the HTTP status. A failure that still names a transaction id is a decline.
pub fn normalize_voucher_reply(reply: HttpReply) -> PaymentResult<SubmissionOutcome> {
    let Some(body) = reply.body.as_ref() else {
        return Err(if reply.is_success() {
            PaymentError::MalformedResponse {
                message: "empty voucher response".to_string(),
            }
        } else {
            PaymentError::ApiError {
                status: reply.status,
                message: format!("Request failed with status {}", reply.status),
                body: None,
            }
        });
    };

    let envelope: VoucherEnvelope = match serde_json::from_value(body.clone()) {
        Ok(envelope) => envelope,
        Err(e) if reply.is_success() => {
            return Err(PaymentError::MalformedResponse {
                message: format!("invalid voucher response: {}", e),
            })
        }
        Err(_) => {
            return Err(PaymentError::ApiError {
                status: reply.status,
                message: extract_error_message(
                    Some(body),
                    &format!("Request failed with status {}", reply.status),
                ),
                body: Some(body.clone()),
            })
        }
    };

    let trailer = &envelope.response.trailer;
    let transaction_id = envelope
        .response
        .body
        .as_ref()
        .and_then(|b| b.unique_transaction_id.clone())
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());

    let failure_code = find_failure_code(trailer);
    if failure_code.is_none() && reply.is_success() {
        return Ok(SubmissionOutcome::Completed(CompletedTransaction {
            transaction_id,
            balance_after: None,
            amount_settled: envelope.response.body.and_then(|b| b.amount_redeemed),
            advisory_reason: None,
        }));
    }

    let reason = find_status_message(trailer).unwrap_or_else(|| match &failure_code {
        Some(code) => format!("Voucher redemption failed (code {})", code),
        None => extract_error_message(Some(body), "Voucher redemption failed"),
    });
    warn!(code = ?failure_code, %reason, "voucher redemption failed");

    Ok(match transaction_id {
        Some(transaction_id) => SubmissionOutcome::Declined {
            transaction_id,
            reason,
        },
        None => SubmissionOutcome::Rejected { reason },
    })
}

/// First non-zero status code found in the trailer, searched depth-first.
fn find_failure_code(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Object(map) => {
            for (key, inner) in map {
                if key.to_ascii_lowercase().ends_with(STATUS_CODE_KEY) {
                    if let Some(code) = non_zero_code(inner) {
                        return Some(code);
                    }
                }
            }
            map.values().find_map(find_failure_code)
        }
        JsonValue::Array(items) => items.iter().find_map(find_failure_code),
        _ => None,
    }
}

fn non_zero_code(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        JsonValue::String(s) => {
            let s = s.trim();
            let zero = s.is_empty() || s.parse::<f64>().map(|v| v == 0.0).unwrap_or(false);
            (!zero).then(|| s.to_string())
        }
        _ => None,
    }
}

fn find_status_message(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Object(map) => STATUS_MESSAGE_KEYS
            .iter()
            .find_map(|key| {
                map.get(*key)
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
            .or_else(|| map.values().find_map(find_status_message)),
        JsonValue::Array(items) => items.iter().find_map(find_status_message),
        _ => None,
    }
}
