use crate::config::LedgerApiConfig;
use crate::logging::mask_msisdn;
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::{AdapterKind, ProviderAdapter};
use crate::payments::types::{
    extract_error_message, CashResultData, CashWithStatusRequest, CompletedTransaction,
    CustomerInfoData, CustomerInfoRequest, CustomerRecord, Direction, LedgerEnvelope,
    SubmissionOutcome, SubmitRequest,
};
use crate::payments::utils::{decode_reply, Auth, HttpReply, PortalHttpClient};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, info, warn};

const CUSTOMER_INFO_PATH: &str = "/customer-info";
const CASH_IN_PATH: &str = "/cash-in/with-status";
const CASH_OUT_PATH: &str = "/cash-out/with-status";

/// Adapter for the internal ledger-backed CICO API.
///
/// Every call carries the agent's bearer token.
pub struct LedgerAdapter {
    config: LedgerApiConfig,
    http: PortalHttpClient,
    token: String,
}

impl LedgerAdapter {
    pub fn new(config: LedgerApiConfig, token: impl Into<String>) -> PaymentResult<Self> {
        Ok(Self {
            config,
            http: PortalHttpClient::new()?,
            token: token.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn submission_route(&self, direction: Direction) -> (&'static str, Duration) {
        match direction {
            Direction::CashIn => (CASH_IN_PATH, self.config.cash_in_timeout()),
            Direction::CashOut => (CASH_OUT_PATH, self.config.cash_out_timeout()),
        }
    }

    fn to_json<T: serde::Serialize>(value: &T) -> PaymentResult<JsonValue> {
        serde_json::to_value(value).map_err(|e| PaymentError::ValidationError {
            message: format!("failed to encode request: {}", e),
            field: None,
        })
    }
}

#[async_trait]
impl ProviderAdapter for LedgerAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Ledger
    }

    async fn lookup_customer(&self, msisdn: &str) -> PaymentResult<CustomerRecord> {
        debug!(msisdn = %mask_msisdn(msisdn), "looking up customer");

        let payload = Self::to_json(&CustomerInfoRequest {
            msisdn: msisdn.to_string(),
        })?;
        let reply = self
            .http
            .send_json(
                reqwest::Method::POST,
                &self.endpoint(CUSTOMER_INFO_PATH),
                Auth::Bearer(&self.token),
                Some(&payload),
                self.config.lookup_timeout(),
            )
            .await?;

        let customer = normalize_customer_reply(reply, msisdn)?;
        info!(
            msisdn = %mask_msisdn(&customer.msisdn),
            kyc = %customer.kyc_status,
            "customer resolved"
        );
        Ok(customer)
    }

    async fn submit(&self, request: SubmitRequest) -> PaymentResult<SubmissionOutcome> {
        let party_id = request
            .msisdn
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or(PaymentError::ValidationError {
                message: "customer phone number is required".to_string(),
                field: Some("msisdn".to_string()),
            })?;

        let (path, timeout) = self.submission_route(request.direction);
        let payload = Self::to_json(&CashWithStatusRequest {
            amount: request.amount,
            party_id,
            description: request.description.clone(),
            otp: request.otp.clone(),
        })?;

        debug!(
            direction = %request.direction,
            wallet = %request.wallet_id,
            amount = request.amount,
            "submitting ledger transaction"
        );

        let reply = self
            .http
            .send_json(
                reqwest::Method::POST,
                &self.endpoint(path),
                Auth::Bearer(&self.token),
                Some(&payload),
                timeout,
            )
            .await?;

        normalize_cash_reply(reply)
    }
}

/// Map a customer-info reply to a record, or a lookup error.
pub fn normalize_customer_reply(reply: HttpReply, msisdn: &str) -> PaymentResult<CustomerRecord> {
    let status = reply.status;
    let body = reply.body.clone();
    let envelope: LedgerEnvelope<CustomerInfoData> = decode_reply(reply)?;

    let not_found = || PaymentError::ApiError {
        status,
        message: extract_error_message(body.as_ref(), "Customer not found"),
        body: body.clone(),
    };

    if envelope.success == Some(false) {
        return Err(not_found());
    }
    let data = envelope.data.ok_or_else(not_found)?;

    let given_name = data.given_name.unwrap_or_default().trim().to_string();
    let family_name = data.family_name.unwrap_or_default().trim().to_string();
    if given_name.is_empty() && family_name.is_empty() {
        return Err(not_found());
    }

    Ok(CustomerRecord {
        given_name,
        family_name,
        msisdn: data
            .msisdn
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| msisdn.to_string()),
        kyc_status: data
            .kyc_status
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "unverified".to_string()),
    })
}

/// Map a with-status reply to the normalized outcome.
///
/// - `success: true` with data: completed, possibly with an advisory reason
/// - not successful but a transaction id is present: declined
/// - 2xx, not successful, no id: rejected
/// - non-2xx, no id: error carrying the structured body
pub fn normalize_cash_reply(reply: HttpReply) -> PaymentResult<SubmissionOutcome> {
    let Some(body) = reply.body.as_ref() else {
        return Err(if reply.is_success() {
            PaymentError::MalformedResponse {
                message: "empty response body".to_string(),
            }
        } else {
            PaymentError::ApiError {
                status: reply.status,
                message: format!("Request failed with status {}", reply.status),
                body: None,
            }
        });
    };

    let envelope: LedgerEnvelope<CashResultData> = match serde_json::from_value(body.clone()) {
        Ok(envelope) => envelope,
        Err(e) if reply.is_success() => {
            return Err(PaymentError::MalformedResponse {
                message: format!("invalid transaction response: {}", e),
            })
        }
        // error bodies are free-form; fall through to message extraction
        Err(_) => LedgerEnvelope {
            success: None,
            data: None,
        },
    };

    if reply.is_success() && envelope.success == Some(true) {
        let data = envelope.data.ok_or(PaymentError::MalformedResponse {
            message: "successful response carried no transaction data".to_string(),
        })?;
        return Ok(SubmissionOutcome::Completed(CompletedTransaction {
            transaction_id: non_blank(data.transaction_id),
            balance_after: data.balance_after,
            amount_settled: None,
            advisory_reason: non_blank(data.reason),
        }));
    }

    let data = envelope.data;
    let transaction_id = data.as_ref().and_then(|d| non_blank(d.transaction_id.clone()));
    let reason = data.as_ref().and_then(|d| non_blank(d.reason.clone()));

    match transaction_id {
        Some(transaction_id) => {
            let reason =
                reason.unwrap_or_else(|| extract_error_message(Some(body), "Transaction declined"));
            warn!(%transaction_id, %reason, "ledger transaction declined");
            Ok(SubmissionOutcome::Declined {
                transaction_id,
                reason,
            })
        }
        None if reply.is_success() => Ok(SubmissionOutcome::Rejected {
            reason: reason
                .unwrap_or_else(|| extract_error_message(Some(body), "Transaction failed")),
        }),
        None => Err(PaymentError::ApiError {
            status: reply.status,
            message: reason.unwrap_or_else(|| {
                extract_error_message(
                    Some(body),
                    &format!("Request failed with status {}", reply.status),
                )
            }),
            body: Some(body.clone()),
        }),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
