//! Ledger-backed path end to end: lookup, KYC confirmation and submission
//! against a mock of the CICO API.

mod common;

use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::{routing::post, Json, Router};
use cico_portal::config::LedgerApiConfig;
use cico_portal::flow::NoticeLevel;
use cico_portal::storage::JsonFileStore;
use cico_portal::{
    Direction, FailureReasonLedger, FlowError, FlowState, TransactionFlow, WalletRegistry,
};
use common::{context, ledger_config, memory_reasons, spawn_mock, voucher_config, TOKEN};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Seen = Arc<Mutex<Vec<(String, Option<String>, Value)>>>;

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn customer_found() -> Value {
    json!({
        "success": true,
        "data": {
            "given_name": "Thandi",
            "family_name": "Dlamini",
            "msisdn": "26876123456",
            "kyc_status": "verified"
        }
    })
}

/// Mock API that knows one customer. Every request is recorded.
fn customer_router(seen: Seen) -> Router {
    Router::new().route(
        "/customer-info",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let seen = seen.clone();
            async move {
                seen.lock()
                    .unwrap()
                    .push(("/customer-info".to_string(), bearer(&headers), body));
                Json(customer_found())
            }
        }),
    )
}

/// Customer mock plus `path` answering with `(status, reply)`.
fn ledger_router(seen: Seen, path: &'static str, status: StatusCode, reply: Value) -> Router {
    customer_router(seen.clone()).route(
        path,
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let seen = seen.clone();
            let reply = reply.clone();
            async move {
                seen.lock()
                    .unwrap()
                    .push((path.to_string(), bearer(&headers), body));
                (status, Json(reply))
            }
        }),
    )
}

fn enter(
    base: &str,
    ledger: LedgerApiConfig,
    direction: Direction,
    balance: f64,
    reasons: FailureReasonLedger,
) -> TransactionFlow {
    let ctx = context(ledger, voucher_config(base), balance, reasons);
    TransactionFlow::enter(&WalletRegistry::builtin(), Some("MOMO"), direction, ctx).unwrap()
}

#[tokio::test]
async fn momo_cash_in_takes_server_balance() {
    let seen: Seen = Arc::default();
    let base = spawn_mock(ledger_router(
        seen.clone(),
        "/cash-in/with-status",
        StatusCode::OK,
        json!({"success": true, "data": {"transaction_id": "TX1", "balance_after": 600.0}}),
    ))
    .await;

    let reasons = memory_reasons();
    let ctx = context(ledger_config(&base), voucher_config(&base), 500.0, reasons.clone());
    let session = ctx.session.clone();
    let flow =
        TransactionFlow::enter(&WalletRegistry::builtin(), Some("momo"), Direction::CashIn, ctx)
            .unwrap();
    assert_eq!(flow.state().await, FlowState::DataEntry);

    flow.set_phone("076 123 456").await.unwrap();
    flow.set_amount("100").await.unwrap();

    let customer = flow.lookup().await.unwrap();
    assert_eq!(customer.full_name(), "Thandi Dlamini");
    assert_eq!(flow.state().await, FlowState::KycConfirmation);

    let receipt = flow.confirm().await.unwrap();
    assert_eq!(receipt.transaction_id.as_deref(), Some("TX1"));
    assert_eq!(receipt.balance_after, 600.0);
    assert_eq!(receipt.customer, Some(customer));
    assert_eq!(session.balance().await, 600.0);
    assert_eq!(flow.state().await, FlowState::Complete);
    assert_eq!(reasons.lookup("TX1").await, None);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].2["msisdn"], "26876123456");
    assert_eq!(seen[1].0, "/cash-in/with-status");
    assert_eq!(seen[1].2["party_id"], "26876123456");
    assert_eq!(seen[1].2["amount"], 100.0);
    assert!(seen[1].2["description"]
        .as_str()
        .unwrap()
        .contains("MTN MoMo"));
    for (_, auth, _) in seen.iter() {
        assert_eq!(auth.as_deref(), Some(format!("Bearer {}", TOKEN).as_str()));
    }
}

#[tokio::test]
async fn declined_cash_out_keeps_balance_and_persists_reason() {
    let seen: Seen = Arc::default();
    let base = spawn_mock(ledger_router(
        seen.clone(),
        "/cash-out/with-status",
        StatusCode::OK,
        json!({"success": false, "data": {"transaction_id": "TX2", "reason": "NOT_ENOUGH_FUNDS"}}),
    ))
    .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reasons.json");
    let store = JsonFileStore::open(&path).await.unwrap();
    let reasons = FailureReasonLedger::new(Arc::new(store));

    let ctx = context(ledger_config(&base), voucher_config(&base), 500.0, reasons);
    let session = ctx.session.clone();
    let flow =
        TransactionFlow::enter(&WalletRegistry::builtin(), Some("MOMO"), Direction::CashOut, ctx)
            .unwrap();

    flow.set_phone("26876123456").await.unwrap();
    flow.set_amount("50").await.unwrap();
    flow.lookup().await.unwrap();

    let err = flow.confirm().await.unwrap_err();
    assert_eq!(
        err,
        FlowError::SoftFailure {
            transaction_id: Some("TX2".to_string()),
            reason: "NOT_ENOUGH_FUNDS".to_string(),
        }
    );
    assert_eq!(session.balance().await, 500.0);
    assert_eq!(flow.state().await, FlowState::DataEntry);

    let notice = flow.notice().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, "NOT_ENOUGH_FUNDS");

    // a fresh process sees the same reason
    let reopened = FailureReasonLedger::new(Arc::new(JsonFileStore::open(&path).await.unwrap()));
    assert_eq!(
        reopened.lookup("TX2").await.as_deref(),
        Some("NOT_ENOUGH_FUNDS")
    );
}

#[tokio::test]
async fn advisory_success_applies_delta_and_records_note() {
    let seen: Seen = Arc::default();
    let base = spawn_mock(ledger_router(
        seen.clone(),
        "/cash-in/with-status",
        StatusCode::OK,
        json!({"success": true, "data": {"transaction_id": "TX3", "reason": "Customer wallet near limit"}}),
    ))
    .await;

    let reasons = memory_reasons();
    let flow = enter(
        &base,
        ledger_config(&base),
        Direction::CashIn,
        500.0,
        reasons.clone(),
    );
    flow.set_phone("76123456").await.unwrap();
    flow.set_amount("100").await.unwrap();
    flow.lookup().await.unwrap();

    let receipt = flow.confirm().await.unwrap();
    assert_eq!(receipt.balance_after, 600.0);
    assert_eq!(receipt.reason.as_deref(), Some("Customer wallet near limit"));
    assert_eq!(flow.notice().await.unwrap().level, NoticeLevel::Warning);
    assert_eq!(
        reasons.lookup("TX3").await.as_deref(),
        Some("Customer wallet near limit")
    );
}

#[tokio::test]
async fn lookup_error_surfaces_server_message() {
    let router = Router::new().route(
        "/customer-info",
        post(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(json!({"success": false, "error": "Customer not registered"})),
            )
        }),
    );
    let base = spawn_mock(router).await;

    let flow = enter(
        &base,
        ledger_config(&base),
        Direction::CashIn,
        500.0,
        memory_reasons(),
    );
    flow.set_phone("76123456").await.unwrap();
    flow.set_amount("100").await.unwrap();

    let err = flow.lookup().await.unwrap_err();
    assert_eq!(
        err,
        FlowError::LookupFailed {
            message: "Customer not registered".to_string(),
        }
    );
    assert_eq!(flow.state().await, FlowState::DataEntry);
    assert_eq!(flow.customer().await, None);

    // the draft survives so the agent can correct the number
    assert_eq!(flow.draft().await.phone, "76123456");
}

#[tokio::test]
async fn expired_token_asks_for_login() {
    let router = Router::new().route(
        "/customer-info",
        post(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "token expired"})),
            )
        }),
    );
    let base = spawn_mock(router).await;

    let flow = enter(
        &base,
        ledger_config(&base),
        Direction::CashIn,
        500.0,
        memory_reasons(),
    );
    flow.set_phone("76123456").await.unwrap();
    flow.set_amount("10").await.unwrap();

    match flow.lookup().await.unwrap_err() {
        FlowError::LookupFailed { message } => assert!(message.contains("log in again")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn slow_cash_in_times_out_without_touching_balance() {
    let seen: Seen = Arc::default();
    let router = customer_router(seen).route(
            "/cash-in/with-status",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({"success": true, "data": {"transaction_id": "LATE"}}))
            }),
        );
    let base = spawn_mock(router).await;

    let ledger = LedgerApiConfig {
        cash_in_timeout: 1,
        ..ledger_config(&base)
    };
    let reasons = memory_reasons();
    let ctx = context(ledger, voucher_config(&base), 500.0, reasons);
    let session = ctx.session.clone();
    let flow =
        TransactionFlow::enter(&WalletRegistry::builtin(), Some("MOMO"), Direction::CashIn, ctx)
            .unwrap();

    flow.set_phone("76123456").await.unwrap();
    flow.set_amount("100").await.unwrap();
    flow.lookup().await.unwrap();

    let err = flow.confirm().await.unwrap_err();
    assert!(matches!(err, FlowError::HardFailure { .. }));
    assert!(err.user_message().contains("timed out"));
    assert_eq!(session.balance().await, 500.0);
    assert_eq!(flow.state().await, FlowState::DataEntry);
    assert!(flow.receipt().await.is_none());
}
