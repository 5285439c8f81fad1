//! Direct voucher-redemption path against a mock of the external voucher API.

mod common;

use axum::http::{HeaderMap, StatusCode};
use axum::{routing::post, Json, Router};
use cico_portal::config::VoucherApiConfig;
use cico_portal::{AuthMethod, Direction, FlowError, FlowState, TransactionFlow, WalletRegistry};
use common::{context, ledger_config, memory_reasons, spawn_mock, voucher_config, VOUCHER_KEY};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<(Option<String>, Value)>>>,
}

impl Recorder {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_body(&self) -> Value {
        self.last.lock().unwrap().clone().unwrap().1
    }

    fn last_key(&self) -> Option<String> {
        self.last.lock().unwrap().clone().unwrap().0
    }
}

fn voucher_router(
    recorder: Recorder,
    path: &'static str,
    status: StatusCode,
    reply: Value,
) -> Router {
    Router::new().route(
        path,
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let recorder = recorder.clone();
            let reply = reply.clone();
            async move {
                recorder.calls.fetch_add(1, Ordering::SeqCst);
                let key = headers
                    .get("x-api-key")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                *recorder.last.lock().unwrap() = Some((key, body));
                (status, Json(reply))
            }
        }),
    )
}

#[tokio::test]
async fn unayo_cash_in_credits_redeemed_amount() {
    let recorder = Recorder::default();
    let base = spawn_mock(voucher_router(
        recorder.clone(),
        "/redeem/cashin",
        StatusCode::OK,
        json!({
            "response": {
                "Trailer": {"StatusCode": 0, "StatusMessage": "Success"},
                "Body": {"AmountRedeemed": 200.0, "UniqueTransactionId": "U1"}
            }
        }),
    ))
    .await;

    let ctx = context(ledger_config(&base), voucher_config(&base), 500.0, memory_reasons());
    let session = ctx.session.clone();
    let flow =
        TransactionFlow::enter(&WalletRegistry::builtin(), Some("UNAYO"), Direction::CashIn, ctx)
            .unwrap();
    assert_eq!(flow.method().await, Some(AuthMethod::Voucher));

    flow.set_voucher_number("123456789").await.unwrap();
    flow.set_amount("200").await.unwrap();
    let receipt = flow.submit().await.unwrap();

    assert_eq!(receipt.transaction_id.as_deref(), Some("U1"));
    assert_eq!(receipt.amount, 200.0);
    assert_eq!(receipt.balance_after, 700.0);
    assert_eq!(receipt.customer, None);
    assert_eq!(session.balance().await, 700.0);
    assert_eq!(flow.state().await, FlowState::Complete);

    assert_eq!(recorder.calls(), 1);
    assert_eq!(recorder.last_key().as_deref(), Some(VOUCHER_KEY));
    let body = recorder.last_body();
    assert_eq!(body["VoucherNumber"], "123456789");
    assert_eq!(body["Amount"], 200.0);
    assert!(!body["Reference"].as_str().unwrap().is_empty());
    assert!(body.get("Pin").is_none());
}

#[tokio::test]
async fn nested_trailer_code_fails_despite_http_200() {
    let recorder = Recorder::default();
    let base = spawn_mock(voucher_router(
        recorder.clone(),
        "/redeem/cashout",
        StatusCode::OK,
        json!({
            "response": {
                "Trailer": {
                    "Result": {"ResultStatusCode": "E17", "StatusDescription": "Voucher already redeemed"}
                },
                "Body": {"UniqueTransactionId": "U2"}
            }
        }),
    ))
    .await;

    let reasons = memory_reasons();
    let ctx = context(ledger_config(&base), voucher_config(&base), 500.0, reasons.clone());
    let session = ctx.session.clone();
    let flow =
        TransactionFlow::enter(&WalletRegistry::builtin(), Some("UNAYO"), Direction::CashOut, ctx)
            .unwrap();

    flow.set_voucher_number("987654321").await.unwrap();
    flow.set_amount("150").await.unwrap();

    let err = flow.submit().await.unwrap_err();
    assert_eq!(
        err,
        FlowError::SoftFailure {
            transaction_id: Some("U2".to_string()),
            reason: "Voucher already redeemed".to_string(),
        }
    );
    assert_eq!(session.balance().await, 500.0);
    assert_eq!(flow.state().await, FlowState::DataEntry);
    assert_eq!(
        reasons.lookup("U2").await.as_deref(),
        Some("Voucher already redeemed")
    );
}

#[tokio::test]
async fn instacash_voucher_sends_pin() {
    let recorder = Recorder::default();
    let base = spawn_mock(voucher_router(
        recorder.clone(),
        "/redeem/cashout",
        StatusCode::OK,
        json!({
            "response": {
                "Trailer": {"StatusCode": "0"},
                "Body": {"UniqueTransactionId": "U3"}
            }
        }),
    ))
    .await;

    let ctx = context(ledger_config(&base), voucher_config(&base), 500.0, memory_reasons());
    let session = ctx.session.clone();
    let flow = TransactionFlow::enter(
        &WalletRegistry::builtin(),
        Some("INSTACASH"),
        Direction::CashOut,
        ctx,
    )
    .unwrap();
    assert_eq!(flow.state().await, FlowState::MethodSelection);

    flow.select_method(AuthMethod::Voucher).await.unwrap();
    flow.set_voucher_number("555000111").await.unwrap();
    flow.set_amount("120.50").await.unwrap();

    let err = flow.submit().await.unwrap_err();
    assert!(matches!(err, FlowError::Validation { field: Some("pin"), .. }));
    assert_eq!(recorder.calls(), 0);

    flow.set_pin("4321").await.unwrap();
    let receipt = flow.submit().await.unwrap();

    // no settled amount in the reply, so the requested amount is debited
    assert_eq!(receipt.amount, 120.5);
    assert_eq!(session.balance().await, 379.5);
    assert_eq!(recorder.last_body()["Pin"], "4321");
}

#[tokio::test]
async fn cash_out_over_available_balance_never_reaches_provider() {
    let recorder = Recorder::default();
    let base = spawn_mock(voucher_router(
        recorder.clone(),
        "/redeem/cashout",
        StatusCode::OK,
        json!({}),
    ))
    .await;

    let ctx = context(ledger_config(&base), voucher_config(&base), 100.0, memory_reasons());
    let flow =
        TransactionFlow::enter(&WalletRegistry::builtin(), Some("UNAYO"), Direction::CashOut, ctx)
            .unwrap();
    flow.set_voucher_number("123").await.unwrap();
    flow.set_amount("100.01").await.unwrap();

    let err = flow.submit().await.unwrap_err();
    assert!(matches!(err, FlowError::Validation { field: Some("amount"), .. }));
    assert_eq!(recorder.calls(), 0);
    assert_eq!(flow.state().await, FlowState::DataEntry);
}

#[tokio::test]
async fn server_error_without_trailer_is_hard_failure() {
    let recorder = Recorder::default();
    let base = spawn_mock(voucher_router(
        recorder.clone(),
        "/redeem/cashin",
        StatusCode::SERVICE_UNAVAILABLE,
        json!({"message": "maintenance window"}),
    ))
    .await;

    let ctx = context(ledger_config(&base), voucher_config(&base), 500.0, memory_reasons());
    let session = ctx.session.clone();
    let flow =
        TransactionFlow::enter(&WalletRegistry::builtin(), Some("UNAYO"), Direction::CashIn, ctx)
            .unwrap();
    flow.set_voucher_number("123").await.unwrap();
    flow.set_amount("10").await.unwrap();

    let err = flow.submit().await.unwrap_err();
    assert_eq!(
        err,
        FlowError::HardFailure {
            message: "maintenance window".to_string(),
        }
    );
    assert_eq!(session.balance().await, 500.0);
}

#[tokio::test]
async fn voucher_wallet_without_api_key_is_unsupported() {
    let voucher = VoucherApiConfig {
        api_key: String::new(),
        ..voucher_config("http://127.0.0.1:9")
    };
    let ctx = context(
        ledger_config("http://127.0.0.1:9"),
        voucher,
        500.0,
        memory_reasons(),
    );

    let result =
        TransactionFlow::enter(&WalletRegistry::builtin(), Some("UNAYO"), Direction::CashIn, ctx);
    assert!(matches!(
        result.err(),
        Some(FlowError::UnsupportedConfiguration { .. })
    ));
}
