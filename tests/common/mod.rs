#![allow(dead_code)]

use axum::Router;
use cico_portal::config::{LedgerApiConfig, MsisdnConfig, VoucherApiConfig};
use cico_portal::payments::AdapterFactory;
use cico_portal::storage::MemoryStore;
use cico_portal::{Agent, FailureReasonLedger, FlowContext, SessionContext};
use std::sync::Arc;

pub const TOKEN: &str = "agent-token-1";
pub const VOUCHER_KEY: &str = "voucher-key-1";

/// Serve `router` on an ephemeral port and return its base URL.
pub async fn spawn_mock(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("mock server address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server");
    });
    format!("http://{}", addr)
}

pub fn agent(balance: f64) -> Agent {
    Agent {
        id: "AG-001".to_string(),
        name: "Sipho Agent".to_string(),
        phone: "26876000000".to_string(),
        current_balance: balance,
        available_balance: balance,
        holds_balance: 0.0,
        fund_limit: 10_000.0,
    }
}

pub fn ledger_config(base_url: &str) -> LedgerApiConfig {
    LedgerApiConfig {
        base_url: base_url.to_string(),
        ..LedgerApiConfig::default()
    }
}

pub fn voucher_config(base_url: &str) -> VoucherApiConfig {
    VoucherApiConfig {
        base_url: base_url.to_string(),
        api_key: VOUCHER_KEY.to_string(),
        timeout: 5,
    }
}

pub fn memory_reasons() -> FailureReasonLedger {
    FailureReasonLedger::new(Arc::new(MemoryStore::new()))
}

/// Flow context wired to the real adapters, pointed at mock servers.
pub fn context(
    ledger: LedgerApiConfig,
    voucher: VoucherApiConfig,
    balance: f64,
    reasons: FailureReasonLedger,
) -> FlowContext {
    FlowContext {
        session: SessionContext::new(TOKEN, agent(balance), None),
        adapters: Arc::new(AdapterFactory::new(ledger, voucher)),
        reasons,
        msisdn: MsisdnConfig::default(),
    }
}
