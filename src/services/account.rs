use crate::config::LedgerApiConfig;
use crate::payments::utils::{Auth, PortalHttpClient};
use crate::payments::PaymentResult;
use crate::reasons::FailureReasonLedger;
use crate::services::unwrap_envelope;
use crate::session::{Agent, SessionContext};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

/// One row of the agent's transaction history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    #[serde(alias = "transaction_id")]
    pub id: String,
    #[serde(default, alias = "type", alias = "transaction_type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "party_id", alias = "msisdn")]
    pub counterparty: Option<String>,
    #[serde(default, alias = "timestamp")]
    pub created_at: Option<String>,
    #[serde(default, alias = "failure_reason")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionPage {
    #[serde(alias = "transactions", default)]
    pub items: Vec<TransactionRecord>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default, alias = "total_count")]
    pub total: u64,
}

/// Aggregates for the current business day.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DailySummary {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, alias = "total_cash_in")]
    pub cash_in_total: f64,
    #[serde(default, alias = "total_cash_out")]
    pub cash_out_total: f64,
    #[serde(default)]
    pub cash_in_count: u64,
    #[serde(default)]
    pub cash_out_count: u64,
    #[serde(default, alias = "commission_earned")]
    pub commission: f64,
}

/// Profile, history and summary views for the logged-in agent.
pub struct AccountService {
    config: LedgerApiConfig,
    http: PortalHttpClient,
    session: SessionContext,
    reasons: FailureReasonLedger,
}

impl AccountService {
    pub fn new(
        config: LedgerApiConfig,
        session: SessionContext,
        reasons: FailureReasonLedger,
    ) -> PaymentResult<Self> {
        Ok(Self {
            config,
            http: PortalHttpClient::new()?,
            session,
            reasons,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn get(&self, path: &str) -> PaymentResult<JsonValue> {
        self.http
            .request_json(
                reqwest::Method::GET,
                &self.endpoint(path),
                Auth::Bearer(self.session.token()),
                None,
                self.config.default_timeout(),
            )
            .await
    }

    /// Replace the cached agent record with the server's view.
    pub async fn refresh_profile(&self) -> PaymentResult<Agent> {
        let mut fresh: Agent = unwrap_envelope(self.get("/me").await?)?;
        if fresh.available_balance == 0.0 && fresh.holds_balance == 0.0 {
            fresh.available_balance = fresh.current_balance;
        }

        self.session.replace_agent(fresh.clone()).await;
        info!(
            agent_id = %fresh.id,
            current = fresh.current_balance,
            available = fresh.available_balance,
            "agent profile refreshed"
        );
        Ok(fresh)
    }

    /// One page of history. Rows the server returns without a reason pick up
    /// the one recorded locally when the transaction was declined.
    pub async fn transactions(&self, page: u32, per_page: u32) -> PaymentResult<TransactionPage> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);
        let path = format!("/me/transactions?page={}&per_page={}", page, per_page);

        let mut result: TransactionPage = unwrap_envelope(self.get(&path).await?)?;
        if result.page == 0 {
            result.page = page;
        }
        if result.per_page == 0 {
            result.per_page = per_page;
        }

        for item in result.items.iter_mut().filter(|i| i.reason.is_none()) {
            item.reason = self.reasons.lookup(&item.id).await;
        }

        debug!(page, count = result.items.len(), "transaction history loaded");
        Ok(result)
    }

    pub async fn daily_summary(&self) -> PaymentResult<DailySummary> {
        unwrap_envelope(self.get("/me/summary/daily").await?)
    }
}
