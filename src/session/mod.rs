//! Authenticated agent session
//!
//! Owns the agent record and bearer token. The transaction flow only sees a
//! [`SessionContext`], whose single mutation method is
//! [`SessionContext::apply_balance`].

pub mod store;

pub use store::SessionStore;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// The authenticated operator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    #[serde(alias = "agent_id")]
    pub id: String,
    #[serde(alias = "display_name", default)]
    pub name: String,
    #[serde(alias = "phone_number", default)]
    pub phone: String,
    #[serde(default)]
    pub current_balance: f64,
    #[serde(default)]
    pub available_balance: f64,
    #[serde(default)]
    pub holds_balance: f64,
    #[serde(default)]
    pub fund_limit: f64,
}

impl Agent {
    fn recompute_available(&mut self) {
        self.available_balance = self.current_balance - self.holds_balance;
    }
}

/// Persisted session: token, agent record and selected service type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub token: String,
    pub agent: Agent,
    pub service_type: Option<String>,
}

/// How a confirmed transaction result moves the agent balance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BalanceUpdate {
    /// Server reported the post-transaction balance.
    Absolute(f64),
    /// Locally computed change (cash-in positive, cash-out negative).
    Delta(f64),
}

/// Explicit session handle handed to the transaction flow.
#[derive(Clone)]
pub struct SessionContext {
    token: String,
    agent: Arc<RwLock<Agent>>,
    store: Option<SessionStore>,
}

impl SessionContext {
    pub fn new(token: impl Into<String>, agent: Agent, store: Option<SessionStore>) -> Self {
        Self {
            token: token.into(),
            agent: Arc::new(RwLock::new(agent)),
            store,
        }
    }

    /// Rebuild a context from a previously persisted session.
    pub async fn restore(store: SessionStore) -> Option<Self> {
        let session = store.load().await?;
        info!(agent_id = %session.agent.id, "session restored");
        Some(Self::new(session.token, session.agent, Some(store)))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub async fn agent(&self) -> Agent {
        self.agent.read().await.clone()
    }

    pub async fn balance(&self) -> f64 {
        self.agent.read().await.current_balance
    }

    pub async fn available_balance(&self) -> f64 {
        self.agent.read().await.available_balance
    }

    /// Apply a confirmed transaction result and persist the agent record.
    ///
    /// Returns the new current balance. Holds are untouched, so the available
    /// balance moves with the current balance.
    pub async fn apply_balance(&self, update: BalanceUpdate) -> f64 {
        let mut agent = self.agent.write().await;
        let previous = agent.current_balance;
        agent.current_balance = match update {
            BalanceUpdate::Absolute(value) => value,
            BalanceUpdate::Delta(delta) => previous + delta,
        };
        agent.recompute_available();

        info!(
            agent_id = %agent.id,
            previous,
            current = agent.current_balance,
            "agent balance updated"
        );

        self.persist(&agent).await;
        agent.current_balance
    }

    /// Replace balances with a freshly fetched server profile.
    pub(crate) async fn replace_agent(&self, fresh: Agent) {
        let mut agent = self.agent.write().await;
        *agent = fresh;
        self.persist(&agent).await;
    }

    async fn persist(&self, agent: &Agent) {
        if let Some(store) = &self.store {
            match store.update_agent(agent).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(agent_id = %agent.id, "session closed, agent record not persisted")
                }
                Err(e) => {
                    warn!(agent_id = %agent.id, error = %e, "failed to persist agent record")
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn test_agent(balance: f64, holds: f64) -> Agent {
    Agent {
        id: "AG-001".to_string(),
        name: "Test Agent".to_string(),
        phone: "26876000000".to_string(),
        current_balance: balance,
        available_balance: balance - holds,
        holds_balance: holds,
        fund_limit: 10_000.0,
    }
}
