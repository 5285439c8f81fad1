//! Process-wide wiring: configuration, durable stores, adapters and services.

use crate::config::PortalConfig;
use crate::error::PortalResult;
use crate::flow::{Direction, FlowContext, FlowResult, TransactionFlow};
use crate::logging::init_tracing;
use crate::payments::AdapterFactory;
use crate::reasons::FailureReasonLedger;
use crate::services::{AccountService, AuthService};
use crate::session::{SessionContext, SessionStore};
use crate::storage::JsonFileStore;
use crate::wallets::WalletRegistry;
use std::sync::Arc;
use tracing::info;

/// Everything a front end needs, built once at startup.
#[derive(Clone)]
pub struct Portal {
    config: PortalConfig,
    registry: WalletRegistry,
    adapters: AdapterFactory,
    sessions: SessionStore,
    reasons: FailureReasonLedger,
}

impl Portal {
    /// Load configuration from the environment, install tracing and open the
    /// session and failure-reason stores.
    pub async fn from_env() -> PortalResult<Self> {
        let config = PortalConfig::from_env()?;
        config.validate()?;
        init_tracing(&config.logging);
        Self::bootstrap(config).await
    }

    pub async fn bootstrap(config: PortalConfig) -> PortalResult<Self> {
        let session_store = JsonFileStore::open(&config.storage.session_path).await?;
        let reason_store = JsonFileStore::open(&config.storage.reasons_path).await?;

        info!(
            ledger_api = %config.ledger_api.base_url,
            voucher_api = %config.voucher_api.base_url,
            sessions = %session_store.path().display(),
            reasons = %reason_store.path().display(),
            "portal initialized"
        );

        Ok(Self {
            registry: WalletRegistry::builtin(),
            adapters: AdapterFactory::from_config(&config),
            sessions: SessionStore::new(Arc::new(session_store)),
            reasons: FailureReasonLedger::new(Arc::new(reason_store)),
            config,
        })
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn wallets(&self) -> &WalletRegistry {
        &self.registry
    }

    pub fn reasons(&self) -> &FailureReasonLedger {
        &self.reasons
    }

    /// Pick up a session persisted by an earlier run.
    pub async fn restore_session(&self) -> Option<SessionContext> {
        SessionContext::restore(self.sessions.clone()).await
    }

    pub fn auth(&self) -> PortalResult<AuthService> {
        Ok(AuthService::new(
            self.config.ledger_api.clone(),
            self.config.msisdn.clone(),
            self.sessions.clone(),
        )?)
    }

    pub fn account(&self, session: &SessionContext) -> PortalResult<AccountService> {
        Ok(AccountService::new(
            self.config.ledger_api.clone(),
            session.clone(),
            self.reasons.clone(),
        )?)
    }

    /// Start a cash-in or cash-out flow for the wallet the agent picked.
    pub fn start_flow(
        &self,
        wallet_id: Option<&str>,
        direction: Direction,
        session: &SessionContext,
    ) -> FlowResult<TransactionFlow> {
        TransactionFlow::enter(
            &self.registry,
            wallet_id,
            direction,
            FlowContext {
                session: session.clone(),
                adapters: Arc::new(self.adapters.clone()),
                reasons: self.reasons.clone(),
                msisdn: self.config.msisdn.clone(),
            },
        )
    }
}
