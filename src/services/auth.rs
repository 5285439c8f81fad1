use crate::config::{LedgerApiConfig, MsisdnConfig};
use crate::flow::normalize_msisdn;
use crate::logging::mask_msisdn;
use crate::payments::utils::{Auth, PortalHttpClient};
use crate::payments::{PaymentError, PaymentResult};
use crate::services::unwrap_envelope;
use crate::session::{Agent, Session, SessionContext, SessionStore};
use crate::storage::StorageResult;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(alias = "access_token")]
    token: String,
    agent: Agent,
}

/// OTP login and logout against the ledger-backed API.
pub struct AuthService {
    config: LedgerApiConfig,
    msisdn: MsisdnConfig,
    http: PortalHttpClient,
    store: SessionStore,
}

impl AuthService {
    pub fn new(
        config: LedgerApiConfig,
        msisdn: MsisdnConfig,
        store: SessionStore,
    ) -> PaymentResult<Self> {
        Ok(Self {
            config,
            msisdn,
            http: PortalHttpClient::new()?,
            store,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn normalized(&self, phone: &str) -> PaymentResult<String> {
        normalize_msisdn(phone, &self.msisdn).ok_or(PaymentError::ValidationError {
            message: "Please enter a valid phone number".to_string(),
            field: Some("phone".to_string()),
        })
    }

    /// Ask the backend to send a one-time code to `phone`.
    pub async fn request_otp(&self, phone: &str) -> PaymentResult<()> {
        let msisdn = self.normalized(phone)?;
        let payload = json!({ "phone_number": msisdn });

        let body: JsonValue = self
            .http
            .request_json(
                reqwest::Method::POST,
                &self.endpoint("/auth/request-otp"),
                Auth::None,
                Some(&payload),
                self.config.default_timeout(),
            )
            .await?;
        unwrap_envelope::<JsonValue>(body)?;

        info!(msisdn = %mask_msisdn(&msisdn), "OTP requested");
        Ok(())
    }

    /// Exchange phone and code for a session, persist it and hand back the
    /// context the transaction flow runs against.
    pub async fn verify_otp(&self, phone: &str, code: &str) -> PaymentResult<SessionContext> {
        let msisdn = self.normalized(phone)?;
        let code = code.trim();
        if code.is_empty() {
            return Err(PaymentError::ValidationError {
                message: "Please enter the code you received".to_string(),
                field: Some("otp".to_string()),
            });
        }

        let payload = json!({ "phone_number": msisdn, "otp": code });
        let body: JsonValue = self
            .http
            .request_json(
                reqwest::Method::POST,
                &self.endpoint("/auth/verify-otp"),
                Auth::None,
                Some(&payload),
                self.config.default_timeout(),
            )
            .await?;
        let login: LoginData = unwrap_envelope(body)?;

        let session = Session {
            token: login.token,
            agent: login.agent,
            service_type: None,
        };
        if let Err(e) = self.store.save(&session).await {
            warn!(agent_id = %session.agent.id, error = %e, "failed to persist session");
        }

        info!(agent_id = %session.agent.id, "agent logged in");
        Ok(SessionContext::new(
            session.token,
            session.agent,
            Some(self.store.clone()),
        ))
    }

    /// Forget the persisted session. The context should be dropped after.
    pub async fn logout(&self, ctx: SessionContext) -> StorageResult<()> {
        let agent = ctx.agent().await;
        self.store.clear().await?;
        info!(agent_id = %agent.id, "agent logged out");
        Ok(())
    }

    /// Record the service the agent picked on the dashboard.
    pub async fn select_service(&self, service_type: &str) -> StorageResult<()> {
        self.store.set_service_type(service_type).await
    }
}
