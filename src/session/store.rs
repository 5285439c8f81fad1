use super::{Agent, Session};
use crate::storage::{KeyValueStore, StorageResult};
use std::sync::Arc;
use tracing::{info, warn};

const TOKEN_KEY: &str = "token";
const AGENT_KEY: &str = "agent";
const SERVICE_TYPE_KEY: &str = "service_type";

/// Session-scoped persistence for the token, agent record and service type.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn save(&self, session: &Session) -> StorageResult<()> {
        self.store.set(TOKEN_KEY, &session.token).await?;
        self.save_agent(&session.agent).await?;
        match &session.service_type {
            Some(service_type) => self.store.set(SERVICE_TYPE_KEY, service_type).await?,
            None => self.store.remove(SERVICE_TYPE_KEY).await?,
        }
        info!(agent_id = %session.agent.id, "session saved");
        Ok(())
    }

    pub async fn save_agent(&self, agent: &Agent) -> StorageResult<()> {
        let serialized = serde_json::to_string(agent)?;
        self.store.set(AGENT_KEY, &serialized).await
    }

    /// Rewrite the agent record of a live session. Returns `false` without
    /// writing once the token is gone.
    pub async fn update_agent(&self, agent: &Agent) -> StorageResult<bool> {
        if self.store.get(TOKEN_KEY).await?.is_none() {
            return Ok(false);
        }
        self.save_agent(agent).await?;
        Ok(true)
    }

    pub async fn set_service_type(&self, service_type: &str) -> StorageResult<()> {
        self.store.set(SERVICE_TYPE_KEY, service_type).await
    }

    /// Load the persisted session; `None` when absent or unreadable.
    pub async fn load(&self) -> Option<Session> {
        let token = self.store.get(TOKEN_KEY).await.ok().flatten()?;
        let raw_agent = self.store.get(AGENT_KEY).await.ok().flatten()?;
        let agent = match serde_json::from_str::<Agent>(&raw_agent) {
            Ok(agent) => agent,
            Err(e) => {
                warn!(error = %e, "stored agent record is unreadable");
                return None;
            }
        };
        let service_type = self.store.get(SERVICE_TYPE_KEY).await.ok().flatten();

        Some(Session {
            token,
            agent,
            service_type,
        })
    }

    /// Logout: forget everything session-scoped.
    pub async fn clear(&self) -> StorageResult<()> {
        self.store.clear().await
    }
}
