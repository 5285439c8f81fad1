use crate::payments::{CustomerRecord, Direction};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Completion artifact for an accepted transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    pub transaction_id: Option<String>,
    pub direction: Direction,
    pub wallet_id: String,
    pub amount: f64,
    pub balance_after: f64,
    pub customer: Option<CustomerRecord>,
    /// Advisory reason returned alongside the success
    pub reason: Option<String>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Dismissible, non-blocking message for the agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}
