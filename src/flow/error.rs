use crate::flow::state::FlowState;
use crate::payments::PaymentError;
use thiserror::Error;

pub type FlowResult<T> = Result<T, FlowError>;

/// Every way a flow operation can fail. None of these end the flow.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FlowError {
    /// Local input check; no network call was made.
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<&'static str>,
    },

    #[error("Customer lookup failed: {message}")]
    LookupFailed { message: String },

    /// The backend answered and declined the transaction.
    #[error("Transaction declined: {reason}")]
    SoftFailure {
        transaction_id: Option<String>,
        reason: String,
    },

    /// Transport error, timeout or unusable response.
    #[error("Transaction failed: {message}")]
    HardFailure { message: String },

    #[error("Unsupported configuration: {message}")]
    UnsupportedConfiguration { message: String },

    #[error("{operation} is not allowed in state {state}")]
    InvalidState {
        operation: &'static str,
        state: FlowState,
    },

    /// The flow was reset or moved on while the call was in flight; its
    /// result was not applied.
    #[error("Result discarded: the transaction was reset before it completed")]
    Superseded,

    #[error("No wallet selected")]
    MissingWallet { requested: Option<String> },
}

impl FlowError {
    pub fn validation(message: impl Into<String>, field: &'static str) -> Self {
        FlowError::Validation {
            message: message.into(),
            field: Some(field),
        }
    }

    /// Text for the notice shown to the agent.
    pub fn user_message(&self) -> String {
        match self {
            FlowError::Validation { message, .. } => message.clone(),
            FlowError::LookupFailed { message } => message.clone(),
            FlowError::SoftFailure { reason, .. } => reason.clone(),
            FlowError::HardFailure { message } => message.clone(),
            FlowError::UnsupportedConfiguration { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<PaymentError> for FlowError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::ValidationError { message, .. } => FlowError::Validation {
                message,
                field: None,
            },
            PaymentError::Unsupported { message } => {
                FlowError::UnsupportedConfiguration { message }
            }
            other => FlowError::HardFailure {
                message: other.user_message(),
            },
        }
    }
}
