//! Top-level error handling for the CICO portal core
//!
//! Each layer keeps its own error type; [`PortalError`] unifies them for
//! embedders and maps every failure to a stable [`ErrorCode`] and a message
//! that is safe to show to an agent.

use crate::config::ConfigError;
use crate::flow::FlowError;
use crate::payments::PaymentError;
use crate::storage::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Local
    ValidationError,
    InvalidState,
    WalletNotSelected,
    UnsupportedConfiguration,
    ConfigurationError,
    StorageError,

    // Backend
    SessionExpired,
    CustomerLookupFailed,
    TransactionDeclined,
    PaymentProviderError,
    ExternalServiceTimeout,
    NetworkError,
    ResultDiscarded,
}

#[derive(Debug, Error)]
pub enum PortalError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Flow(#[from] FlowError),
}

impl PortalError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            PortalError::Config(_) => ErrorCode::ConfigurationError,
            PortalError::Storage(_) => ErrorCode::StorageError,
            PortalError::Payment(err) => match err {
                PaymentError::ValidationError { .. } => ErrorCode::ValidationError,
                PaymentError::Unauthorized { .. } => ErrorCode::SessionExpired,
                PaymentError::TimeoutError { .. } => ErrorCode::ExternalServiceTimeout,
                PaymentError::NetworkError { .. } => ErrorCode::NetworkError,
                PaymentError::ApiError { .. } => ErrorCode::PaymentProviderError,
                PaymentError::MalformedResponse { .. } => ErrorCode::PaymentProviderError,
                PaymentError::Unsupported { .. } => ErrorCode::UnsupportedConfiguration,
            },
            PortalError::Flow(err) => match err {
                FlowError::Validation { .. } => ErrorCode::ValidationError,
                FlowError::LookupFailed { .. } => ErrorCode::CustomerLookupFailed,
                FlowError::SoftFailure { .. } => ErrorCode::TransactionDeclined,
                FlowError::HardFailure { .. } => ErrorCode::PaymentProviderError,
                FlowError::UnsupportedConfiguration { .. } => ErrorCode::UnsupportedConfiguration,
                FlowError::InvalidState { .. } => ErrorCode::InvalidState,
                FlowError::Superseded => ErrorCode::ResultDiscarded,
                FlowError::MissingWallet { .. } => ErrorCode::WalletNotSelected,
            },
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PortalError::Config(_) => {
                "The portal is misconfigured. Please contact support".to_string()
            }
            PortalError::Storage(_) => "Local storage is unavailable".to_string(),
            PortalError::Payment(err) => err.user_message(),
            PortalError::Flow(err) => err.user_message(),
        }
    }

    /// Informational only: nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            PortalError::Payment(err) => err.is_retryable(),
            PortalError::Flow(FlowError::HardFailure { .. }) => true,
            PortalError::Storage(StorageError::Io(_)) => true,
            _ => false,
        }
    }
}

pub type PortalResult<T> = Result<T, PortalError>;
