use serde_json::Value as JsonValue;
use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        field: Option<String>,
    },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Request timed out after {timeout_secs}s: {message}")]
    TimeoutError { message: String, timeout_secs: u64 },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    /// Non-2xx response. `message` is already extracted from the structured
    /// body; `body` keeps the raw payload for reason extraction upstream.
    #[error("Provider error: status={status}, message={message}")]
    ApiError {
        status: u16,
        message: String,
        body: Option<JsonValue>,
    },

    #[error("Malformed provider response: {message}")]
    MalformedResponse { message: String },

    #[error("Unsupported configuration: {message}")]
    Unsupported { message: String },
}

impl PaymentError {
    /// Informational only: the transaction flow never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::ValidationError { .. } => false,
            PaymentError::Unauthorized { .. } => false,
            PaymentError::TimeoutError { .. } => true,
            PaymentError::NetworkError { .. } => true,
            PaymentError::ApiError { status, .. } => *status >= 500 || *status == 429,
            PaymentError::MalformedResponse { .. } => false,
            PaymentError::Unsupported { .. } => false,
        }
    }

    /// Human-readable description, never a raw payload.
    pub fn user_message(&self) -> String {
        match self {
            PaymentError::ValidationError { message, .. } => message.clone(),
            PaymentError::Unauthorized { .. } => {
                "Your session has expired. Please log in again".to_string()
            }
            PaymentError::TimeoutError { .. } => {
                "The request timed out. Please check the transaction history before retrying"
                    .to_string()
            }
            PaymentError::NetworkError { .. } => {
                "Payment service is temporarily unavailable".to_string()
            }
            PaymentError::ApiError { message, .. } => message.clone(),
            PaymentError::MalformedResponse { .. } => {
                "Payment service returned an unexpected response".to_string()
            }
            PaymentError::Unsupported { message } => message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_flags_are_set() {
        assert!(PaymentError::NetworkError {
            message: "connection reset".to_string()
        }
        .is_retryable());
        assert!(PaymentError::ApiError {
            status: 503,
            message: "down".to_string(),
            body: None
        }
        .is_retryable());
        assert!(!PaymentError::ApiError {
            status: 400,
            message: "bad".to_string(),
            body: None
        }
        .is_retryable());
    }

    #[test]
    fn user_message_uses_extracted_api_message() {
        let err = PaymentError::ApiError {
            status: 404,
            message: "Customer not found".to_string(),
            body: Some(serde_json::json!({"error": "Customer not found"})),
        };
        assert_eq!(err.user_message(), "Customer not found");
    }

    #[test]
    fn user_message_hides_transport_details() {
        let err = PaymentError::MalformedResponse {
            message: "expected value at line 1 column 1".to_string(),
        };
        assert!(!err.user_message().contains("line 1"));
    }
}
