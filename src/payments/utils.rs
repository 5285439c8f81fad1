use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::types::extract_error_message;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, warn};

const API_KEY_HEADER: &str = "x-api-key";

/// Credentials attached to one request.
#[derive(Debug, Clone, Copy)]
pub enum Auth<'a> {
    None,
    Bearer(&'a str),
    ApiKey(&'a str),
}

/// Raw reply: HTTP status plus the body, parsed when it is JSON.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: Option<JsonValue>,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Thin JSON-over-HTTP client shared by every backend adapter.
///
/// Requests are never retried here: a resubmission is always a user action.
#[derive(Clone)]
pub struct PortalHttpClient {
    client: Client,
}

impl PortalHttpClient {
    pub fn new() -> PaymentResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| PaymentError::NetworkError {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    /// Send one request and return whatever came back, whatever the status.
    ///
    /// Only transport failures (connect, timeout, unreadable body) are errors.
    pub async fn send_json(
        &self,
        method: reqwest::Method,
        url: &str,
        auth: Auth<'_>,
        body: Option<&JsonValue>,
        timeout: Duration,
    ) -> PaymentResult<HttpReply> {
        let mut request = self.client.request(method.clone(), url).timeout(timeout);

        request = match auth {
            Auth::None => request,
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::ApiKey(key) => request.header(API_KEY_HEADER, key),
        };
        if let Some(payload) = body {
            request = request.json(payload);
        }

        debug!(method = %method, url, timeout_secs = timeout.as_secs(), "sending request");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                PaymentError::TimeoutError {
                    message: format!("{} {} timed out", method, url),
                    timeout_secs: timeout.as_secs(),
                }
            } else {
                PaymentError::NetworkError {
                    message: format!("request to {} failed: {}", url, e),
                }
            }
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                PaymentError::TimeoutError {
                    message: format!("{} {} timed out reading body", method, url),
                    timeout_secs: timeout.as_secs(),
                }
            } else {
                PaymentError::NetworkError {
                    message: format!("failed to read response body: {}", e),
                }
            }
        })?;

        let body = if text.trim().is_empty() {
            None
        } else {
            match serde_json::from_str::<JsonValue>(&text) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(status, url, "response body is not JSON");
                    None
                }
            }
        };

        debug!(status, url, "received response");
        Ok(HttpReply { status, body })
    }

    /// Send one request and decode a 2xx body into `T`.
    ///
    /// Non-2xx replies become [`PaymentError::ApiError`] (or `Unauthorized`
    /// for 401) with the message extracted from the structured body.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: &str,
        auth: Auth<'_>,
        body: Option<&JsonValue>,
        timeout: Duration,
    ) -> PaymentResult<T> {
        let reply = self.send_json(method, url, auth, body, timeout).await?;
        decode_reply(reply)
    }
}

/// Turn a raw reply into `T` or the matching error.
pub fn decode_reply<T: DeserializeOwned>(reply: HttpReply) -> PaymentResult<T> {
    if !reply.is_success() {
        let message = extract_error_message(
            reply.body.as_ref(),
            &format!("Request failed with status {}", reply.status),
        );
        if reply.status == 401 {
            return Err(PaymentError::Unauthorized { message });
        }
        return Err(PaymentError::ApiError {
            status: reply.status,
            message,
            body: reply.body,
        });
    }

    let body = reply.body.ok_or(PaymentError::MalformedResponse {
        message: "empty response body".to_string(),
    })?;
    serde_json::from_value::<T>(body).map_err(|e| PaymentError::MalformedResponse {
        message: format!("invalid JSON response: {}", e),
    })
}
