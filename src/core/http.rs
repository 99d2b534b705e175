use crate::config::HttpConfig;
use crate::error::{ApiError, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("trendpro/", env!("CARGO_PKG_VERSION"));
const API_KEY_HEADER: &str = "X-Goog-Api-Key";

/// Shared client for the Google APIs: one timeout for every request and a
/// bounded retry for idempotent reads.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// GET with the key in a header, retried on transient failures.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        api_key: &str,
    ) -> std::result::Result<T, ApiError> {
        let mut attempt = 0;
        loop {
            let request = self
                .client
                .get(url)
                .query(query)
                .header(API_KEY_HEADER, api_key);

            match send_json(request).await {
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(url, attempt, kind = err.kind(), "retrying request: {err}");
                    tokio::time::sleep(self.retry_delay).await;
                }
                other => return other,
            }
        }
    }

    /// POST a JSON body once. Generation calls are not retried.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
        api_key: &str,
    ) -> std::result::Result<T, ApiError> {
        let request = self
            .client
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(body);
        send_json(request).await
    }
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> std::result::Result<T, ApiError> {
    let response = request.send().await.map_err(|e| ApiError::from(e.without_url()))?;
    let status = response.status();
    debug!(status = status.as_u16(), "upstream response");

    if !status.is_success() {
        return Err(classify_failure(response).await);
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::from(e.without_url()))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Parse(e.to_string()))
}

async fn classify_failure(response: Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let (reason, message) = parse_error_body(&body);
    ApiError::from_status(status, reason.as_deref(), message)
}

/// Pull `(reason, message)` out of a Google error envelope, falling back to
/// the raw body.
fn parse_error_body(body: &str) -> (Option<String>, String) {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let reason = envelope
                .error
                .errors
                .into_iter()
                .find_map(|detail| detail.reason);
            (reason, envelope.error.message)
        }
        Err(_) => (None, body.trim().chars().take(200).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_error_body;

    #[test]
    fn reads_reason_and_message_from_envelope() {
        let body = r#"{"error":{"code":403,"message":"quota gone","errors":[{"domain":"youtube.quota","reason":"quotaExceeded"}]}}"#;
        let (reason, message) = parse_error_body(body);
        assert_eq!(reason.as_deref(), Some("quotaExceeded"));
        assert_eq!(message, "quota gone");
    }

    #[test]
    fn gemini_envelope_without_errors_list() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        let (reason, message) = parse_error_body(body);
        assert_eq!(reason, None);
        assert_eq!(message, "API key not valid.");
    }

    #[test]
    fn non_json_body_is_kept_as_message() {
        let (reason, message) = parse_error_body("  Bad Gateway  ");
        assert_eq!(reason, None);
        assert_eq!(message, "Bad Gateway");
    }
}
