use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::errors::ProviderError;
use crate::providers::{Provider, TranslationRequest, TranslationResponse};

/// Client for the Google-Translate-compatible `translate_a/single` endpoint
#[derive(Debug)]
pub struct GoogleTranslate {
    /// HTTP client
    client: Client,
    /// Full URL of the translate route
    url: Url,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
}

impl GoogleTranslate {
    /// Create a client for `endpoint` (scheme and host, e.g. `https://translate.googleapis.com`)
    pub fn new(endpoint: &str) -> Result<Self, ProviderError> {
        Self::new_with_config(endpoint, Duration::from_secs(30), 2, 500)
    }

    /// Create a client with explicit timeout and retry policy
    pub fn new_with_config(
        endpoint: &str,
        timeout: Duration,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ProviderError> {
        let base = Url::parse(endpoint)
            .map_err(|e| ProviderError::ConnectionError(format!("Invalid endpoint {}: {}", endpoint, e)))?;
        let url = base
            .join("translate_a/single")
            .map_err(|e| ProviderError::ConnectionError(format!("Invalid endpoint {}: {}", endpoint, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            url,
            max_retries,
            backoff_base_ms,
        })
    }

    /// URL for one request
    pub fn request_url(&self, request: &TranslationRequest) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("client", "gtx")
            .append_pair("sl", &request.source_language)
            .append_pair("tl", &request.target_language)
            .append_pair("dt", "t")
            .append_pair("q", &request.text);
        url
    }

    /// Concatenate the translated segments `[0][i][0]` of a response body
    pub fn parse_response(body: &Value) -> Result<String, ProviderError> {
        let segments = body
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::ParseError("missing segment list".to_string()))?;

        let text: String = segments
            .iter()
            .filter_map(|segment| segment.get(0).and_then(Value::as_str))
            .collect();

        Ok(text)
    }

    /// One attempt, with a flag telling whether a failure may be retried
    async fn attempt(&self, request: &TranslationRequest) -> Result<String, (ProviderError, bool)> {
        let response = self
            .client
            .get(self.request_url(request))
            .send()
            .await
            .map_err(|e| (ProviderError::RequestFailed(e.to_string()), true))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err((ProviderError::RateLimitExceeded(status.to_string()), true));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            let error = ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            };
            // Server error - can retry, client error - don't
            return Err((error, status.is_server_error()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| (ProviderError::ParseError(e.to_string()), false))?;
        Self::parse_response(&body).map_err(|e| (e, false))
    }
}

#[async_trait]
impl Provider for GoogleTranslate {
    async fn complete(&self, request: TranslationRequest) -> Result<TranslationResponse, ProviderError> {
        let mut attempt = 0;

        loop {
            match self.attempt(&request).await {
                Ok(text) => return Ok(TranslationResponse { text }),
                Err((e, retryable)) => {
                    if !retryable || attempt >= self.max_retries {
                        error!("Translation request failed after {} attempt(s): {}", attempt + 1, e);
                        return Err(e);
                    }
                    debug!("Translation attempt {}/{} failed: {}", attempt + 1, self.max_retries + 1, e);
                }
            }

            attempt += 1;

            // Exponential backoff before the next try
            let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 1).min(16));
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.complete(TranslationRequest::new("hello", "en", "fr"))
            .await
            .map(|_| ())
    }
}
