// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP plumbing shared by the chat, transcription, and classification
//! adapters: authentication, per-model rate limiting, transient retry,
//! and error mapping.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{debug, warn};
use voxa_core::{CallCtx, RateLimiter, VoxaError};

use crate::types::ApiErrorResponse;

/// Base URL for the OpenAI API.
const API_BASE_URL: &str = "https://api.openai.com";

/// HTTP client for OpenAI API communication.
///
/// Retries once on transient errors (429, 5xx) after a 1-second delay and
/// maps 401 to `Unauthorized`.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
    max_retries: u32,
}

impl OpenAiClient {
    pub fn new(api_key: &str, limiter: RateLimiter) -> Result<Self, VoxaError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| VoxaError::Config(format!("invalid API key header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| VoxaError::Connection {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            http,
            base_url: API_BASE_URL.to_string(),
            limiter,
            max_retries: 1,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sends a request built by `make`, retrying once on transient
    /// failures. The rate-limit bucket named `bucket` is awaited first.
    pub async fn send<F>(
        &self,
        ctx: &CallCtx,
        bucket: &str,
        make: F,
    ) -> Result<reqwest::Response, VoxaError>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut last_error: Option<VoxaError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying request after transient error");
                ctx.run(tokio::time::sleep(Duration::from_secs(1))).await?;
            }
            self.limiter.wait(ctx, bucket).await?;

            let response = ctx
                .run(make(&self.http).send())
                .await?
                .map_err(|e| VoxaError::Connection {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "provider response received");

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::UNAUTHORIZED {
                let body = response.text().await.unwrap_or_default();
                return Err(VoxaError::Unauthorized(api_error_message(status, &body)));
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(VoxaError::connection(api_error_message(status, &body)));
                continue;
            }

            return Err(VoxaError::connection(api_error_message(status, &body)));
        }

        Err(last_error
            .unwrap_or_else(|| VoxaError::connection("request failed after retries")))
    }

    /// Sends a single non-retryable request (streaming bodies cannot be
    /// replayed). Rate limiting and error mapping match [`Self::send`].
    pub async fn send_once(
        &self,
        ctx: &CallCtx,
        bucket: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, VoxaError> {
        self.limiter.wait(ctx, bucket).await?;

        let response = ctx
            .run(request.send())
            .await?
            .map_err(|e| VoxaError::Connection {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "provider response received");
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(VoxaError::Unauthorized(api_error_message(status, &body)));
        }
        let body = response.text().await.unwrap_or_default();
        Err(VoxaError::connection(api_error_message(status, &body)))
    }

    /// The raw reqwest client, for adapters that build their own requests.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

/// True for HTTP status codes worth one retry.
fn is_transient(status: StatusCode) -> bool {
    status.as_u16() == 429 || status.is_server_error()
}

fn api_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(body) {
        format!("API error ({}): {}", api_err.error.type_, api_err.error.message)
    } else {
        format!("API returned {status}: {body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: &str) -> OpenAiClient {
        OpenAiClient::new("sk-test", RateLimiter::new())
            .unwrap()
            .with_base_url(base)
    }

    #[tokio::test]
    async fn sends_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/ping"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let c = client(&server.uri());
        let ctx = CallCtx::unbounded();
        let url = c.url("/v1/ping");
        let resp = c.send(&ctx, "ping", |http| http.get(&url)).await.unwrap();
        assert!(resp.status().is_success());
    }

    #[tokio::test]
    async fn retries_once_on_429() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let c = client(&server.uri());
        let ctx = CallCtx::unbounded();
        let url = c.url("/");
        let resp = c.send(&ctx, "m", |http| http.get(&url)).await.unwrap();
        assert!(resp.status().is_success());
    }

    #[tokio::test]
    async fn unauthorized_maps_to_the_taxonomy() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "error": {"type": "invalid_api_key", "message": "bad key"}
        });
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(&body))
            .mount(&server)
            .await;

        let c = client(&server.uri());
        let ctx = CallCtx::unbounded();
        let url = c.url("/");
        let err = c.send(&ctx, "m", |http| http.get(&url)).await.unwrap_err();
        match err {
            VoxaError::Unauthorized(msg) => assert!(msg.contains("invalid_api_key")),
            other => panic!("expected Unauthorized, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exhausted_retries_surface_connection_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(2)
            .mount(&server)
            .await;

        let c = client(&server.uri());
        let ctx = CallCtx::unbounded();
        let url = c.url("/");
        let err = c.send(&ctx, "m", |http| http.get(&url)).await.unwrap_err();
        assert!(matches!(err, VoxaError::Connection { .. }));
    }
}
