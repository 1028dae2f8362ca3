// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ElevenLabs synthesis adapter for Voxa.
//!
//! Streams encoded audio from the text-to-speech endpoint. Bytes are
//! handed to the caller as they arrive; persistence is the caller's
//! concern (the orchestrator tees non-opus formats to blob storage).

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::io::StreamReader;
use tracing::{debug, warn};
use voxa_core::types::SynthesisRequest;
use voxa_core::{ByteStream, CallCtx, RateLimiter, Synthesizer, VoxaError};

/// Base URL for the ElevenLabs API.
const API_BASE_URL: &str = "https://api.elevenlabs.io";

/// Rate-limit bucket name for synthesis requests.
pub const TTS_BUCKET: &str = "elevenlabs";

#[derive(Debug, Serialize)]
struct ApiSynthesisRequest {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_id: Option<String>,
    voice_settings: ApiVoiceSettings,
}

#[derive(Debug, Serialize)]
struct ApiVoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    detail: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

/// Synthesis adapter over the ElevenLabs streaming endpoint.
#[derive(Clone)]
pub struct ElevenLabsSynthesizer {
    http: reqwest::Client,
    base_url: String,
    model_id: Option<String>,
    limiter: RateLimiter,
    max_retries: u32,
}

impl ElevenLabsSynthesizer {
    pub fn new(
        api_key: &str,
        model_id: Option<String>,
        limiter: RateLimiter,
    ) -> Result<Self, VoxaError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let mut key = reqwest::header::HeaderValue::from_str(api_key)
            .map_err(|e| VoxaError::Config(format!("invalid API key header value: {e}")))?;
        key.set_sensitive(true);
        headers.insert("xi-api-key", key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| VoxaError::Connection {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            http,
            base_url: API_BASE_URL.to_string(),
            model_id,
            limiter,
            max_retries: 1,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn url(&self, request: &SynthesisRequest) -> String {
        format!(
            "{}/v1/text-to-speech/{}/stream?output_format={}&optimize_streaming_latency={}",
            self.base_url, request.voice_id, request.format, request.optimize_stream_latency
        )
    }
}

#[async_trait]
impl Synthesizer for ElevenLabsSynthesizer {
    async fn synthesize(
        &self,
        ctx: &CallCtx,
        request: SynthesisRequest,
    ) -> Result<ByteStream, VoxaError> {
        let api = ApiSynthesisRequest {
            text: request.text.clone(),
            model_id: self.model_id.clone(),
            voice_settings: ApiVoiceSettings {
                stability: request.stability,
                similarity_boost: request.similarity_boost,
                style: request.style_exaggeration,
            },
        };
        let url = self.url(&request);

        let mut last_error: Option<VoxaError> = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying synthesis after transient error");
                ctx.run(tokio::time::sleep(Duration::from_secs(1))).await?;
            }
            self.limiter.wait(ctx, TTS_BUCKET).await?;

            let response = ctx
                .run(self.http.post(&url).json(&api).send())
                .await?
                .map_err(|e| VoxaError::Connection {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, voice_id = %request.voice_id, "synthesis response");

            if status.is_success() {
                let reader = StreamReader::new(
                    response
                        .bytes_stream()
                        .map_err(|e| std::io::Error::other(format!("tts stream: {e}"))),
                );
                return Ok(Box::pin(reader));
            }

            if status.as_u16() == 401 {
                let body = response.text().await.unwrap_or_default();
                return Err(VoxaError::Unauthorized(error_message(&body)));
            }
            // The provider rejects over-long text with a client error; the
            // orchestrator speaks the canned "answer too long" response.
            if matches!(status.as_u16(), 400 | 413 | 422) {
                let body = response.text().await.unwrap_or_default();
                return Err(VoxaError::Limit(error_message(&body)));
            }

            let body = response.text().await.unwrap_or_default();
            if (status.as_u16() == 429 || status.is_server_error()) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(VoxaError::connection(error_message(&body)));
                continue;
            }
            return Err(VoxaError::connection(format!("API returned {status}: {body}")));
        }

        Err(last_error.unwrap_or_else(|| VoxaError::connection("synthesis failed after retries")))
    }
}

fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorDetail>(body) {
        format!("{}: {}", parsed.detail.status, parsed.detail.message)
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use voxa_core::types::OutputFormat;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn synthesizer(base: &str) -> ElevenLabsSynthesizer {
        ElevenLabsSynthesizer::new("xi-test", Some("eleven_turbo_v2".into()), RateLimiter::new())
            .unwrap()
            .with_base_url(base)
    }

    fn request() -> SynthesisRequest {
        SynthesisRequest {
            text: "I am the night.".into(),
            voice_id: "voice-1".into(),
            language: "en-US".into(),
            format: OutputFormat::Mp3_44100_128,
            optimize_stream_latency: 2,
            stability: 0.5,
            similarity_boost: 0.75,
            style_exaggeration: 0.0,
        }
    }

    #[tokio::test]
    async fn synthesize_streams_audio_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice-1/stream"))
            .and(query_param("output_format", "mp3_44100_128"))
            .and(query_param("optimize_streaming_latency", "2"))
            .and(header("xi-api-key", "xi-test"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(b"mp3-bytes-here".to_vec()),
            )
            .mount(&server)
            .await;

        let ctx = CallCtx::unbounded();
        let mut stream = synthesizer(&server.uri())
            .synthesize(&ctx, request())
            .await
            .unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"mp3-bytes-here");
    }

    #[tokio::test]
    async fn over_long_text_maps_to_limit() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "detail": {"status": "max_character_limit_exceeded", "message": "too long"}
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(&body))
            .mount(&server)
            .await;

        let ctx = CallCtx::unbounded();
        let err = synthesizer(&server.uri())
            .synthesize(&ctx, request())
            .await
            .err()
            .unwrap();
        match err {
            VoxaError::Limit(msg) => assert!(msg.contains("max_character_limit_exceeded")),
            other => panic!("expected Limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn retries_once_on_503_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .mount(&server)
            .await;

        let ctx = CallCtx::unbounded();
        let mut stream = synthesizer(&server.uri())
            .synthesize(&ctx, request())
            .await
            .unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"ok");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_the_taxonomy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let ctx = CallCtx::unbounded();
        let err = synthesizer(&server.uri())
            .synthesize(&ctx, request())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, VoxaError::Unauthorized(_)));
    }
}
