// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock implementations of the four capabilities and the email transport,
//! for deterministic, CI-runnable tests without external services.
//!
//! Responses pop from FIFO queues; empty queues return sensible defaults.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;

use voxa_core::types::{
    ChatRequest, ChatResponse, Classification, SttFormat, SynthesisRequest, TokenUsage,
    Transcript,
};
use voxa_core::{
    ByteStream, CallCtx, ChatProvider, ChatStream, Classifier, EmailMessage, EmailTransport,
    Synthesizer, Transcriber, VoxaError,
};

/// A mock chat provider returning queued responses.
///
/// When the queue is empty a default "mock response" is returned. Requests
/// are recorded for assertions.
pub struct MockChat {
    responses: Arc<Mutex<VecDeque<Result<String, VoxaError>>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockChat {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_responses(responses: Vec<&str>) -> Self {
        let mock = Self::new();
        {
            let queue = mock.responses.clone();
            let mut guard = queue.try_lock().expect("fresh mock");
            for r in responses {
                guard.push_back(Ok(r.to_string()));
            }
        }
        mock
    }

    pub async fn push_response(&self, text: &str) {
        self.responses.lock().await.push_back(Ok(text.to_string()));
    }

    pub async fn push_error(&self, error: VoxaError) {
        self.responses.lock().await.push_back(Err(error));
    }

    /// Requests seen so far, oldest first.
    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }

    async fn next(&self) -> Result<String, VoxaError> {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok("mock response".to_string()))
    }
}

impl Default for MockChat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for MockChat {
    async fn complete(
        &self,
        _ctx: &CallCtx,
        request: ChatRequest,
    ) -> Result<ChatResponse, VoxaError> {
        self.requests.lock().await.push(request);
        let text = self.next().await?;
        Ok(ChatResponse {
            text,
            finish_reason: Some("stop".to_string()),
            usage: TokenUsage { prompt: 10, response: 20 },
        })
    }

    async fn stream(&self, _ctx: &CallCtx, request: ChatRequest) -> Result<ChatStream, VoxaError> {
        self.requests.lock().await.push(request);
        let text = self.next().await?;
        // Split into word-sized deltas so consumers exercise reassembly.
        let deltas: Vec<Result<String, VoxaError>> = text
            .split_inclusive(' ')
            .map(|s| Ok(s.to_string()))
            .collect();
        Ok(Box::pin(stream::iter(deltas)))
    }
}

/// A mock transcriber that drains the audio stream and pops queued
/// transcripts. An empty queue echoes a fixed utterance.
pub struct MockTranscriber {
    transcripts: Arc<Mutex<VecDeque<Transcript>>>,
    /// Total bytes drained across all calls.
    bytes_seen: Arc<Mutex<u64>>,
}

impl MockTranscriber {
    pub fn new() -> Self {
        Self {
            transcripts: Arc::new(Mutex::new(VecDeque::new())),
            bytes_seen: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_transcripts(texts: Vec<&str>) -> Self {
        let mock = Self::new();
        let mut guard = mock.transcripts.try_lock().expect("fresh mock");
        for t in texts {
            guard.push_back(Transcript {
                text: t.to_string(),
                detected_language: Some("en".to_string()),
            });
        }
        drop(guard);
        mock
    }

    pub async fn push_transcript(&self, text: &str, language: Option<&str>) {
        self.transcripts.lock().await.push_back(Transcript {
            text: text.to_string(),
            detected_language: language.map(str::to_string),
        });
    }

    pub async fn bytes_seen(&self) -> u64 {
        *self.bytes_seen.lock().await
    }
}

impl Default for MockTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(
        &self,
        _ctx: &CallCtx,
        mut audio: ByteStream,
        _format: SttFormat,
        _language_hint: Option<&str>,
    ) -> Result<Transcript, VoxaError> {
        // Reads to EOF like a real recognizer, so tee contracts hold.
        let mut sink = Vec::new();
        audio
            .read_to_end(&mut sink)
            .await
            .map_err(|e| VoxaError::connection(format!("mock stt read: {e}")))?;
        *self.bytes_seen.lock().await += sink.len() as u64;

        Ok(self.transcripts.lock().await.pop_front().unwrap_or(Transcript {
            text: "mock utterance".to_string(),
            detected_language: Some("en".to_string()),
        }))
    }
}

/// A mock synthesizer that yields the spoken text as bytes, prefixed with
/// the voice id so tests can assert which voice and text were spoken.
pub struct MockSynthesizer {
    requests: Arc<Mutex<Vec<SynthesisRequest>>>,
    fail_with: Arc<Mutex<Option<VoxaError>>>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            fail_with: Arc::new(Mutex::new(None)),
        }
    }

    /// The next synthesize call fails with `error`.
    pub async fn fail_next(&self, error: VoxaError) {
        *self.fail_with.lock().await = Some(error);
    }

    pub async fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        _ctx: &CallCtx,
        request: SynthesisRequest,
    ) -> Result<ByteStream, VoxaError> {
        if let Some(error) = self.fail_with.lock().await.take() {
            return Err(error);
        }
        let bytes = format!("[{}] {}", request.voice_id, request.text).into_bytes();
        self.requests.lock().await.push(request);
        Ok(Box::pin(std::io::Cursor::new(bytes)))
    }
}

/// A mock classifier returning queued classifications; the default result
/// trips nothing.
pub struct MockClassifier {
    results: Arc<Mutex<VecDeque<Classification>>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self { results: Arc::new(Mutex::new(VecDeque::new())) }
    }

    pub async fn push_result(&self, classification: Classification) {
        self.results.lock().await.push_back(classification);
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(
        &self,
        _ctx: &CallCtx,
        _text: &str,
        _locale: &str,
    ) -> Result<Classification, VoxaError> {
        Ok(self.results.lock().await.pop_front().unwrap_or_default())
    }
}

/// An email transport that captures messages instead of sending them.
pub struct MockEmailTransport {
    pub sent: Arc<Mutex<Vec<EmailMessage>>>,
}

impl MockEmailTransport {
    pub fn new() -> Self {
        Self { sent: Arc::new(Mutex::new(Vec::new())) }
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }
}

impl Default for MockEmailTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailTransport for MockEmailTransport {
    async fn send(&self, message: EmailMessage) -> Result<(), VoxaError> {
        self.sent.lock().await.push(message);
        Ok(())
    }
}
