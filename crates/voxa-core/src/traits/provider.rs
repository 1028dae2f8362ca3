// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The four external capabilities the turn pipeline consumes.
//!
//! Each provider is a variant implementing one or more of these traits;
//! the orchestrator is polymorphic over the capability set. Every method
//! takes a [`CallCtx`] and must return promptly on cancellation.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::ctx::CallCtx;
use crate::error::VoxaError;
use crate::types::{
    ChatRequest, ChatResponse, Classification, SttFormat, SynthesisRequest, Transcript,
};

/// A boxed async byte stream, used for audio in and audio out.
pub type ByteStream = Pin<Box<dyn tokio::io::AsyncRead + Send>>;

/// A stream of raw content deltas from a streaming chat call (no framing).
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<String, VoxaError>> + Send>>;

/// Audio → text plus detected language.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Reads `audio` to EOF and returns the transcript.
    ///
    /// Callers wanting the audio persisted during recognition tee the
    /// stream before handing one side to this method.
    async fn transcribe(
        &self,
        ctx: &CallCtx,
        audio: ByteStream,
        format: SttFormat,
        language_hint: Option<&str>,
    ) -> Result<Transcript, VoxaError>;
}

/// Chat messages → assistant text plus token counts.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Sends a chat request and returns the full response.
    async fn complete(&self, ctx: &CallCtx, request: ChatRequest)
        -> Result<ChatResponse, VoxaError>;

    /// Sends a chat request and returns a stream of content deltas.
    async fn stream(&self, ctx: &CallCtx, request: ChatRequest)
        -> Result<ChatStream, VoxaError>;
}

/// Text plus voice parameters → encoded audio byte stream.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        ctx: &CallCtx,
        request: SynthesisRequest,
    ) -> Result<ByteStream, VoxaError>;
}

/// Text → category flags, scores, and age/toxicity analysis.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        ctx: &CallCtx,
        text: &str,
        locale: &str,
    ) -> Result<Classification, VoxaError>;
}
