// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI provider adapter for Voxa.
//!
//! Implements three of the four capabilities: chat (with SSE streaming),
//! transcription (streaming multipart upload), and classification.

pub mod chat;
pub mod client;
pub mod moderation;
pub mod stt;
pub mod types;

pub use chat::OpenAiChat;
pub use client::OpenAiClient;
pub use moderation::{CLASSIFY_BUCKET, OpenAiClassifier};
pub use stt::{OpenAiTranscriber, STT_BUCKET};
