// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Voxa workspace.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

/// Unique identifier for a profile within an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileId(pub String);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Output audio formats the synthesis pipeline can produce.
///
/// `opus_16000` is passed through raw from the provider; the other formats
/// may be tee-persisted to blob storage while streaming to the client.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum OutputFormat {
    #[strum(serialize = "mp3_44100_128")]
    #[serde(rename = "mp3_44100_128")]
    Mp3_44100_128,
    #[strum(serialize = "pcm_16000")]
    #[serde(rename = "pcm_16000")]
    Pcm16000,
    #[strum(serialize = "opus_16000")]
    #[serde(rename = "opus_16000")]
    Opus16000,
}

impl OutputFormat {
    /// File extension used for blob paths.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Mp3_44100_128 => "mp3",
            OutputFormat::Pcm16000 => "pcm",
            OutputFormat::Opus16000 => "opus",
        }
    }

    /// Content-Type header value for streamed responses.
    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Mp3_44100_128 => "audio/mpeg",
            OutputFormat::Pcm16000 => "audio/L16; rate=16000",
            OutputFormat::Opus16000 => "audio/ogg; codecs=opus",
        }
    }

    /// True when the stream is handed to the client raw, with no
    /// persist-to-blob side task.
    pub fn is_passthrough(self) -> bool {
        matches!(self, OutputFormat::Opus16000)
    }
}

/// Input audio container formats accepted by the transcription stage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SttFormat {
    Mp3,
    Mp4,
    Mpeg,
    Mpga,
    M4a,
    Wav,
    Webm,
    Flac,
    Ogg,
}

impl SttFormat {
    /// File extension used for blob paths (same as the tag).
    pub fn extension(self) -> &'static str {
        match self {
            SttFormat::Mp3 => "mp3",
            SttFormat::Mp4 => "mp4",
            SttFormat::Mpeg => "mpeg",
            SttFormat::Mpga => "mpga",
            SttFormat::M4a => "m4a",
            SttFormat::Wav => "wav",
            SttFormat::Webm => "webm",
            SttFormat::Flac => "flac",
            SttFormat::Ogg => "ogg",
        }
    }
}

/// Role of a chat message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in a chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// A request to the chat capability.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Creativity 0–100; mapped onto sampling temperature by the adapter.
    pub creativity: i32,
    pub max_tokens: u32,
}

impl ChatRequest {
    /// Maps creativity onto the provider temperature scale.
    ///
    /// `temperature = creativity * 2 / 100`, clamped to `[0, 2]`.
    pub fn temperature(&self) -> f32 {
        creativity_to_temperature(self.creativity)
    }
}

/// `temperature = creativity * 2 / 100` clamped to `[0, 2]`.
pub fn creativity_to_temperature(creativity: i32) -> f32 {
    (creativity as f32 * 2.0 / 100.0).clamp(0.0, 2.0)
}

/// Token accounting for one chat call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u32,
    pub response: u32,
}

/// A full (non-streaming) chat response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub text: String,
    pub finish_reason: Option<String>,
    pub usage: TokenUsage,
}

/// Result of transcribing one user utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    pub detected_language: Option<String>,
}

/// A request to the synthesis capability.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: String,
    /// BCP-47 language tag of the text.
    pub language: String,
    pub format: OutputFormat,
    /// Provider-side latency/quality trade-off, 0 (off) to 4 (max).
    pub optimize_stream_latency: u8,
    pub stability: f32,
    pub similarity_boost: f32,
    pub style_exaggeration: f32,
}

/// The fixed moderation category names the evaluator inspects.
///
/// The classifier may return more; everything outside this list is opaque
/// to the core.
pub const MODERATION_CATEGORIES: [&str; 11] = [
    "hate",
    "hate/threatening",
    "harassment",
    "harassment/threatening",
    "violence",
    "violence/graphic",
    "sexual",
    "sexual/minors",
    "self-harm",
    "self-harm/intent",
    "self-harm/instructions",
];

/// Age-rating and toxicity analysis attached to a classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    /// Minimum appropriate age assessed directly from the text.
    #[serde(default)]
    pub assessment_age: u8,
    /// Short human-readable justification of the assessment.
    #[serde(default)]
    pub assessment_translation: String,
    /// MPAA-style label (G, PG, PG-13, R, NC-17).
    #[serde(default)]
    pub movie_rating: String,
    /// US TV label (TV-Y, TV-Y7, TV-G, TV-PG, TV-14, TV-MA).
    #[serde(default)]
    pub tv_rating: String,
    /// ESRB label (EC, E, E10+, T, M, AO).
    #[serde(default)]
    pub esrb_rating: String,
    /// PEGI label (numeric string).
    #[serde(default)]
    pub pegi_rating: String,
    #[serde(default)]
    pub toxic: bool,
}

/// Full classifier output for one text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub categories: BTreeMap<String, bool>,
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub analysis: TextAnalysis,
}

/// Outcome of evaluating a classification against a profile's policy.
///
/// Stored on the session entry and on `last_user_audio`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub triggered: bool,
    pub age_appropriate: bool,
    /// Localized names of the enabled flags that tripped.
    #[serde(default)]
    pub reasons: Vec<String>,
    /// Raw category names that tripped (pre-localization).
    #[serde(default)]
    pub flagged: Vec<String>,
}
