// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn state labels and the request/response records of the pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use voxa_core::types::OutputFormat;
use voxa_session::Entry;

/// States a turn moves through. A turn may short-circuit to `Canned` and
/// skip the LLM and the charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Admitted,
    Transcribed,
    Moderated,
    Canned,
    Responded,
    Persisted,
    Charged,
    Closed,
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TurnState::Admitted => "admitted",
            TurnState::Transcribed => "transcribed",
            TurnState::Moderated => "moderated",
            TurnState::Canned => "canned",
            TurnState::Responded => "responded",
            TurnState::Persisted => "persisted",
            TurnState::Charged => "charged",
            TurnState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Sentinel id for an unintelligible utterance.
pub const AUDIO_ID_UNINTELLIGIBLE: &str = "0";

/// Sentinel id for the canned moderation response.
pub const AUDIO_ID_MODERATION: &str = "1";

/// Result of admitting one utterance (the POST half of a turn).
#[derive(Debug, Clone, Serialize)]
pub struct TurnTicket {
    pub audio_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub detected_language: Option<String>,
    pub mode: String,
}

/// A text-turn input.
#[derive(Debug, Clone)]
pub struct TextInput {
    /// Raw text, or a Predefined-table key when `predefined`.
    pub text: String,
    pub predefined: bool,
}

/// Options on the response (GET) half of a turn.
#[derive(Debug, Clone)]
pub struct RespondOptions {
    pub format: OutputFormat,
    pub optimize_stream_latency: u8,
    /// Text-to-text model override (`?ttt_model`).
    pub ttt_model: Option<String>,
}

impl Default for RespondOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Mp3_44100_128,
            optimize_stream_latency: 0,
            ttt_model: None,
        }
    }
}

/// What `GET /sts/text/{audio_id}` resolves to.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TurnText {
    /// A canned response for the sentinel ids.
    Canned { text: String },
    /// The stored session entry.
    Entry(Box<Entry>),
}

/// Result of closing a turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CloseOutcome {
    pub moderation_email_sent: bool,
    pub notification_id: Option<String>,
}
