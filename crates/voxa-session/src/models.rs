// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session document models.
//!
//! Entry maps are keyed by zero-padded decimal sequence ids so lexical
//! order equals numeric order inside the stored JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use voxa_core::types::ModerationResult;

/// Renders a sequence id as a zero-padded map key (`17` → `"0000000017"`).
pub fn seq_key(id: u64) -> String {
    format!("{id:010}")
}

/// Parses a map key back into a sequence id.
pub fn parse_seq(key: &str) -> Option<u64> {
    key.parse().ok()
}

/// Persisted record of one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: u64,

    /// User utterance text.
    #[serde(default)]
    pub user: String,

    /// Assistant response text.
    #[serde(default)]
    pub assistant: String,

    #[serde(default)]
    pub mode: String,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub response_tokens: u32,

    /// When set, the prompt builder treats this entry and everything
    /// before it as sealed.
    #[serde(default)]
    pub end_sequence: bool,

    #[serde(default)]
    pub moderation: Option<ModerationResult>,

    #[serde(default)]
    pub notification_id: Option<String>,

    /// Extension → blob path of the stored user audio.
    #[serde(default)]
    pub user_audio: BTreeMap<String, String>,

    /// Extension → blob path of the stored assistant audio; filled
    /// asynchronously after synthesis.
    #[serde(default)]
    pub assistant_audio: BTreeMap<String, String>,
}

/// A user utterance awaiting (or recently attached to) its entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserAudio {
    pub audio_id: String,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub detected_language: Option<String>,

    /// Canned user text selected from the locale's Predefined table.
    #[serde(default)]
    pub predefined: bool,

    #[serde(default)]
    pub mode: String,

    #[serde(default)]
    pub moderation: Option<ModerationResult>,

    /// Blob path of the uploaded audio, when the turn was speech.
    #[serde(default)]
    pub blob_path: Option<String>,

    /// Extension of the uploaded audio blob.
    #[serde(default)]
    pub blob_ext: Option<String>,

    /// Sequence id of the entry this audio produced; 0 until the entry is
    /// created.
    #[serde(default)]
    pub session_id: u64,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub notification_id: Option<String>,
}

/// The live session window plus rollover bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDoc {
    /// Sequence key → entry for the live window.
    #[serde(default)]
    pub entries: BTreeMap<String, Entry>,

    /// Parallel map for canned-path entries; never rolls over.
    #[serde(default)]
    pub predefined_entries: BTreeMap<String, Entry>,

    /// Audio id → pending user audio.
    #[serde(default)]
    pub last_user_audio: BTreeMap<String, UserAudio>,

    /// Sequence id of the first entry still in `latest`.
    #[serde(default = "default_start_entry")]
    pub start_entry: u64,

    /// Start of the current archive window.
    #[serde(default)]
    pub archive: Option<DateTime<Utc>>,

    /// Previous archive boundary.
    #[serde(default)]
    pub last_archive: Option<DateTime<Utc>>,
}

fn default_start_entry() -> u64 {
    1
}

impl Default for SessionDoc {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            predefined_entries: BTreeMap::new(),
            last_user_audio: BTreeMap::new(),
            start_entry: default_start_entry(),
            archive: None,
            last_archive: None,
        }
    }
}

impl SessionDoc {
    /// Sequence id the next appended entry receives.
    pub fn next_seq(&self) -> u64 {
        self.start_entry + self.entries.len() as u64
    }

    /// The highest-id entry in the live window.
    pub fn last_entry(&self) -> Option<&Entry> {
        self.entries.values().next_back()
    }

    /// Entries in id order (the map key ordering guarantees this).
    pub fn ordered_entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }
}

/// A detached, dated document holding entries evicted from `latest`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveDoc {
    #[serde(default)]
    pub entries: BTreeMap<String, Entry>,
}

/// Index entry describing one archive's (or the live window's) span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArchiveSpan {
    pub start_entry: u64,
    pub end_entry: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Archive id → span, plus the synthetic `"latest"` entry when derived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveIndex {
    #[serde(default)]
    pub entries: BTreeMap<String, ArchiveSpan>,
}

/// Key of the synthetic live-window index entry.
pub const LATEST_ARCHIVE_ID: &str = "latest";
