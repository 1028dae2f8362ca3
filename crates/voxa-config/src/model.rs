// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Voxa character backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level Voxa configuration.
///
/// Loaded from TOML with environment variable overrides. All sections are
/// optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VoxaConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// OpenAI API settings (chat, transcription, classification).
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// ElevenLabs API settings (synthesis).
    #[serde(default)]
    pub elevenlabs: ElevenLabsConfig,

    /// Document and blob storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// SMTP email settings.
    #[serde(default)]
    pub email: EmailConfig,

    /// Billing tier costs and low-balance thresholds.
    #[serde(default)]
    pub billing: BillingConfig,

    /// Turn pipeline settings.
    #[serde(default)]
    pub turn: TurnConfig,

    /// Registry cache settings.
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// OpenAI API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. `None` requires the environment variable override.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Default chat model.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Transcription model.
    #[serde(default = "default_stt_model")]
    pub stt_model: String,

    /// Requests per second allowed against the chat model.
    #[serde(default = "default_chat_rps")]
    pub chat_requests_per_second: u32,

    /// Transcription requests allowed per 300 ms window.
    #[serde(default = "default_stt_burst")]
    pub stt_requests_per_300ms: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            chat_model: default_chat_model(),
            stt_model: default_stt_model(),
            chat_requests_per_second: default_chat_rps(),
            stt_requests_per_300ms: default_stt_burst(),
        }
    }
}

fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_stt_model() -> String {
    "whisper-1".to_string()
}

fn default_chat_rps() -> u32 {
    50
}

fn default_stt_burst() -> u32 {
    5
}

/// ElevenLabs API configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ElevenLabsConfig {
    /// API key. `None` requires the environment variable override.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Default synthesis model.
    #[serde(default)]
    pub tts_model: Option<String>,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite database path for the document store. `:memory:` for tests.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Root directory for audio blobs.
    #[serde(default = "default_blob_root")]
    pub blob_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            blob_root: default_blob_root(),
        }
    }
}

fn default_db_path() -> String {
    "voxa.db".to_string()
}

fn default_blob_root() -> String {
    "blobs".to_string()
}

/// SMTP email configuration. Email is disabled when `smtp_host` is unset.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp_host: Option<String>,

    #[serde(default)]
    pub smtp_username: Option<String>,

    #[serde(default)]
    pub smtp_password: Option<String>,

    /// From address for moderation and low-balance mail.
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

fn default_from_address() -> String {
    "no-reply@voxa.local".to_string()
}

/// Billing configuration: per-tier turn costs and low-balance thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BillingConfig {
    /// Cost in vexels per turn, keyed by tier name. `tier-free` is always 0.
    #[serde(default = "default_tier_costs")]
    pub tier_costs: BTreeMap<String, i64>,

    /// Balance thresholds (vexels) that trigger a low-balance email when
    /// crossed downward, keyed by tier name, descending.
    #[serde(default = "default_low_balance_thresholds")]
    pub low_balance_thresholds: BTreeMap<String, Vec<i64>>,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            tier_costs: default_tier_costs(),
            low_balance_thresholds: default_low_balance_thresholds(),
        }
    }
}

fn default_tier_costs() -> BTreeMap<String, i64> {
    BTreeMap::from([
        ("tier-free".to_string(), 0),
        ("tier-conversation-1".to_string(), 100),
        ("tier-conversation-2".to_string(), 200),
    ])
}

fn default_low_balance_thresholds() -> BTreeMap<String, Vec<i64>> {
    BTreeMap::from([("tier-conversation-1".to_string(), vec![20_500, 10_500])])
}

/// Turn pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TurnConfig {
    /// Default per-turn deadline when the mode does not set one.
    #[serde(default = "default_turn_timeout_secs")]
    pub timeout_secs: u64,

    /// Grace period before stale `last_user_audio` entries are collected.
    #[serde(default = "default_audio_grace_secs")]
    pub audio_grace_secs: u64,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_turn_timeout_secs(),
            audio_grace_secs: default_audio_grace_secs(),
        }
    }
}

fn default_turn_timeout_secs() -> u64 {
    60
}

fn default_audio_grace_secs() -> u64 {
    300
}

/// Registry cache configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// When true, every lookup bypasses the process-wide caches.
    #[serde(default)]
    pub disable_caches: bool,

    /// Character definition version loaded from the registry store.
    #[serde(default = "default_character_version")]
    pub character_version: String,
}

fn default_character_version() -> String {
    "v2".to_string()
}
