// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./voxa.toml` > `~/.config/voxa/voxa.toml` >
//! `/etc/voxa/voxa.toml` with environment variable overrides via the
//! `VOXA_` prefix.

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use voxa_core::VoxaError;

use crate::model::VoxaConfig;

/// Load configuration from the standard XDG hierarchy with env overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/voxa/voxa.toml`
/// 3. `~/.config/voxa/voxa.toml`
/// 4. `./voxa.toml`
/// 5. `VOXA_*` environment variables
pub fn load_config() -> Result<VoxaConfig, VoxaError> {
    Figment::new()
        .merge(Serialized::defaults(VoxaConfig::default()))
        .merge(Toml::file("/etc/voxa/voxa.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("voxa/voxa.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("voxa.toml"))
        .merge(env_provider())
        .extract()
        .map_err(|e| VoxaError::Config(e.to_string()))
}

/// Load configuration from a TOML string only (tests, embedded config).
pub fn load_config_from_str(toml_content: &str) -> Result<VoxaConfig, VoxaError> {
    Figment::new()
        .merge(Serialized::defaults(VoxaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
        .map_err(|e| VoxaError::Config(e.to_string()))
}

/// Load configuration from a specific file path with env overrides.
pub fn load_config_from_path(path: &Path) -> Result<VoxaConfig, VoxaError> {
    Figment::new()
        .merge(Serialized::defaults(VoxaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
        .map_err(|e| VoxaError::Config(e.to_string()))
}

/// Environment provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-containing
/// key names stay intact: `VOXA_OPENAI_API_KEY` maps to `openai.api_key`,
/// not `openai.api.key`.
fn env_provider() -> Env {
    Env::prefixed("VOXA_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("openai_", "openai.", 1)
            .replacen("elevenlabs_", "elevenlabs.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("email_", "email.", 1)
            .replacen("billing_", "billing.", 1)
            .replacen("turn_", "turn.", 1)
            .replacen("registry_", "registry.", 1);
        mapped.into()
    })
}
