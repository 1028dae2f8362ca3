// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Character, profile, and account document models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A named parameter bundle on a character: system prompt, creativity,
/// memory window, word cap, billing tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mode {
    /// Character system prompt for this mode.
    pub prompt: String,

    /// Creativity 0–100, mapped onto temperature by the chat adapter.
    #[serde(default)]
    pub creativity: i32,

    /// Word cap woven into the user message.
    #[serde(default = "default_max_words")]
    pub max_words: u32,

    /// Memory window: number of history entries fed to the prompt builder.
    #[serde(default = "default_session_entries")]
    pub session_entries: usize,

    /// Billing tier; absent means `tier-free`.
    #[serde(default)]
    pub tier: Option<String>,

    /// Per-turn deadline override in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_max_words() -> u32 {
    60
}

fn default_session_entries() -> usize {
    15
}

impl Mode {
    /// The billing tier, defaulting to `tier-free`.
    pub fn tier(&self) -> &str {
        self.tier.as_deref().unwrap_or("tier-free")
    }
}

/// A character definition for one (version, language).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterDef {
    pub short_name: String,
    pub long_name: String,

    /// LLM model id used for this character.
    pub model: String,

    /// Mode name → parameter bundle.
    pub modes: BTreeMap<String, Mode>,

    /// BCP-47 locale → synthesis voice id.
    #[serde(default)]
    pub voices: BTreeMap<String, String>,

    #[serde(default)]
    pub positive_traits: Vec<String>,

    #[serde(default)]
    pub negative_traits: Vec<String>,

    /// Words the character must never say.
    #[serde(default)]
    pub dont_say: Vec<String>,

    /// When true the character's own name joins the dont-say set.
    #[serde(default)]
    pub dont_say_own_name: bool,

    /// Selects the v2 prompt layout (no trailing "don't say AI" in
    /// conversation mode).
    #[serde(default)]
    pub prompt_v2: bool,
}

impl CharacterDef {
    pub fn mode(&self, name: &str) -> Option<&Mode> {
        self.modes.get(name)
    }

    /// Voice id for a locale, falling back to `en-US`, then any voice.
    pub fn voice_for(&self, locale: &str) -> Option<&str> {
        self.voices
            .get(locale)
            .or_else(|| self.voices.get("en-US"))
            .or_else(|| self.voices.values().next())
            .map(String::as_str)
    }
}

/// Per-character preferences on a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterPrefs {
    /// BCP-47 response language.
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_mode")]
    pub mode: String,

    /// Voice key override; absent uses the character's locale voice.
    #[serde(default)]
    pub voice: Option<String>,

    #[serde(default)]
    pub image_style: Option<String>,
}

impl Default for CharacterPrefs {
    fn default() -> Self {
        Self {
            language: default_language(),
            mode: default_mode(),
            voice: None,
            image_style: None,
        }
    }
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_mode() -> String {
    "conversation".to_string()
}

/// Moderation notification policy on a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Recipients for moderation email; empty disables email.
    #[serde(default)]
    pub emails: Vec<String>,

    /// Category name → enabled toggle.
    #[serde(default)]
    pub moderations: BTreeMap<String, bool>,

    /// Toxicity analysis toggle.
    #[serde(default)]
    pub text_analysis_toxic: bool,
}

/// A profile owned by an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,

    /// Age in integer years used for the moderation age floor.
    #[serde(default)]
    pub response_age: u8,

    /// When false the moderation stage is skipped entirely.
    #[serde(default)]
    pub moderate: bool,

    /// Character name → preferences.
    #[serde(default)]
    pub preferences: BTreeMap<String, CharacterPrefs>,

    #[serde(default)]
    pub discourage_topics: Vec<String>,

    #[serde(default)]
    pub encourage_topics: Vec<String>,

    #[serde(default)]
    pub interests: Vec<String>,

    /// Replacement target → synonyms; key `_` maps synonyms to deletion.
    #[serde(default)]
    pub replace_words: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub dont_say: Vec<String>,

    #[serde(default)]
    pub notifications: NotificationSettings,

    /// Percent chance (0–100) a follow-up question is appended in
    /// conversation mode.
    #[serde(default)]
    pub add_question_frequency: u8,
}

impl Profile {
    /// Preferences for a character, defaulted when the profile has none.
    pub fn prefs_for(&self, character: &str) -> CharacterPrefs {
        self.preferences.get(character).cloned().unwrap_or_default()
    }
}

/// An account document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,

    #[serde(default)]
    pub active: bool,

    #[serde(default)]
    pub timezone: String,

    /// Product name → registered device ids.
    #[serde(default)]
    pub devices: BTreeMap<String, Vec<String>>,

    /// Developer override: skip all billing for this account.
    #[serde(default)]
    pub disable_bank: bool,

    /// Developer override: bypass registry caches.
    #[serde(default)]
    pub disable_caches: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_defaults_to_free_tier() {
        let mode = Mode::default();
        assert_eq!(mode.tier(), "tier-free");
        let paid = Mode { tier: Some("tier-conversation-1".into()), ..Mode::default() };
        assert_eq!(paid.tier(), "tier-conversation-1");
    }

    #[test]
    fn voice_falls_back_to_en_us_then_any() {
        let mut character = CharacterDef {
            voices: BTreeMap::from([
                ("en-US".to_string(), "voice-en".to_string()),
                ("de-DE".to_string(), "voice-de".to_string()),
            ]),
            ..CharacterDef::default()
        };
        assert_eq!(character.voice_for("de-DE"), Some("voice-de"));
        assert_eq!(character.voice_for("fr-FR"), Some("voice-en"));

        character.voices.remove("en-US");
        assert_eq!(character.voice_for("fr-FR"), Some("voice-de"));
    }

    #[test]
    fn profile_prefs_default_to_conversation_en_us() {
        let profile = Profile::default();
        let prefs = profile.prefs_for("batman");
        assert_eq!(prefs.language, "en-US");
        assert_eq!(prefs.mode, "conversation");
        assert!(prefs.voice.is_none());
    }

    #[test]
    fn profile_deserializes_with_minimal_fields() {
        let json = r#"{"id": "p1", "name": "Sam"}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.name, "Sam");
        assert!(!profile.moderate);
        assert_eq!(profile.add_question_frequency, 0);
    }
}
