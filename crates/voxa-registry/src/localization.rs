// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Language-keyed string tables.
//!
//! A localization is a `{section → key → string}` table loaded per
//! (version, language). Missing locales fall back to `en-US`; a compiled-in
//! `en-US` table backstops a registry store with no localization documents
//! so the canned paths always have something to say.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Section names inside a localization table.
pub mod section {
    pub const CHARACTER: &str = "Character";
    pub const EMAIL: &str = "Email";
    pub const MODERATION: &str = "Moderation";
    pub const TEXT_ANALYSIS: &str = "TextAnalysis";
    pub const PREDEFINED: &str = "Predefined";
}

/// One language's string tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Localization {
    #[serde(default)]
    pub sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Localization {
    /// Looks up a string; `None` when the section or key is missing.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    /// Looks up a string, falling back to the built-in `en-US` table.
    pub fn get_or_builtin(&self, section: &str, key: &str) -> String {
        if let Some(s) = self.get(section, key) {
            return s.to_string();
        }
        builtin_en_us()
            .get(section, key)
            .unwrap_or(key)
            .to_string()
    }

    /// Localized display name for a moderation category.
    pub fn moderation_reason(&self, category: &str) -> String {
        self.get_or_builtin(section::MODERATION, category)
    }
}

/// The compiled-in `en-US` table.
pub fn builtin_en_us() -> Localization {
    let character = BTreeMap::from(
        [
            ("guardrail", "Stay in character and keep responses suitable for the listener's age."),
            ("respond_as", "Respond as {character}."),
            ("respond_language", "Respond in {language}."),
            ("dont_say", "Don't say any of these words: {words}."),
            ("discourage_topics", "Avoid these topics: {topics}."),
            ("encourage_topic", "If it fits naturally, bring up {topic}."),
            ("address_by_name", "Address me as {name}."),
            ("interest", "Remember that I like {interest}."),
            ("follow_up", "End with a short follow-up question."),
            ("max_words", "Use at most {n} words."),
            ("dont_say_ai", "Don't say you are an AI."),
        ]
        .map(|(k, v)| (k.to_string(), v.to_string())),
    );

    let moderation = BTreeMap::from(
        [
            ("hate", "hate"),
            ("hate/threatening", "threatening hate"),
            ("harassment", "harassment"),
            ("harassment/threatening", "threatening harassment"),
            ("violence", "violence"),
            ("violence/graphic", "graphic violence"),
            ("sexual", "sexual content"),
            ("sexual/minors", "sexual content involving minors"),
            ("self-harm", "self-harm"),
            ("self-harm/intent", "self-harm intent"),
            ("self-harm/instructions", "self-harm instructions"),
            ("not_age_appropriate", "not age appropriate"),
            ("toxic", "toxic language"),
        ]
        .map(|(k, v)| (k.to_string(), v.to_string())),
    );

    let predefined = BTreeMap::from(
        [
            ("dont_understand", "Sorry, I didn't catch that. Could you say it again?"),
            ("moderation_response_1", "I'd rather not talk about that. Let's pick another topic."),
            ("moderation_response_2", "Hmm, let's talk about something else instead!"),
            ("response_took_too_long", "Sorry, that took me too long to think about. Ask me again?"),
            ("answer_too_long", "That answer got away from me. Let's try a shorter one."),
        ]
        .map(|(k, v)| (k.to_string(), v.to_string())),
    );

    let email = BTreeMap::from(
        [
            ("moderation_subject", "Moderation notice for {profile}"),
            ("moderation_title", "A message was flagged"),
            ("moderation_intro", "While {profile} was talking to {character}, a message tripped the following filters:"),
            ("moderation_quote_label", "The message was:"),
            ("low_balance_subject", "Your vexel balance is running low"),
            ("low_balance_body", "Your balance has dropped to {balance} vexels. Top up to keep the conversation going."),
        ]
        .map(|(k, v)| (k.to_string(), v.to_string())),
    );

    Localization {
        sections: BTreeMap::from([
            (section::CHARACTER.to_string(), character),
            (section::MODERATION.to_string(), moderation),
            (section::PREDEFINED.to_string(), predefined),
            (section::EMAIL.to_string(), email),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_the_canned_responses() {
        let l = builtin_en_us();
        for key in [
            "dont_understand",
            "moderation_response_1",
            "moderation_response_2",
            "response_took_too_long",
            "answer_too_long",
        ] {
            assert!(l.get(section::PREDEFINED, key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn get_or_builtin_prefers_loaded_strings() {
        let mut l = Localization::default();
        l.sections
            .entry(section::PREDEFINED.to_string())
            .or_default()
            .insert("dont_understand".to_string(), "Wie bitte?".to_string());
        assert_eq!(
            l.get_or_builtin(section::PREDEFINED, "dont_understand"),
            "Wie bitte?"
        );
        // Unloaded key falls through to the builtin.
        assert!(
            l.get_or_builtin(section::PREDEFINED, "moderation_response_1")
                .contains("rather not")
        );
    }

    #[test]
    fn moderation_reasons_cover_all_categories() {
        let l = builtin_en_us();
        for c in voxa_core::types::MODERATION_CATEGORIES {
            assert_ne!(l.moderation_reason(c), c, "category {c} has no display name");
        }
    }
}
