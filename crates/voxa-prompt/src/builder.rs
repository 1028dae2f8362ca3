// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly for one turn.
//!
//! Builds the system message from the character's mode, walks session
//! memory backwards for history, and composes the user message from the
//! locale's templates: the dont-say set, discouraged topics, randomized
//! sprinkles, and the word-cap bracket around the user text.

use rand::Rng;
use rand::seq::SliceRandom;
use voxa_core::VoxaError;
use voxa_core::types::{ChatMessage, ChatRole};
use voxa_registry::{CharacterDef, Localization, Mode, Profile, section};
use voxa_session::SessionDoc;

use crate::tokens::{count_messages, select_model};

/// Probability (1 in N) of the address-user-by-name sprinkle.
const ADDRESS_BY_NAME_ODDS: u32 = 5;

/// Probability (1 in N) of the interest sprinkle.
const INTEREST_ODDS: u32 = 10;

/// Probability (1 in N) of the encourage-topic sprinkle.
const ENCOURAGE_ODDS: u32 = 5;

/// Extra words granted when a follow-up question is requested.
const FOLLOW_UP_WORD_BONUS: u32 = 5;

/// Everything the builder needs for one turn.
pub struct PromptInput<'a> {
    pub character: &'a CharacterDef,
    pub mode_name: &'a str,
    pub profile: &'a Profile,
    pub session: &'a SessionDoc,
    pub user_text: &'a str,
    /// BCP-47 response language.
    pub language: &'a str,
    pub localization: &'a Localization,
    /// False for predefined/canned utterances.
    pub include_history: bool,
}

/// A chat request ready for the provider, with its token estimate.
#[derive(Debug, Clone)]
pub struct BuiltPrompt {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub creativity: i32,
    pub max_tokens: u32,
    pub token_estimate: usize,
}

/// Builds the prompt; `rng` drives the sprinkle draws so callers can seed
/// deterministic tests.
pub fn build_prompt(input: &PromptInput<'_>, rng: &mut impl Rng) -> Result<BuiltPrompt, VoxaError> {
    let mode = input
        .character
        .mode(input.mode_name)
        .ok_or_else(|| VoxaError::NotFound(format!("mode {}", input.mode_name)))?;

    let mut messages = vec![ChatMessage::system(system_message(input.character, mode, input))];

    if input.include_history {
        messages.extend(history(input.session, mode.session_entries));
    }

    let (user, max_words) = user_message(input, mode, rng);
    messages.push(ChatMessage::user(user));

    let token_estimate = count_messages(&input.character.model, &messages);
    let model = select_model(&input.character.model, token_estimate)?;

    Ok(BuiltPrompt {
        messages,
        model,
        creativity: mode.creativity,
        max_tokens: (max_words * 3).max(150),
        token_estimate,
    })
}

fn system_message(character: &CharacterDef, mode: &Mode, input: &PromptInput<'_>) -> String {
    let mut parts = vec![mode.prompt.clone()];
    if !character.positive_traits.is_empty() {
        parts.push(format!("Positive traits: {}.", character.positive_traits.join(", ")));
    }
    if !character.negative_traits.is_empty() {
        parts.push(format!("Negative traits: {}.", character.negative_traits.join(", ")));
    }
    parts.push(input.localization.get_or_builtin(section::CHARACTER, "guardrail"));
    parts.join(" ")
}

/// Walks entries backward from the newest, stopping at the first sealed
/// entry and skipping moderation-triggered ones; keeps at most `window`
/// entries and emits them as chronological user/assistant pairs.
fn history(session: &SessionDoc, window: usize) -> Vec<ChatMessage> {
    let mut collected = Vec::new();
    let mut kept = 0usize;

    for entry in session.entries.values().rev() {
        if entry.end_sequence {
            break;
        }
        if entry.moderation.as_ref().is_some_and(|m| m.triggered) {
            continue;
        }
        if kept >= window {
            break;
        }
        collected.push(ChatMessage::assistant(&entry.assistant));
        collected.push(ChatMessage::user(&entry.user));
        kept += 1;
    }

    collected.reverse();
    collected
}

/// Builds the user message; returns it with the effective word cap.
fn user_message(input: &PromptInput<'_>, mode: &Mode, rng: &mut impl Rng) -> (String, u32) {
    let l = input.localization;
    let profile = input.profile;
    let mut parts = Vec::new();
    let mut max_words = mode.max_words;

    parts.push(
        l.get_or_builtin(section::CHARACTER, "respond_as")
            .replace("{character}", &input.character.short_name),
    );
    parts.push(
        l.get_or_builtin(section::CHARACTER, "respond_language")
            .replace("{language}", input.language),
    );

    let banned = banned_words(input.character, profile);
    if !banned.is_empty() {
        parts.push(
            l.get_or_builtin(section::CHARACTER, "dont_say")
                .replace("{words}", &banned.join(", ")),
        );
    }

    if !profile.discourage_topics.is_empty() {
        parts.push(
            l.get_or_builtin(section::CHARACTER, "discourage_topics")
                .replace("{topics}", &profile.discourage_topics.join(", ")),
        );
    }

    if !profile.name.is_empty() && rng.gen_ratio(1, ADDRESS_BY_NAME_ODDS) {
        parts.push(
            l.get_or_builtin(section::CHARACTER, "address_by_name")
                .replace("{name}", &profile.name),
        );
    }
    if let Some(interest) = profile.interests.choose(rng) {
        if rng.gen_ratio(1, INTEREST_ODDS) {
            parts.push(
                l.get_or_builtin(section::CHARACTER, "interest")
                    .replace("{interest}", interest),
            );
        }
    }
    if let Some(topic) = profile.encourage_topics.choose(rng) {
        if rng.gen_ratio(1, ENCOURAGE_ODDS) {
            parts.push(
                l.get_or_builtin(section::CHARACTER, "encourage_topic")
                    .replace("{topic}", topic),
            );
        }
    }

    // Follow-up questions only in conversation mode, at the profile's
    // configured frequency; granting one loosens the word cap.
    let frequency = u32::from(profile.add_question_frequency.min(100));
    if input.mode_name == "conversation" && frequency > 0 && rng.gen_ratio(frequency, 100) {
        parts.push(l.get_or_builtin(section::CHARACTER, "follow_up"));
        max_words += FOLLOW_UP_WORD_BONUS;
    }

    let cap = l
        .get_or_builtin(section::CHARACTER, "max_words")
        .replace("{n}", &max_words.to_string());
    parts.push(cap.clone());
    parts.push(input.user_text.to_string());
    parts.push(cap);

    // The v2 layout drops the trailing sentence for conversation mode.
    if !(input.character.prompt_v2 && input.mode_name == "conversation") {
        parts.push(l.get_or_builtin(section::CHARACTER, "dont_say_ai"));
    }

    (parts.join(" "), max_words)
}

/// The combined dont-say set: character list, profile list, the profile's
/// deletion synonyms, and the profile name when the character must not use
/// it. First occurrence wins; order is preserved.
fn banned_words(character: &CharacterDef, profile: &Profile) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    let deletions = profile.replace_words.get("_");
    let name = (character.dont_say_own_name && !profile.name.is_empty())
        .then_some(&profile.name);

    for word in character
        .dont_say
        .iter()
        .chain(profile.dont_say.iter())
        .chain(deletions.into_iter().flatten())
        .chain(name)
    {
        if seen.insert(word.to_lowercase()) {
            out.push(word.clone());
        }
    }
    out
}
