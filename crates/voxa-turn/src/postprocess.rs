// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-processing of the assistant text before it is stored and spoken:
//! dont-say deletion, the profile's replace-word map, and whitespace
//! cleanup.

use regex::RegexBuilder;
use voxa_registry::Profile;

/// Case-insensitive whole-word pattern for `word`.
fn word_pattern(word: &str) -> Option<regex::Regex> {
    RegexBuilder::new(&format!(r"\b{}\b", regex::escape(word)))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Applies the profile's text rules to a generated response.
///
/// Words in `dont_say` are deleted at word boundaries; `replace_words`
/// maps each synonym onto its target, with the `_` target meaning
/// deletion; runs of spaces left behind collapse to one.
pub fn postprocess_response(text: &str, profile: &Profile) -> String {
    let mut out = text.to_string();

    for word in &profile.dont_say {
        if let Some(re) = word_pattern(word) {
            out = re.replace_all(&out, "").into_owned();
        }
    }

    for (target, synonyms) in &profile.replace_words {
        let replacement = if target == "_" { "" } else { target.as_str() };
        for synonym in synonyms {
            if let Some(re) = word_pattern(synonym) {
                out = re.replace_all(&out, replacement).into_owned();
            }
        }
    }

    collapse_spaces(&out)
}

fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for c in text.chars() {
        if c == ' ' {
            if !last_was_space {
                out.push(c);
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn profile() -> Profile {
        Profile {
            dont_say: vec!["joker".into(), "scarecrow".into()],
            replace_words: BTreeMap::from([
                ("scary".to_string(), vec!["terrifying".to_string(), "horrifying".to_string()]),
                ("_".to_string(), vec!["darn".to_string()]),
            ]),
            ..Profile::default()
        }
    }

    #[test]
    fn dont_say_words_are_deleted_case_insensitively() {
        let out = postprocess_response("The Joker laughed. JOKER ran.", &profile());
        assert_eq!(out, "The laughed. ran.");
    }

    #[test]
    fn word_boundaries_protect_substrings() {
        // "jokers" contains "joker" but is a different word.
        let out = postprocess_response("Many jokers tell jokes.", &profile());
        assert_eq!(out, "Many jokers tell jokes.");
    }

    #[test]
    fn synonyms_map_to_their_target() {
        let out = postprocess_response("A terrifying, horrifying night.", &profile());
        assert_eq!(out, "A scary, scary night.");
    }

    #[test]
    fn underscore_target_deletes_synonyms() {
        let out = postprocess_response("Well darn it.", &profile());
        assert_eq!(out, "Well it.");
    }

    #[test]
    fn double_spaces_collapse() {
        let out = postprocess_response("so  many   spaces", &Profile::default());
        assert_eq!(out, "so many spaces");
    }

    #[test]
    fn empty_rules_pass_text_through() {
        let text = "Nothing to change here.";
        assert_eq!(postprocess_response(text, &Profile::default()), text);
    }
}
