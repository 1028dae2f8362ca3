// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic token counting and model-size selection.
//!
//! Counts use the model's BPE via tiktoken; unknown models fall back to
//! `cl100k_base`. A `gpt-3.5-turbo` request over the escalation limit is
//! bumped to the large-context model; past the hard cap the request fails.

use tiktoken_rs::CoreBPE;
use voxa_core::VoxaError;
use voxa_core::types::ChatMessage;

/// Token count past which a small-model request escalates.
pub const ESCALATION_LIMIT: usize = 12_288;

/// Token count past which no model accepts the request.
pub const HARD_LIMIT: usize = 102_400;

/// The small model subject to escalation.
pub const SMALL_MODEL: &str = "gpt-3.5-turbo";

/// The large-context model escalated to.
pub const LARGE_MODEL: &str = "gpt-4-turbo-preview";

fn bpe_for(model: &str) -> CoreBPE {
    tiktoken_rs::get_bpe_from_model(model)
        .unwrap_or_else(|_| tiktoken_rs::cl100k_base().expect("cl100k_base is compiled in"))
}

/// Tokens in one string under the model's encoding.
pub fn count_text(model: &str, text: &str) -> usize {
    bpe_for(model).encode_with_special_tokens(text).len()
}

/// Tokens across a whole message list.
pub fn count_messages(model: &str, messages: &[ChatMessage]) -> usize {
    let bpe = bpe_for(model);
    messages
        .iter()
        .map(|m| bpe.encode_with_special_tokens(&m.content).len())
        .sum()
}

/// Applies the escalation ladder, returning the model to use.
pub fn select_model(model: &str, token_count: usize) -> Result<String, VoxaError> {
    if token_count > HARD_LIMIT {
        return Err(VoxaError::Limit(format!(
            "request of {token_count} tokens exceeds the {HARD_LIMIT}-token cap"
        )));
    }
    if model == SMALL_MODEL && token_count > ESCALATION_LIMIT {
        tracing::debug!(token_count, "escalating to the large-context model");
        return Ok(LARGE_MODEL.to_string());
    }
    Ok(model.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_is_deterministic_and_nonzero() {
        let a = count_text(SMALL_MODEL, "Tell me about stars");
        let b = count_text(SMALL_MODEL, "Tell me about stars");
        assert_eq!(a, b);
        assert!(a > 0);
    }

    #[test]
    fn unknown_models_fall_back_without_panicking() {
        assert!(count_text("voxa-custom-model", "hello world") > 0);
    }

    #[test]
    fn small_model_escalates_over_the_limit() {
        assert_eq!(select_model(SMALL_MODEL, ESCALATION_LIMIT).unwrap(), SMALL_MODEL);
        assert_eq!(select_model(SMALL_MODEL, ESCALATION_LIMIT + 1).unwrap(), LARGE_MODEL);
    }

    #[test]
    fn large_model_never_escalates_below_the_cap() {
        assert_eq!(select_model(LARGE_MODEL, 50_000).unwrap(), LARGE_MODEL);
    }

    #[test]
    fn past_the_hard_cap_is_a_limit_error() {
        let err = select_model(LARGE_MODEL, HARD_LIMIT + 1).unwrap_err();
        assert!(matches!(err, VoxaError::Limit(_)));
        let err = select_model(SMALL_MODEL, HARD_LIMIT + 1).unwrap_err();
        assert!(matches!(err, VoxaError::Limit(_)));
    }
}
