// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt construction for the Voxa backend.

pub mod builder;
pub mod tokens;

pub use builder::{BuiltPrompt, PromptInput, build_prompt};
pub use tokens::{
    ESCALATION_LIMIT, HARD_LIMIT, LARGE_MODEL, SMALL_MODEL, count_messages, count_text,
    select_model,
};
