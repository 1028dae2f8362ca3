// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-turn conversation pipeline for the Voxa backend.

pub mod pipeline;
pub mod postprocess;
pub mod state;

pub use pipeline::TurnPipeline;
pub use postprocess::postprocess_response;
pub use state::{
    AUDIO_ID_MODERATION, AUDIO_ID_UNINTELLIGIBLE, CloseOutcome, RespondOptions, TextInput,
    TurnState, TurnText, TurnTicket,
};
