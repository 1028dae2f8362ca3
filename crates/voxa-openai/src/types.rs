// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the OpenAI-compatible endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use voxa_core::types::TextAnalysis;

// --- Chat completions ---

#[derive(Debug, Clone, Serialize)]
pub struct ApiChatRequest {
    pub model: String,
    pub messages: Vec<ApiChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiChatResponse {
    pub id: String,
    pub choices: Vec<ApiChoice>,
    #[serde(default)]
    pub usage: ApiUsage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiChoice {
    pub message: ApiChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

/// One streaming chunk (`data:` payload) from a chat completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiChatChunk {
    pub choices: Vec<ApiChunkChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiChunkChoice {
    #[serde(default)]
    pub delta: ApiDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiDelta {
    #[serde(default)]
    pub content: Option<String>,
}

// --- Transcription ---

/// `verbose_json` transcription response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTranscription {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
}

// --- Moderation / classification ---

#[derive(Debug, Clone, Serialize)]
pub struct ApiModerationRequest {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiModerationResponse {
    pub results: Vec<ApiModerationResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiModerationResult {
    #[serde(default)]
    pub categories: BTreeMap<String, bool>,
    #[serde(default)]
    pub category_scores: BTreeMap<String, f64>,
    /// Age-rating and toxicity block attached by the moderation service.
    #[serde(default)]
    pub analysis: TextAnalysis,
}

// --- Errors ---

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_response_parses() {
        let json = r#"{
            "id": "chatcmpl-1",
            "choices": [{"message": {"role": "assistant", "content": "Hi"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        }"#;
        let resp: ApiChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.choices[0].message.content, "Hi");
        assert_eq!(resp.usage.prompt_tokens, 12);
        assert_eq!(resp.usage.completion_tokens, 4);
    }

    #[test]
    fn chunk_parses_with_and_without_content() {
        let with: ApiChatChunk = serde_json::from_str(
            r#"{"choices":[{"delta":{"content":"He"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(with.choices[0].delta.content.as_deref(), Some("He"));

        let done: ApiChatChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap();
        assert!(done.choices[0].delta.content.is_none());
        assert_eq!(done.choices[0].finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn moderation_response_parses_with_analysis() {
        let json = r#"{
            "results": [{
                "categories": {"violence": true, "sexual": false},
                "category_scores": {"violence": 0.91},
                "analysis": {
                    "assessment_age": 13,
                    "assessment_translation": "violent themes",
                    "movie_rating": "PG-13",
                    "tv_rating": "TV-14",
                    "esrb_rating": "T",
                    "pegi_rating": "16",
                    "toxic": false
                }
            }]
        }"#;
        let resp: ApiModerationResponse = serde_json::from_str(json).unwrap();
        let r = &resp.results[0];
        assert!(r.categories["violence"]);
        assert_eq!(r.analysis.assessment_age, 13);
        assert_eq!(r.analysis.pegi_rating, "16");
    }

    #[test]
    fn moderation_response_tolerates_missing_analysis() {
        let json = r#"{"results": [{"categories": {"hate": false}}]}"#;
        let resp: ApiModerationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.results[0].analysis.assessment_age, 0);
    }
}
