// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat capability over the chat-completions endpoint, with an SSE
//! streaming variant that yields raw content deltas.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use voxa_core::types::{ChatRequest, ChatResponse, TokenUsage};
use voxa_core::{CallCtx, ChatProvider, ChatStream, VoxaError};

use crate::client::OpenAiClient;
use crate::types::{ApiChatChunk, ApiChatMessage, ApiChatRequest, ApiChatResponse};

const CHAT_PATH: &str = "/v1/chat/completions";

/// Chat adapter over an [`OpenAiClient`].
#[derive(Clone)]
pub struct OpenAiChat {
    client: OpenAiClient,
}

impl OpenAiChat {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }

    fn api_request(request: &ChatRequest, stream: bool) -> ApiChatRequest {
        ApiChatRequest {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| ApiChatMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: request.temperature(),
            max_tokens: request.max_tokens,
            stream,
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiChat {
    async fn complete(
        &self,
        ctx: &CallCtx,
        request: ChatRequest,
    ) -> Result<ChatResponse, VoxaError> {
        let api = Self::api_request(&request, false);
        let url = self.client.url(CHAT_PATH);
        let response = self
            .client
            .send(ctx, &request.model, |http| http.post(&url).json(&api))
            .await?;

        let body = ctx
            .run(response.text())
            .await?
            .map_err(|e| VoxaError::connection(format!("failed to read response body: {e}")))?;
        let parsed: ApiChatResponse = serde_json::from_str(&body)
            .map_err(|e| VoxaError::connection(format!("failed to parse chat response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| VoxaError::Unprocessable("chat response had no choices".into()))?;

        Ok(ChatResponse {
            text: choice.message.content,
            finish_reason: choice.finish_reason,
            usage: TokenUsage {
                prompt: parsed.usage.prompt_tokens,
                response: parsed.usage.completion_tokens,
            },
        })
    }

    async fn stream(&self, ctx: &CallCtx, request: ChatRequest) -> Result<ChatStream, VoxaError> {
        let api = Self::api_request(&request, true);
        let url = self.client.url(CHAT_PATH);
        let response = self
            .client
            .send(ctx, &request.model, |http| http.post(&url).json(&api))
            .await?;

        let deltas = response
            .bytes_stream()
            .eventsource()
            .filter_map(|event| async move {
                match event {
                    Ok(event) if event.data == "[DONE]" => None,
                    Ok(event) => match serde_json::from_str::<ApiChatChunk>(&event.data) {
                        Ok(chunk) => chunk
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|c| c.delta.content)
                            .filter(|text| !text.is_empty())
                            .map(Ok),
                        Err(e) => Some(Err(VoxaError::connection(format!(
                            "failed to parse stream chunk: {e}"
                        )))),
                    },
                    Err(e) => Some(Err(VoxaError::connection(format!("SSE stream error: {e}")))),
                }
            });

        Ok(Box::pin(deltas))
    }
}
