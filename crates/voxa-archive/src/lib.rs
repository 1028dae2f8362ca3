// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-demand summarisation of a conversation date range.
//!
//! Gathers entries across archives and the live window, asks the chat
//! capability for a fixed-schema topic list, and memoises the result in
//! the per-session summary document keyed by the canonical range string.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use voxa_core::types::{ChatMessage, ChatRequest};
use voxa_core::{CallCtx, ChatProvider, DocumentStore, FieldOp, VoxaError};
use voxa_prompt::count_messages;
use voxa_session::{Entry, SessionScope, SessionStore};

/// Token cap on the summarisation prompt.
const SUMMARY_TOKEN_CAP: usize = 12_288;

/// One summarised topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub topic: String,
    pub topic_summary: String,
    pub user_summary: String,
    pub analysis: String,
}

/// Summarises date ranges and memoises results.
pub struct ArchiveSummariser {
    docs: Arc<dyn DocumentStore>,
    sessions: Arc<SessionStore>,
    chat: Arc<dyn ChatProvider>,
    model: String,
}

impl ArchiveSummariser {
    pub fn new(
        docs: Arc<dyn DocumentStore>,
        sessions: Arc<SessionStore>,
        chat: Arc<dyn ChatProvider>,
        model: impl Into<String>,
    ) -> Self {
        Self { docs, sessions, chat, model: model.into() }
    }

    /// `"{startISO} {endISO}"` at seconds precision, UTC.
    pub fn range_key(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        format!(
            "{} {}",
            start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }

    /// Returns the cached summary for the range, computing and storing it
    /// on first request.
    pub async fn summarise(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        profile_name: &str,
        character_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TopicSummary>, VoxaError> {
        if end < start {
            return Err(VoxaError::bad_request("date_range", "end precedes start"));
        }
        let key = Self::range_key(start, end);
        let cache_path = scope.summary_path();

        if let Some(doc) = self.docs.get(ctx, &cache_path).await? {
            if let Some(cached) = doc.get(&key) {
                let topics: Vec<TopicSummary> = serde_json::from_value(cached.clone())
                    .map_err(|e| {
                        VoxaError::Consistency(format!("malformed summary cache {key}: {e}"))
                    })?;
                tracing::debug!(%key, "summary served from cache");
                return Ok(topics);
            }
        }

        let entries = self
            .sessions
            .get_archive_entries_by_range(ctx, scope, start, end)
            .await?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let messages = build_summary_prompt(&entries, profile_name, character_name);
        let token_count = count_messages(&self.model, &messages);
        if token_count > SUMMARY_TOKEN_CAP {
            return Err(VoxaError::Limit(format!(
                "summary prompt of {token_count} tokens exceeds the {SUMMARY_TOKEN_CAP}-token cap"
            )));
        }

        let response = self
            .chat
            .complete(
                ctx,
                ChatRequest {
                    model: self.model.clone(),
                    messages,
                    creativity: 0,
                    max_tokens: 2048,
                },
            )
            .await?;

        // The model must return the schema verbatim (RFC 8259); anything
        // else is unprocessable rather than silently repaired.
        let topics: Vec<TopicSummary> = serde_json::from_str(response.text.trim())
            .map_err(|e| VoxaError::Unprocessable(format!("summary JSON did not parse: {e}")))?;

        self.docs
            .update(
                ctx,
                &cache_path,
                vec![(
                    key.clone(),
                    FieldOp::Set(serde_json::to_value(&topics).map_err(|e| {
                        VoxaError::Internal(format!("encode summary: {e}"))
                    })?),
                )],
            )
            .await?;

        tracing::info!(%key, topics = topics.len(), "summary computed and cached");
        Ok(topics)
    }

    /// Drops every cached summary for the session.
    pub async fn delete_summaries(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
    ) -> Result<(), VoxaError> {
        self.docs.delete(ctx, &scope.summary_path()).await
    }
}

/// Topic count scales with the log of the conversation length.
fn topic_count(entry_count: usize) -> usize {
    ((1.75 * (entry_count as f64).ln()).ceil() as usize).max(1)
}

fn build_summary_prompt(
    entries: &[Entry],
    profile_name: &str,
    character_name: &str,
) -> Vec<ChatMessage> {
    let n = topic_count(entries.len());
    let system = format!(
        "You summarise conversations. Respond with a JSON array of exactly {n} objects, \
         each with the string fields \"topic\", \"topic_summary\", \"user_summary\", and \
         \"analysis\". Respond with the JSON array only.",
    );

    let mut transcript = String::new();
    for entry in entries {
        transcript.push_str(profile_name);
        transcript.push_str(": ");
        transcript.push_str(&entry.user);
        transcript.push('\n');
        transcript.push_str(character_name);
        transcript.push_str(": ");
        transcript.push_str(&entry.assistant);
        transcript.push('\n');
    }

    vec![ChatMessage::system(system), ChatMessage::user(transcript)]
}
