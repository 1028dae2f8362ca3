// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the conversation and archive routes.
//!
//! Authentication lives in front of this service; handlers address state
//! by the `account_id`/`profile_id`/`character_version` query parameters.

use std::str::FromStr;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::Deserialize;
use tokio_util::io::{ReaderStream, StreamReader};
use voxa_core::types::{OutputFormat, SttFormat};
use voxa_core::{ByteStream, CallCtx, VoxaError};
use voxa_session::SessionScope;
use voxa_turn::{RespondOptions, TextInput};

use crate::error::ApiError;
use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    pub account_id: String,
    pub profile_id: String,
    pub character_version: String,
}

impl ScopeQuery {
    fn scope(&self) -> SessionScope {
        SessionScope::new(&self.account_id, &self.profile_id, &self.character_version)
    }
}

#[derive(Debug, Deserialize)]
pub struct AudioStreamQuery {
    pub account_id: String,
    pub profile_id: String,
    pub character_version: String,
    /// STT container format tag; defaults to `mp3`.
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AudioOutQuery {
    pub account_id: String,
    pub profile_id: String,
    pub character_version: String,
    /// Output format tag; defaults to `mp3_44100_128`.
    pub format: Option<String>,
    #[serde(default)]
    pub optimizing_stream_latency: Option<u8>,
    /// Text-to-text model override.
    pub ttt_model: Option<String>,
    /// Accepted for compatibility; the synthesis model is configured
    /// server-side.
    #[allow(dead_code)]
    pub tts_model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub account_id: String,
    pub profile_id: String,
    pub character_version: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub text: String,
    #[serde(default)]
    pub predefined: bool,
}

fn parse_date(src: &str, value: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| ApiError(VoxaError::bad_request(src, format!("{value:?}: {e}"))))
}

fn parse_stt_format(tag: Option<&str>) -> Result<SttFormat, ApiError> {
    let tag = tag.unwrap_or("mp3");
    SttFormat::from_str(tag)
        .map_err(|_| ApiError(VoxaError::bad_request("format", format!("unknown format {tag:?}"))))
}

fn parse_output_format(tag: Option<&str>) -> Result<OutputFormat, ApiError> {
    let tag = tag.unwrap_or("mp3_44100_128");
    OutputFormat::from_str(tag)
        .map_err(|_| ApiError(VoxaError::bad_request("format", format!("unknown format {tag:?}"))))
}

fn audio_response(format: OutputFormat, stream: ByteStream) -> Response {
    (
        [(header::CONTENT_TYPE, format.content_type())],
        Body::from_stream(ReaderStream::new(stream)),
    )
        .into_response()
}

/// POST /sts/audio/stream — upload one utterance, returns the turn ticket.
pub async fn post_audio_stream(
    State(state): State<GatewayState>,
    Query(query): Query<AudioStreamQuery>,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    let format = parse_stt_format(query.format.as_deref())?;
    let scope = SessionScope::new(&query.account_id, &query.profile_id, &query.character_version);

    let audio: ByteStream = Box::pin(StreamReader::new(
        body.into_data_stream()
            .map_err(|e| std::io::Error::other(format!("request body: {e}"))),
    ));

    let ctx = CallCtx::unbounded();
    let ticket = state
        .pipeline
        .start_turn_audio(&ctx, &scope, format, audio)
        .await?;
    Ok(Json(ticket))
}

/// POST /sts/text — admit one text utterance (predefined variant included).
pub async fn post_text(
    State(state): State<GatewayState>,
    Query(query): Query<ScopeQuery>,
    Json(body): Json<TextBody>,
) -> Result<impl IntoResponse, ApiError> {
    let ctx = CallCtx::unbounded();
    let ticket = state
        .pipeline
        .start_turn_text(
            &ctx,
            &query.scope(),
            TextInput { text: body.text, predefined: body.predefined },
        )
        .await?;
    Ok(Json(ticket))
}

/// GET /sts/audio/{audio_id} — stream the assistant audio.
pub async fn get_audio(
    State(state): State<GatewayState>,
    Path(audio_id): Path<String>,
    Query(query): Query<AudioOutQuery>,
) -> Result<Response, ApiError> {
    let format = parse_output_format(query.format.as_deref())?;
    let scope = SessionScope::new(&query.account_id, &query.profile_id, &query.character_version);
    let opts = RespondOptions {
        format,
        optimize_stream_latency: query.optimizing_stream_latency.unwrap_or(0),
        ttt_model: query.ttt_model.clone(),
    };

    let ctx = CallCtx::unbounded();
    let stream = state.pipeline.respond(&ctx, &scope, &audio_id, opts).await?;
    Ok(audio_response(format, stream))
}

/// GET /sts/text/{audio_id} — the session entry or canned text.
pub async fn get_text(
    State(state): State<GatewayState>,
    Path(audio_id): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ctx = CallCtx::unbounded();
    let text = state
        .pipeline
        .get_text(&ctx, &query.scope(), &audio_id)
        .await?;
    Ok(Json(text))
}

/// GET /sts/moderation/{audio_id} — evaluator result, 204 when the
/// profile has moderation off.
pub async fn get_moderation(
    State(state): State<GatewayState>,
    Path(audio_id): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> Result<Response, ApiError> {
    let ctx = CallCtx::unbounded();
    match state
        .pipeline
        .get_moderation(&ctx, &query.scope(), &audio_id)
        .await?
    {
        Some(result) => Ok(Json(result).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// POST /sts/close/{audio_id} — finish the turn.
pub async fn post_close(
    State(state): State<GatewayState>,
    Path(audio_id): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ctx = CallCtx::unbounded();
    let outcome = state.pipeline.close(&ctx, &query.scope(), &audio_id).await?;
    Ok(Json(outcome))
}

/// PATCH /sts/end-sequence — seal the session tail.
pub async fn patch_end_sequence(
    State(state): State<GatewayState>,
    Query(query): Query<ScopeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ctx = CallCtx::unbounded();
    let entry = state.pipeline.end_sequence(&ctx, &query.scope()).await?;
    Ok(Json(entry))
}

/// GET /archives/index — persisted index plus the live window.
pub async fn get_archive_index(
    State(state): State<GatewayState>,
    Query(query): Query<ScopeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ctx = CallCtx::unbounded();
    let index = state
        .sessions
        .get_archive_index(&ctx, &query.scope())
        .await?;
    Ok(Json(index))
}

/// GET /archives/{id} — one archive's entries.
pub async fn get_archive(
    State(state): State<GatewayState>,
    Path(archive_id): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ctx = CallCtx::unbounded();
    let entries = state
        .sessions
        .get_archive_entries(&ctx, &query.scope(), &archive_id)
        .await?;
    Ok(Json(entries))
}

/// GET /archives?start_date&end_date — entries across the range.
pub async fn get_archives_by_range(
    State(state): State<GatewayState>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let start = parse_date("start_date", &query.start_date)?;
    let end = parse_date("end_date", &query.end_date)?;
    let scope = SessionScope::new(&query.account_id, &query.profile_id, &query.character_version);
    let ctx = CallCtx::unbounded();
    let entries = state
        .sessions
        .get_archive_entries_by_range(&ctx, &scope, start, end)
        .await?;
    Ok(Json(entries))
}

/// GET /archives/summary?start_date&end_date — memoised topic summary.
pub async fn get_summary(
    State(state): State<GatewayState>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let start = parse_date("start_date", &query.start_date)?;
    let end = parse_date("end_date", &query.end_date)?;
    let scope = SessionScope::new(&query.account_id, &query.profile_id, &query.character_version);

    let ctx = CallCtx::unbounded();
    let profile = state
        .registry
        .profile(&ctx, &scope.account_id, &scope.profile_id)
        .await?;
    let prefs = profile.prefs_for(&scope.character);
    let character = state
        .registry
        .character(&ctx, &scope.character, &prefs.language)
        .await?;

    let topics = state
        .summariser
        .summarise(&ctx, &scope, &profile.name, &character.short_name, start, end)
        .await?;
    Ok(Json(topics))
}

/// DELETE /archives/summary — drop the memoised summaries.
pub async fn delete_summary(
    State(state): State<GatewayState>,
    Query(query): Query<ScopeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ctx = CallCtx::unbounded();
    state
        .summariser
        .delete_summaries(&ctx, &query.scope())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /sessions/memory — delete the whole session memory.
pub async fn delete_memory(
    State(state): State<GatewayState>,
    Query(query): Query<ScopeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ctx = CallCtx::unbounded();
    let deleted = state
        .sessions
        .delete_session_memory(&ctx, &query.scope())
        .await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}
