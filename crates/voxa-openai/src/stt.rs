// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcription capability over the audio-transcriptions endpoint.
//!
//! The audio stream is uploaded as a streaming multipart body, so the
//! request reads the caller's tee'd pipe to EOF without buffering whole
//! clips. Streaming bodies cannot be replayed, so there is no retry here.

use async_trait::async_trait;
use tokio_util::io::ReaderStream;
use voxa_core::types::{SttFormat, Transcript};
use voxa_core::{ByteStream, CallCtx, Transcriber, VoxaError};

use crate::client::OpenAiClient;
use crate::types::ApiTranscription;

const TRANSCRIPTION_PATH: &str = "/v1/audio/transcriptions";

/// Rate-limit bucket name for transcription requests.
pub const STT_BUCKET: &str = "whisper";

/// Transcription adapter over an [`OpenAiClient`].
#[derive(Clone)]
pub struct OpenAiTranscriber {
    client: OpenAiClient,
    model: String,
}

impl OpenAiTranscriber {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self { client, model: model.into() }
    }
}

fn mime_for(format: SttFormat) -> &'static str {
    match format {
        SttFormat::Mp3 | SttFormat::Mpga => "audio/mpeg",
        SttFormat::Mp4 | SttFormat::M4a => "audio/mp4",
        SttFormat::Mpeg => "video/mpeg",
        SttFormat::Wav => "audio/wav",
        SttFormat::Webm => "audio/webm",
        SttFormat::Flac => "audio/flac",
        SttFormat::Ogg => "audio/ogg",
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(
        &self,
        ctx: &CallCtx,
        audio: ByteStream,
        format: SttFormat,
        language_hint: Option<&str>,
    ) -> Result<Transcript, VoxaError> {
        let part = reqwest::multipart::Part::stream(reqwest::Body::wrap_stream(
            ReaderStream::new(audio),
        ))
        .file_name(format!("audio.{}", format.extension()))
        .mime_str(mime_for(format))
        .map_err(|e| VoxaError::Internal(format!("multipart mime: {e}")))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");
        if let Some(language) = language_hint {
            form = form.text("language", language.to_string());
        }

        let request = self
            .client
            .http()
            .post(self.client.url(TRANSCRIPTION_PATH))
            .multipart(form);
        let response = self.client.send_once(ctx, STT_BUCKET, request).await?;

        let body = ctx
            .run(response.text())
            .await?
            .map_err(|e| VoxaError::connection(format!("failed to read response body: {e}")))?;
        let parsed: ApiTranscription = serde_json::from_str(&body).map_err(|e| {
            VoxaError::connection(format!("failed to parse transcription response: {e}"))
        })?;

        Ok(Transcript {
            text: parsed.text.trim().to_string(),
            detected_language: parsed.language,
        })
    }
}
