// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `voxa serve` command implementation.
//!
//! Wires the document and blob stores, the registry, billing, the
//! provider adapters, the turn pipeline, and the gateway from the loaded
//! configuration.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use voxa_archive::ArchiveSummariser;
use voxa_billing::BillingGate;
use voxa_config::VoxaConfig;
use voxa_core::{
    BlobStore, BucketConfig, ChatProvider, Classifier, DocumentStore, EmailTransport,
    RateLimiter, Synthesizer, Transcriber, VoxaError,
};
use voxa_elevenlabs::ElevenLabsSynthesizer;
use voxa_gateway::{GatewayState, ServerConfig, start_server};
use voxa_notify::{NotificationSink, SmtpEmailTransport};
use voxa_openai::{OpenAiChat, OpenAiClassifier, OpenAiClient, OpenAiTranscriber, STT_BUCKET};
use voxa_registry::Registry;
use voxa_session::SessionStore;
use voxa_store::{FsBlobStore, SqliteDocumentStore};
use voxa_turn::TurnPipeline;

/// Builds every component and serves until the process exits.
pub async fn run(config: VoxaConfig) -> Result<(), VoxaError> {
    let docs: Arc<dyn DocumentStore> =
        Arc::new(SqliteDocumentStore::open(&config.storage.db_path).await?);
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&config.storage.blob_root));
    info!(db = %config.storage.db_path, blobs = %config.storage.blob_root, "storage ready");

    let limiter = RateLimiter::new();
    limiter.configure(
        &config.openai.chat_model,
        BucketConfig::per_second(config.openai.chat_requests_per_second),
    );
    limiter.configure(
        STT_BUCKET,
        BucketConfig::per_interval(
            config.openai.stt_requests_per_300ms,
            Duration::from_millis(300),
        ),
    );

    let openai_key = config
        .openai
        .api_key
        .clone()
        .ok_or_else(|| VoxaError::Config("openai.api_key is required".into()))?;
    let elevenlabs_key = config
        .elevenlabs
        .api_key
        .clone()
        .ok_or_else(|| VoxaError::Config("elevenlabs.api_key is required".into()))?;

    let openai = OpenAiClient::new(&openai_key, limiter.clone())?;
    let chat: Arc<dyn ChatProvider> = Arc::new(OpenAiChat::new(openai.clone()));
    let transcriber: Arc<dyn Transcriber> = Arc::new(OpenAiTranscriber::new(
        openai.clone(),
        config.openai.stt_model.clone(),
    ));
    let classifier: Arc<dyn Classifier> = Arc::new(OpenAiClassifier::new(openai));
    let synthesizer: Arc<dyn Synthesizer> = Arc::new(ElevenLabsSynthesizer::new(
        &elevenlabs_key,
        config.elevenlabs.tts_model.clone(),
        limiter.clone(),
    )?);

    let email: Option<Arc<dyn EmailTransport>> = match &config.email.smtp_host {
        Some(host) => match SmtpEmailTransport::new(
            host,
            config.email.smtp_username.as_deref(),
            config.email.smtp_password.as_deref(),
            &config.email.from_address,
        ) {
            Ok(transport) => Some(Arc::new(transport)),
            Err(e) => {
                warn!(error = %e, "email transport unavailable, continuing without");
                None
            }
        },
        None => None,
    };

    let registry = Arc::new(Registry::new(
        docs.clone(),
        config.registry.character_version.clone(),
        config.registry.disable_caches,
    ));
    let sessions = Arc::new(
        SessionStore::new(docs.clone())
            .with_audio_grace(chrono::Duration::seconds(config.turn.audio_grace_secs as i64)),
    );
    let billing = Arc::new(BillingGate::new(
        docs.clone(),
        config.billing.tier_costs.clone(),
        config.billing.low_balance_thresholds.clone(),
        email.clone(),
    ));
    let notifications = Arc::new(NotificationSink::new(docs.clone()));

    let pipeline = Arc::new(TurnPipeline::new(
        blobs,
        sessions.clone(),
        registry.clone(),
        billing,
        notifications,
        email,
        transcriber,
        chat.clone(),
        synthesizer,
        classifier,
        config.turn.timeout_secs,
    ));
    let summariser = Arc::new(ArchiveSummariser::new(
        docs,
        sessions.clone(),
        chat,
        config.openai.chat_model.clone(),
    ));

    let state = GatewayState {
        pipeline,
        sessions,
        summariser,
        registry,
    };
    let server = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    start_server(&server, state).await
}
