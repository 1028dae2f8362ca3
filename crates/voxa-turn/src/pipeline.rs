// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-turn state machine.
//!
//! One turn runs admit → transcribe → moderate → respond → persist →
//! charge → close. The canned branch (unintelligible input, triggered
//! moderation, timeout, over-long answer) short-circuits the LLM and the
//! charge: canned turns are never billed. The orchestrator is the single
//! writer per (profile, character); every external call receives a child
//! cancellation context.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use voxa_core::tee::{DEFAULT_TEE_BUFFER, tee};
use voxa_core::types::{SttFormat, SynthesisRequest};
use voxa_core::{
    BlobStore, ByteStream, CallCtx, ChatProvider, Classifier, EmailTransport, Synthesizer,
    Transcriber, VoxaError,
};
use voxa_billing::BillingGate;
use voxa_moderation::evaluate;
use voxa_notify::{ModerationPayload, NotificationSink, render_moderation_email};
use voxa_prompt::{PromptInput, build_prompt};
use voxa_registry::{CharacterDef, CharacterPrefs, Localization, Profile, Registry, section};
use voxa_session::{Entry, SessionScope, SessionStore, UserAudio};

use crate::postprocess::postprocess_response;
use crate::state::{
    AUDIO_ID_MODERATION, AUDIO_ID_UNINTELLIGIBLE, CloseOutcome, RespondOptions, TextInput,
    TurnState, TurnText, TurnTicket,
};

/// Default voice parameters when a character does not override them.
const DEFAULT_STABILITY: f32 = 0.5;
const DEFAULT_SIMILARITY_BOOST: f32 = 0.75;
const DEFAULT_STYLE_EXAGGERATION: f32 = 0.0;

/// Everything loaded once per request about the turn's parties.
struct TurnContext {
    account: voxa_registry::Account,
    profile: Profile,
    prefs: CharacterPrefs,
    character: Arc<CharacterDef>,
    localization: Arc<Localization>,
    mode_name: String,
    tier: String,
}

impl TurnContext {
    fn timeout(&self, default: Duration) -> Duration {
        self.character
            .mode(&self.mode_name)
            .and_then(|m| m.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(default)
    }

    /// Canned moderation reply keyed by the listener's age.
    fn moderation_response(&self) -> String {
        let key = if self.profile.response_age > 12 {
            "moderation_response_1"
        } else {
            "moderation_response_2"
        };
        self.localization.get_or_builtin(section::PREDEFINED, key)
    }

    fn voice_id(&self) -> Result<String, VoxaError> {
        if let Some(voice) = &self.prefs.voice {
            return Ok(voice.clone());
        }
        self.character
            .voice_for(&self.prefs.language)
            .map(str::to_string)
            .ok_or_else(|| {
                VoxaError::Config(format!("character {} has no voice", self.character.short_name))
            })
    }
}

/// The turn orchestrator.
pub struct TurnPipeline {
    blobs: Arc<dyn BlobStore>,
    sessions: Arc<SessionStore>,
    registry: Arc<Registry>,
    billing: Arc<BillingGate>,
    notifications: Arc<NotificationSink>,
    email: Option<Arc<dyn EmailTransport>>,
    transcriber: Arc<dyn Transcriber>,
    chat: Arc<dyn ChatProvider>,
    synthesizer: Arc<dyn Synthesizer>,
    classifier: Arc<dyn Classifier>,
    default_timeout: Duration,
}

impl TurnPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        sessions: Arc<SessionStore>,
        registry: Arc<Registry>,
        billing: Arc<BillingGate>,
        notifications: Arc<NotificationSink>,
        email: Option<Arc<dyn EmailTransport>>,
        transcriber: Arc<dyn Transcriber>,
        chat: Arc<dyn ChatProvider>,
        synthesizer: Arc<dyn Synthesizer>,
        classifier: Arc<dyn Classifier>,
        default_timeout_secs: u64,
    ) -> Self {
        Self {
            blobs,
            sessions,
            registry,
            billing,
            notifications,
            email,
            transcriber,
            chat,
            synthesizer,
            classifier,
            default_timeout: Duration::from_secs(default_timeout_secs),
        }
    }

    async fn load(&self, ctx: &CallCtx, scope: &SessionScope) -> Result<TurnContext, VoxaError> {
        let account = self.registry.account(ctx, &scope.account_id).await?;
        let profile = self
            .registry
            .profile(ctx, &scope.account_id, &scope.profile_id)
            .await?;
        let prefs = profile.prefs_for(&scope.character);
        let character = self
            .registry
            .character(ctx, &scope.character, &prefs.language)
            .await?;
        let localization = self.registry.localization(ctx, &prefs.language).await?;

        let mode_name = prefs.mode.clone();
        let tier = character
            .mode(&mode_name)
            .ok_or_else(|| VoxaError::NotFound(format!("mode {mode_name}")))?
            .tier()
            .to_string();

        Ok(TurnContext {
            account,
            profile,
            prefs,
            character,
            localization,
            mode_name,
            tier,
        })
    }

    /// Admits one speech utterance: billing gate, then STT with the audio
    /// tee'd to blob storage, then moderation.
    ///
    /// Empty transcripts return the `"0"` sentinel and no session state.
    pub async fn start_turn_audio(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        format: SttFormat,
        audio: ByteStream,
    ) -> Result<TurnTicket, VoxaError> {
        let tc = self.load(ctx, scope).await?;
        self.billing.admit(ctx, &tc.account, &tc.tier).await?;

        let audio_id = uuid::Uuid::new_v4().to_string();
        let t0 = Utc::now();
        debug!(%audio_id, state = %TurnState::Admitted, "turn admitted");

        // Recognition and upload share the stream through a tee; the turn
        // proceeds once STT completes while the upload may still drain.
        let blob_path = scope.user_audio_blob(t0, &audio_id, format.extension());
        let (stt_side, blob_side) = tee(audio, DEFAULT_TEE_BUFFER);
        {
            let blobs = Arc::clone(&self.blobs);
            let path = blob_path.clone();
            tokio::spawn(async move {
                let upload_ctx = CallCtx::unbounded();
                match blobs.put(&upload_ctx, &path, blob_side).await {
                    Ok(bytes) => debug!(%path, bytes, "user audio persisted"),
                    Err(e) => warn!(%path, error = %e, "user audio upload failed (non-fatal)"),
                }
            });
        }

        let hint = tc.prefs.language.get(..2).map(str::to_string);
        let transcript = self
            .transcriber
            .transcribe(&ctx.child(), stt_side, format, hint.as_deref())
            .await?;
        debug!(%audio_id, state = %TurnState::Transcribed, "utterance transcribed");

        if transcript.text.is_empty() {
            info!(%audio_id, "unintelligible utterance, canned path");
            return Ok(TurnTicket {
                audio_id: AUDIO_ID_UNINTELLIGIBLE.to_string(),
                text: String::new(),
                timestamp: t0,
                detected_language: transcript.detected_language,
                mode: tc.mode_name,
            });
        }

        let user_audio = UserAudio {
            audio_id: audio_id.clone(),
            timestamp: t0,
            detected_language: transcript.detected_language.clone(),
            predefined: false,
            mode: tc.mode_name.clone(),
            moderation: None,
            blob_path: Some(blob_path),
            blob_ext: Some(format.extension().to_string()),
            session_id: 0,
            text: transcript.text.clone(),
            notification_id: None,
        };
        self.sessions.record_user_audio(ctx, scope, &user_audio).await?;

        self.moderate(ctx, scope, &tc, &audio_id, &transcript.text).await?;

        Ok(TurnTicket {
            audio_id,
            text: transcript.text,
            timestamp: t0,
            detected_language: transcript.detected_language,
            mode: tc.mode_name,
        })
    }

    /// Admits one text utterance; the predefined variant resolves the text
    /// through the locale's Predefined table and skips moderation.
    pub async fn start_turn_text(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        input: TextInput,
    ) -> Result<TurnTicket, VoxaError> {
        let tc = self.load(ctx, scope).await?;
        self.billing.admit(ctx, &tc.account, &tc.tier).await?;

        let text = if input.predefined {
            tc.localization.get_or_builtin(section::PREDEFINED, &input.text)
        } else {
            input.text.trim().to_string()
        };

        let audio_id = uuid::Uuid::new_v4().to_string();
        let t0 = Utc::now();
        debug!(%audio_id, state = %TurnState::Admitted, predefined = input.predefined, "turn admitted");

        if text.is_empty() {
            return Ok(TurnTicket {
                audio_id: AUDIO_ID_UNINTELLIGIBLE.to_string(),
                text: String::new(),
                timestamp: t0,
                detected_language: None,
                mode: tc.mode_name,
            });
        }

        let user_audio = UserAudio {
            audio_id: audio_id.clone(),
            timestamp: t0,
            detected_language: None,
            predefined: input.predefined,
            mode: tc.mode_name.clone(),
            moderation: None,
            blob_path: None,
            blob_ext: None,
            session_id: 0,
            text: text.clone(),
            notification_id: None,
        };
        self.sessions.record_user_audio(ctx, scope, &user_audio).await?;

        if !input.predefined {
            self.moderate(ctx, scope, &tc, &audio_id, &text).await?;
        }

        Ok(TurnTicket {
            audio_id,
            text,
            timestamp: t0,
            detected_language: None,
            mode: tc.mode_name,
        })
    }

    /// Classifies and evaluates the utterance when the profile opted in,
    /// storing the verdict on `last_user_audio`.
    async fn moderate(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        tc: &TurnContext,
        audio_id: &str,
        text: &str,
    ) -> Result<(), VoxaError> {
        if !tc.profile.moderate {
            return Ok(());
        }
        let classification = self
            .classifier
            .classify(&ctx.child(), text, &tc.prefs.language)
            .await?;
        let result = evaluate(&classification, &tc.profile, &tc.localization);
        debug!(
            audio_id,
            triggered = result.triggered,
            state = %TurnState::Moderated,
            "utterance moderated"
        );
        self.sessions
            .set_user_audio_moderation(ctx, scope, audio_id, &result)
            .await
    }

    /// Produces the assistant audio for an admitted turn.
    ///
    /// Sentinel ids and moderation-triggered turns take the canned branch;
    /// everything else runs prompt → chat → post-process → persist → TTS
    /// → charge under the mode's deadline.
    pub async fn respond(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        audio_id: &str,
        opts: RespondOptions,
    ) -> Result<ByteStream, VoxaError> {
        let tc = self.load(ctx, scope).await?;

        if audio_id == AUDIO_ID_UNINTELLIGIBLE {
            return self.speak_canned(ctx, &tc, "dont_understand", &opts).await;
        }
        if audio_id == AUDIO_ID_MODERATION {
            let text = tc.moderation_response();
            return self.speak(ctx, &tc, &text, &opts).await;
        }

        let user_audio = self
            .sessions
            .get_user_audio(ctx, scope, audio_id)
            .await?
            .ok_or_else(|| VoxaError::NotFound(format!("audio {audio_id}")))?;

        if user_audio
            .moderation
            .as_ref()
            .is_some_and(|m| m.triggered)
        {
            return self.respond_moderated(ctx, scope, &tc, &user_audio, &opts).await;
        }

        // A repeated GET for an already-persisted turn replays the stored
        // response without re-appending or re-charging.
        if user_audio.session_id != 0 {
            let entry = self.entry_for(ctx, scope, &user_audio).await?;
            return self.speak(ctx, &tc, &entry.assistant, &opts).await;
        }

        self.respond_generated(ctx, scope, &tc, &user_audio, &opts).await
    }

    /// The canned branch for a moderation-triggered utterance: the entry
    /// is stored with the localized reply as assistant text, nothing is
    /// charged, and `close` will raise the notification.
    async fn respond_moderated(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        tc: &TurnContext,
        user_audio: &UserAudio,
        opts: &RespondOptions,
    ) -> Result<ByteStream, VoxaError> {
        let text = tc.moderation_response();

        if user_audio.session_id == 0 {
            let entry = Entry {
                user: user_audio.text.clone(),
                assistant: text.clone(),
                mode: tc.mode_name.clone(),
                timestamp: Utc::now(),
                ..Entry::default()
            };
            let sid = self
                .sessions
                .append_entry(ctx, scope, &user_audio.audio_id, entry)
                .await?;
            debug!(audio_id = %user_audio.audio_id, sid, state = %TurnState::Canned, "moderated turn persisted");
        }

        self.speak(ctx, &tc, &text, opts).await
    }

    async fn respond_generated(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        tc: &TurnContext,
        user_audio: &UserAudio,
        opts: &RespondOptions,
    ) -> Result<ByteStream, VoxaError> {
        let turn_ctx = ctx.child_with_timeout(tc.timeout(self.default_timeout));

        let session = self.sessions.get_latest(ctx, scope).await?;
        let mut built = build_prompt(
            &PromptInput {
                character: &tc.character,
                mode_name: &tc.mode_name,
                profile: &tc.profile,
                session: &session,
                user_text: &user_audio.text,
                language: &tc.prefs.language,
                localization: &tc.localization,
                include_history: !user_audio.predefined,
            },
            &mut rand::thread_rng(),
        )?;
        if let Some(model) = &opts.ttt_model {
            built.model = model.clone();
        }

        let response = match self
            .chat
            .complete(
                &turn_ctx,
                voxa_core::types::ChatRequest {
                    model: built.model,
                    messages: built.messages,
                    creativity: built.creativity,
                    max_tokens: built.max_tokens,
                },
            )
            .await
        {
            Ok(response) => response,
            Err(VoxaError::DeadlineExceeded { duration }) => {
                warn!(audio_id = %user_audio.audio_id, ?duration, "chat deadline exceeded");
                return self.speak_canned(ctx, tc, "response_took_too_long", opts).await;
            }
            Err(e) => return Err(e),
        };
        debug!(audio_id = %user_audio.audio_id, state = %TurnState::Responded, "chat completed");

        let text = postprocess_response(&response.text, &tc.profile);
        let now = Utc::now();
        let entry = Entry {
            user: user_audio.text.clone(),
            assistant: text.clone(),
            mode: tc.mode_name.clone(),
            timestamp: now,
            prompt_tokens: response.usage.prompt,
            response_tokens: response.usage.response,
            ..Entry::default()
        };
        let sid = self
            .sessions
            .append_entry(ctx, scope, &user_audio.audio_id, entry)
            .await?;
        debug!(audio_id = %user_audio.audio_id, sid, state = %TurnState::Persisted, "entry appended");

        let stream = match self.synthesize(&turn_ctx, tc, &text, opts).await {
            Ok(stream) => stream,
            Err(VoxaError::Limit(msg)) => {
                warn!(audio_id = %user_audio.audio_id, msg, "answer too long for synthesis");
                return self.speak_canned(ctx, tc, "answer_too_long", opts).await;
            }
            Err(VoxaError::DeadlineExceeded { duration }) => {
                warn!(audio_id = %user_audio.audio_id, ?duration, "synthesis deadline exceeded");
                return self.speak_canned(ctx, tc, "response_took_too_long", opts).await;
            }
            Err(e) => return Err(e),
        };

        // Predefined turns are never billed; charge failures never
        // invalidate the stored response.
        if !user_audio.predefined {
            match self
                .billing
                .deduct(
                    ctx,
                    &tc.account,
                    &tc.tier,
                    &tc.profile.notifications.emails,
                    &tc.localization,
                )
                .await
            {
                Ok(_) => debug!(audio_id = %user_audio.audio_id, state = %TurnState::Charged, tier = %tc.tier, "turn charged"),
                Err(e) => warn!(audio_id = %user_audio.audio_id, error = %e, "charge failed (response kept)"),
            }
        }

        // Non-passthrough formats tee to blob storage; the entry's audio
        // path is patched once the upload lands.
        if opts.format.is_passthrough() {
            return Ok(stream);
        }
        let (client_side, persist_side) = tee(stream, DEFAULT_TEE_BUFFER);
        let blob_path = scope.assistant_audio_blob(now, sid, user_audio.predefined, opts.format.extension());
        {
            let blobs = Arc::clone(&self.blobs);
            let sessions = Arc::clone(&self.sessions);
            let scope = scope.clone();
            let ext = opts.format.extension().to_string();
            let predefined = user_audio.predefined;
            tokio::spawn(async move {
                let upload_ctx = CallCtx::unbounded();
                match blobs.put(&upload_ctx, &blob_path, persist_side).await {
                    Ok(bytes) => {
                        debug!(path = %blob_path, bytes, "assistant audio persisted");
                        if let Err(e) = sessions
                            .set_assistant_audio(&upload_ctx, &scope, sid, predefined, &ext, &blob_path)
                            .await
                        {
                            warn!(error = %e, "assistant audio patch failed (non-fatal)");
                        }
                    }
                    Err(e) => warn!(path = %blob_path, error = %e, "assistant audio upload failed (non-fatal)"),
                }
            });
        }
        Ok(client_side)
    }

    /// The entry a user audio points at, honouring the predefined map.
    async fn entry_for(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        user_audio: &UserAudio,
    ) -> Result<Entry, VoxaError> {
        if user_audio.predefined {
            let session = self.sessions.get_latest(ctx, scope).await?;
            return session
                .predefined_entries
                .get(&voxa_session::seq_key(user_audio.session_id))
                .cloned()
                .ok_or_else(|| {
                    VoxaError::Consistency(format!(
                        "predefined entry {} missing",
                        user_audio.session_id
                    ))
                });
        }
        self.sessions
            .get_entry_by_id(ctx, scope, user_audio.session_id)
            .await
    }

    async fn synthesize(
        &self,
        ctx: &CallCtx,
        tc: &TurnContext,
        text: &str,
        opts: &RespondOptions,
    ) -> Result<ByteStream, VoxaError> {
        self.synthesizer
            .synthesize(
                &ctx.child(),
                SynthesisRequest {
                    text: text.to_string(),
                    voice_id: tc.voice_id()?,
                    language: tc.prefs.language.clone(),
                    format: opts.format,
                    optimize_stream_latency: opts.optimize_stream_latency,
                    stability: DEFAULT_STABILITY,
                    similarity_boost: DEFAULT_SIMILARITY_BOOST,
                    style_exaggeration: DEFAULT_STYLE_EXAGGERATION,
                },
            )
            .await
    }

    async fn speak(
        &self,
        ctx: &CallCtx,
        tc: &TurnContext,
        text: &str,
        opts: &RespondOptions,
    ) -> Result<ByteStream, VoxaError> {
        self.synthesize(ctx, tc, text, opts).await
    }

    /// Speaks a Predefined-table string. Canned clips are never persisted
    /// and never charged.
    async fn speak_canned(
        &self,
        ctx: &CallCtx,
        tc: &TurnContext,
        key: &str,
        opts: &RespondOptions,
    ) -> Result<ByteStream, VoxaError> {
        let text = tc.localization.get_or_builtin(section::PREDEFINED, key);
        debug!(key, state = %TurnState::Canned, "speaking canned response");
        self.speak(ctx, tc, &text, opts).await
    }

    /// Resolves the text form of a turn: the canned strings for the
    /// sentinel ids, otherwise the stored entry.
    pub async fn get_text(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        audio_id: &str,
    ) -> Result<TurnText, VoxaError> {
        let tc = self.load(ctx, scope).await?;
        if audio_id == AUDIO_ID_UNINTELLIGIBLE {
            return Ok(TurnText::Canned {
                text: tc.localization.get_or_builtin(section::PREDEFINED, "dont_understand"),
            });
        }
        if audio_id == AUDIO_ID_MODERATION {
            return Ok(TurnText::Canned { text: tc.moderation_response() });
        }

        let user_audio = self
            .sessions
            .get_user_audio(ctx, scope, audio_id)
            .await?
            .ok_or_else(|| VoxaError::NotFound(format!("audio {audio_id}")))?;
        if user_audio.session_id == 0 {
            return Err(VoxaError::NotFound(format!("audio {audio_id} has no entry yet")));
        }
        let entry = self.entry_for(ctx, scope, &user_audio).await?;
        Ok(TurnText::Entry(Box::new(entry)))
    }

    /// The moderation verdict for an utterance; `None` when the profile
    /// has moderation disabled.
    pub async fn get_moderation(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        audio_id: &str,
    ) -> Result<Option<voxa_core::types::ModerationResult>, VoxaError> {
        let tc = self.load(ctx, scope).await?;
        if !tc.profile.moderate {
            return Ok(None);
        }
        let user_audio = self
            .sessions
            .get_user_audio(ctx, scope, audio_id)
            .await?
            .ok_or_else(|| VoxaError::NotFound(format!("audio {audio_id}")))?;
        Ok(Some(user_audio.moderation.unwrap_or_default()))
    }

    /// Closes a turn: copies the user audio into its entry, applies the
    /// moderation rewrite, raises the notification, and ships email.
    pub async fn close(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        audio_id: &str,
    ) -> Result<CloseOutcome, VoxaError> {
        let tc = self.load(ctx, scope).await?;
        let user_audio = self.sessions.update_last_user_audio(ctx, scope, audio_id).await?;

        let triggered = user_audio
            .moderation
            .as_ref()
            .is_some_and(|m| m.triggered);
        if !triggered || user_audio.predefined {
            debug!(audio_id, state = %TurnState::Closed, "turn closed");
            return Ok(CloseOutcome::default());
        }

        let moderation = user_audio.moderation.clone().unwrap_or_default();
        if user_audio.session_id != 0 {
            self.sessions
                .replace_assistant(ctx, scope, user_audio.session_id, &tc.moderation_response())
                .await?;
        }

        let notification_id = self
            .notifications
            .post_moderation(
                ctx,
                &scope.account_id,
                &scope.profile_id,
                ModerationPayload {
                    character: scope.character.clone(),
                    audio_id: audio_id.to_string(),
                    session_id: user_audio.session_id,
                    user_text: user_audio.text.clone(),
                    moderation: moderation.clone(),
                },
            )
            .await?;
        self.sessions
            .set_notification_id(ctx, scope, user_audio.session_id, audio_id, &notification_id)
            .await?;

        let mut email_sent = false;
        let recipients = &tc.profile.notifications.emails;
        if let (Some(transport), false) = (&self.email, recipients.is_empty()) {
            let mut message = render_moderation_email(
                &tc.profile.name,
                &tc.character.short_name,
                &moderation.reasons,
                &user_audio.text,
                user_audio.timestamp,
                &tc.localization,
            );
            message.to = recipients.clone();
            match transport.send(message).await {
                Ok(()) => email_sent = true,
                Err(e) => warn!(audio_id, error = %e, "moderation email failed (non-fatal)"),
            }
        }

        info!(
            audio_id,
            %notification_id,
            email_sent,
            state = %TurnState::Closed,
            "moderated turn closed"
        );
        Ok(CloseOutcome {
            moderation_email_sent: email_sent,
            notification_id: Some(notification_id),
        })
    }

    /// Seals the session tail so the next prompt starts with no history.
    pub async fn end_sequence(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
    ) -> Result<Entry, VoxaError> {
        self.sessions.end_sequence(ctx, scope).await
    }
}
