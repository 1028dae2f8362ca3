// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The append-only-with-rollover conversation log.
//!
//! One `latest` document holds the live window; when it grows past the
//! rollover threshold and the current window is older than a day, the
//! oldest entries move into a dated archive document and the archive index
//! gains a span for them. Rollover re-labels nothing; it only evicts.
//!
//! The turn orchestrator is the single writer per (profile, character);
//! post-append patches (assistant audio paths, notification ids, the
//! moderation rewrite) go through field operations so they compose with
//! that writer.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use voxa_core::types::ModerationResult;
use voxa_core::{CallCtx, DocumentStore, FieldOp, VoxaError};

use crate::models::{
    ArchiveDoc, ArchiveIndex, ArchiveSpan, Entry, LATEST_ARCHIVE_ID, SessionDoc, UserAudio,
    parse_seq, seq_key,
};
use crate::paths::SessionScope;

/// An archive must absorb at least this many entries.
pub const MIN_SESSION_ARCHIVE_ENTRIES: usize = 200;

/// Entries left in `latest` after a rollover.
pub const KEEP_SESSION_ENTRIES: usize = 15;

/// Live-window size that makes a rollover possible.
pub const ROLLOVER_THRESHOLD: usize = MIN_SESSION_ARCHIVE_ENTRIES + KEEP_SESSION_ENTRIES - 1;

/// Minimum age of the current window before it can be archived.
const ARCHIVE_MIN_AGE_HOURS: i64 = 24;

/// Documents deleted per batch when clearing session memory.
const DELETE_BATCH: usize = 50;

/// Store of session documents for all profiles.
pub struct SessionStore {
    docs: Arc<dyn DocumentStore>,
    /// Grace period before stale `last_user_audio` entries are collected.
    audio_grace: Duration,
}

impl SessionStore {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self {
            docs,
            audio_grace: Duration::minutes(5),
        }
    }

    pub fn with_audio_grace(mut self, grace: Duration) -> Self {
        self.audio_grace = grace;
        self
    }

    /// Fetches the `latest` document, creating an empty one if missing.
    pub async fn get_latest(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
    ) -> Result<SessionDoc, VoxaError> {
        let path = scope.latest_path();
        match self.docs.get(ctx, &path).await? {
            Some(doc) => decode(&path, doc),
            None => {
                let doc = SessionDoc {
                    archive: Some(Utc::now()),
                    ..SessionDoc::default()
                };
                // A concurrent creator winning the race is fine.
                match self.docs.create(ctx, &path, encode(&doc)?).await {
                    Ok(()) => Ok(doc),
                    Err(VoxaError::AlreadyExists(_)) => {
                        let raced = self
                            .docs
                            .get(ctx, &path)
                            .await?
                            .ok_or_else(|| VoxaError::Consistency(format!("{path} vanished")))?;
                        decode(&path, raced)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Records an inbound utterance under `last_user_audio`.
    pub async fn record_user_audio(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        audio: &UserAudio,
    ) -> Result<(), VoxaError> {
        // Ensure the document exists before patching a field on it.
        self.get_latest(ctx, scope).await?;
        self.docs
            .update(
                ctx,
                &scope.latest_path(),
                vec![(
                    format!("last_user_audio.{}", audio.audio_id),
                    FieldOp::Set(serde_json::to_value(audio).map_err(encode_err)?),
                )],
            )
            .await
    }

    /// Looks up a pending utterance by audio id.
    pub async fn get_user_audio(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        audio_id: &str,
    ) -> Result<Option<UserAudio>, VoxaError> {
        let doc = self.get_latest(ctx, scope).await?;
        Ok(doc.last_user_audio.get(audio_id).cloned())
    }

    /// Stores a moderation verdict on a pending utterance.
    pub async fn set_user_audio_moderation(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        audio_id: &str,
        moderation: &ModerationResult,
    ) -> Result<(), VoxaError> {
        self.docs
            .update(
                ctx,
                &scope.latest_path(),
                vec![(
                    format!("last_user_audio.{audio_id}.moderation"),
                    FieldOp::Set(serde_json::to_value(moderation).map_err(encode_err)?),
                )],
            )
            .await
    }

    /// Appends one entry, rolling the window over into an archive when the
    /// size and age thresholds are met. Returns the new sequence id.
    pub async fn append_entry(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        audio_id: &str,
        mut entry: Entry,
    ) -> Result<u64, VoxaError> {
        let mut doc = self.get_latest(ctx, scope).await?;
        validate_contiguity(&doc)?;

        let predefined = doc
            .last_user_audio
            .get(audio_id)
            .is_some_and(|ua| ua.predefined);

        if predefined {
            let sid = doc.predefined_entries.len() as u64 + 1;
            entry.id = sid;
            doc.predefined_entries.insert(seq_key(sid), entry);
            if let Some(ua) = doc.last_user_audio.get_mut(audio_id) {
                ua.session_id = sid;
            }
            self.docs.set(ctx, &scope.latest_path(), encode(&doc)?).await?;
            return Ok(sid);
        }

        let num_entries = doc.entries.len();
        if num_entries >= ROLLOVER_THRESHOLD && self.window_expired(&doc, entry.timestamp) {
            self.rollover(ctx, scope, &mut doc, entry.timestamp).await?;
        }

        let sid = doc.next_seq();
        entry.id = sid;
        doc.entries.insert(seq_key(sid), entry);
        if let Some(ua) = doc.last_user_audio.get_mut(audio_id) {
            ua.session_id = sid;
        }
        self.docs.set(ctx, &scope.latest_path(), encode(&doc)?).await?;
        Ok(sid)
    }

    fn window_expired(&self, doc: &SessionDoc, at: DateTime<Utc>) -> bool {
        match doc.last_archive.or(doc.archive) {
            Some(boundary) => at > boundary + Duration::hours(ARCHIVE_MIN_AGE_HOURS),
            None => true,
        }
    }

    /// Moves all but the newest [`KEEP_SESSION_ENTRIES`] entries into a
    /// dated archive document and updates the index.
    async fn rollover(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        doc: &mut SessionDoc,
        at: DateTime<Utc>,
    ) -> Result<(), VoxaError> {
        let moved_count = doc.entries.len() - KEEP_SESSION_ENTRIES;
        let split_key = seq_key(doc.start_entry + moved_count as u64);
        let kept = doc.entries.split_off(&split_key);
        let moved = std::mem::replace(&mut doc.entries, kept);

        let first = moved
            .values()
            .next()
            .ok_or_else(|| VoxaError::Consistency("rollover with no entries".into()))?;
        let last = moved
            .values()
            .next_back()
            .ok_or_else(|| VoxaError::Consistency("rollover with no entries".into()))?;
        let span = ArchiveSpan {
            start_entry: first.id,
            end_entry: last.id,
            start_time: first.timestamp,
            end_time: last.timestamp,
        };

        let archive_id = doc
            .archive
            .unwrap_or(first.timestamp)
            .format("%Y-%m-%d")
            .to_string();
        let archive_path = scope.archive_path(&archive_id);

        // Same-day collisions merge into the existing archive document.
        let mut archive_doc: ArchiveDoc = match self.docs.get(ctx, &archive_path).await? {
            Some(v) => decode(&archive_path, v)?,
            None => ArchiveDoc::default(),
        };
        archive_doc.entries.extend(moved);
        self.docs
            .set(ctx, &archive_path, encode(&archive_doc)?)
            .await?;

        self.docs
            .update(
                ctx,
                &scope.index_path(),
                vec![(
                    format!("entries.{archive_id}"),
                    FieldOp::Set(serde_json::to_value(span).map_err(encode_err)?),
                )],
            )
            .await?;

        doc.start_entry += moved_count as u64;
        doc.last_archive = doc.archive;
        doc.archive = Some(at);

        tracing::info!(
            %archive_id,
            moved = moved_count,
            start_entry = doc.start_entry,
            "session rolled over"
        );
        Ok(())
    }

    /// Copies `last_user_audio[audio_id]` into its entry and collects
    /// stale audio. Returns the audio record.
    ///
    /// Applied as one field-op batch so it composes with the background
    /// assistant-audio patches.
    pub async fn update_last_user_audio(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        audio_id: &str,
    ) -> Result<UserAudio, VoxaError> {
        let doc = self.get_latest(ctx, scope).await?;
        let ua = doc
            .last_user_audio
            .get(audio_id)
            .cloned()
            .ok_or_else(|| VoxaError::NotFound(format!("user audio {audio_id}")))?;

        let mut ops = Vec::new();
        if ua.session_id != 0 {
            let key = seq_key(ua.session_id);
            let map = if ua.predefined { "predefined_entries" } else { "entries" };
            let exists = if ua.predefined {
                doc.predefined_entries.contains_key(&key)
            } else {
                doc.entries.contains_key(&key)
            };
            if !exists {
                return Err(VoxaError::Consistency(format!(
                    "user audio {audio_id} points at missing entry {}",
                    ua.session_id
                )));
            }

            ops.push((format!("{map}.{key}.user"), FieldOp::Set(json!(ua.text))));
            if let (Some(path), Some(ext)) = (&ua.blob_path, &ua.blob_ext) {
                ops.push((format!("{map}.{key}.user_audio.{ext}"), FieldOp::Set(json!(path))));
            }
            if !ua.predefined {
                if let Some(moderation) = &ua.moderation {
                    ops.push((
                        format!("{map}.{key}.moderation"),
                        FieldOp::Set(serde_json::to_value(moderation).map_err(encode_err)?),
                    ));
                }
            }
        }

        // Stale audio is collected on the next close, excluding the current.
        let cutoff = Utc::now() - self.audio_grace;
        for (id, audio) in &doc.last_user_audio {
            if id != audio_id && audio.timestamp <= cutoff {
                ops.push((format!("last_user_audio.{id}"), FieldOp::Delete));
            }
        }

        if !ops.is_empty() {
            self.docs.update(ctx, &scope.latest_path(), ops).await?;
        }
        Ok(ua)
    }

    /// Seals the live window: marks the newest entry `end_sequence` and
    /// returns it.
    pub async fn end_sequence(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
    ) -> Result<Entry, VoxaError> {
        let doc = self.get_latest(ctx, scope).await?;
        let mut entry = doc
            .last_entry()
            .cloned()
            .ok_or_else(|| VoxaError::NotFound("session has no entries".into()))?;

        self.docs
            .update(
                ctx,
                &scope.latest_path(),
                vec![(
                    format!("entries.{}.end_sequence", seq_key(entry.id)),
                    FieldOp::Set(Value::Bool(true)),
                )],
            )
            .await?;
        entry.end_sequence = true;
        Ok(entry)
    }

    /// Fetches an entry by sequence id, from `latest` or the archives.
    pub async fn get_entry_by_id(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        seq: u64,
    ) -> Result<Entry, VoxaError> {
        let doc = self.get_latest(ctx, scope).await?;
        if seq >= doc.start_entry && seq < doc.next_seq() {
            return doc
                .entries
                .get(&seq_key(seq))
                .cloned()
                .ok_or_else(|| VoxaError::Consistency(format!("gap at sequence {seq}")));
        }

        let index = self.load_index(ctx, scope).await?;
        for (archive_id, span) in &index.entries {
            if seq >= span.start_entry && seq <= span.end_entry {
                let path = scope.archive_path(archive_id);
                let archive: ArchiveDoc = match self.docs.get(ctx, &path).await? {
                    Some(v) => decode(&path, v)?,
                    None => {
                        return Err(VoxaError::Consistency(format!(
                            "index references missing archive {archive_id}"
                        )));
                    }
                };
                return archive
                    .entries
                    .get(&seq_key(seq))
                    .cloned()
                    .ok_or_else(|| VoxaError::NotFound(format!("entry {seq}")));
            }
        }
        Err(VoxaError::NotFound(format!("entry {seq}")))
    }

    /// The persisted index merged with a synthetic `"latest"` span.
    pub async fn get_archive_index(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
    ) -> Result<ArchiveIndex, VoxaError> {
        let mut index = self.load_index(ctx, scope).await?;
        let doc = self.get_latest(ctx, scope).await?;
        if let (Some(first), Some(last)) =
            (doc.ordered_entries().next(), doc.last_entry())
        {
            index.entries.insert(
                LATEST_ARCHIVE_ID.to_string(),
                ArchiveSpan {
                    start_entry: first.id,
                    end_entry: last.id,
                    start_time: first.timestamp,
                    end_time: last.timestamp,
                },
            );
        }
        Ok(index)
    }

    async fn load_index(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
    ) -> Result<ArchiveIndex, VoxaError> {
        let path = scope.index_path();
        match self.docs.get(ctx, &path).await? {
            Some(v) => decode(&path, v),
            None => Ok(ArchiveIndex::default()),
        }
    }

    /// Fetches one archive document's entries in id order.
    pub async fn get_archive_entries(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        archive_id: &str,
    ) -> Result<Vec<Entry>, VoxaError> {
        if archive_id == LATEST_ARCHIVE_ID {
            let doc = self.get_latest(ctx, scope).await?;
            return Ok(doc.entries.into_values().collect());
        }
        let path = scope.archive_path(archive_id);
        let archive: ArchiveDoc = match self.docs.get(ctx, &path).await? {
            Some(v) => decode(&path, v)?,
            None => return Err(VoxaError::NotFound(format!("archive {archive_id}"))),
        };
        Ok(archive.entries.into_values().collect())
    }

    /// All entries from archives whose span lies within `[start, end]`,
    /// plus the live window when `end` reaches past its start; filtered to
    /// the range and sorted by id.
    pub async fn get_archive_entries_by_range(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Entry>, VoxaError> {
        let index = self.get_archive_index(ctx, scope).await?;
        let mut out: Vec<Entry> = Vec::new();

        for (archive_id, span) in &index.entries {
            let include = if archive_id == LATEST_ARCHIVE_ID {
                end > span.start_time
            } else {
                span.start_time >= start && span.end_time <= end
            };
            if !include {
                continue;
            }
            let entries = self.get_archive_entries(ctx, scope, archive_id).await?;
            out.extend(
                entries
                    .into_iter()
                    .filter(|e| e.timestamp >= start && e.timestamp <= end),
            );
        }

        out.sort_by_key(|e| e.id);
        Ok(out)
    }

    /// Patches a stored entry's assistant audio blob path.
    pub async fn set_assistant_audio(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        seq: u64,
        predefined: bool,
        ext: &str,
        blob_path: &str,
    ) -> Result<(), VoxaError> {
        let map = if predefined { "predefined_entries" } else { "entries" };
        self.docs
            .update(
                ctx,
                &scope.latest_path(),
                vec![(
                    format!("{map}.{}.assistant_audio.{ext}", seq_key(seq)),
                    FieldOp::Set(json!(blob_path)),
                )],
            )
            .await
    }

    /// Replaces a stored entry's assistant text (the moderation rewrite).
    pub async fn replace_assistant(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        seq: u64,
        text: &str,
    ) -> Result<(), VoxaError> {
        self.docs
            .update(
                ctx,
                &scope.latest_path(),
                vec![(
                    format!("entries.{}.assistant", seq_key(seq)),
                    FieldOp::Set(json!(text)),
                )],
            )
            .await
    }

    /// Stamps a notification id on the entry (when one exists; `seq` 0
    /// means the turn produced none) and on its user audio.
    pub async fn set_notification_id(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
        seq: u64,
        audio_id: &str,
        notification_id: &str,
    ) -> Result<(), VoxaError> {
        let mut ops = vec![(
            format!("last_user_audio.{audio_id}.notification_id"),
            FieldOp::Set(json!(notification_id)),
        )];
        if seq != 0 {
            ops.push((
                format!("entries.{}.notification_id", seq_key(seq)),
                FieldOp::Set(json!(notification_id)),
            ));
        }
        self.docs.update(ctx, &scope.latest_path(), ops).await
    }

    /// Deletes every document under the memory path in bounded batches.
    pub async fn delete_session_memory(
        &self,
        ctx: &CallCtx,
        scope: &SessionScope,
    ) -> Result<usize, VoxaError> {
        let dir = scope.memory_dir();
        let ids = self.docs.list(ctx, &dir).await?;
        let total = ids.len();
        for batch in ids.chunks(DELETE_BATCH) {
            for id in batch {
                self.docs.delete(ctx, &format!("{dir}/{id}")).await?;
            }
            tracing::debug!(batch = batch.len(), "deleted session memory batch");
        }
        Ok(total)
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, VoxaError> {
    serde_json::to_value(value).map_err(encode_err)
}

fn encode_err(e: serde_json::Error) -> VoxaError {
    VoxaError::Internal(format!("encode session document: {e}"))
}

fn decode<T: serde::de::DeserializeOwned>(path: &str, doc: Value) -> Result<T, VoxaError> {
    serde_json::from_value(doc)
        .map_err(|e| VoxaError::Consistency(format!("malformed document {path}: {e}")))
}

/// Sequence ids must be exactly `start_entry .. start_entry + len`.
fn validate_contiguity(doc: &SessionDoc) -> Result<(), VoxaError> {
    for (offset, key) in doc.entries.keys().enumerate() {
        let expected = doc.start_entry + offset as u64;
        if parse_seq(key) != Some(expected) {
            return Err(VoxaError::Consistency(format!(
                "expected sequence {expected}, found key {key}"
            )));
        }
    }
    Ok(())
}
