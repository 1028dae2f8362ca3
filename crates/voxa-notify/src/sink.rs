// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable moderation notifications.
//!
//! A triggered turn records one notification document under the profile;
//! the UI later patches the `read`/`inactive` flags.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use voxa_core::types::ModerationResult;
use voxa_core::{CallCtx, DocumentStore, FieldOp, VoxaError};

/// A persisted notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    /// Notification type; currently always `moderation`.
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub inactive: bool,
    #[serde(default)]
    pub read: bool,
    pub payload: ModerationPayload,
}

/// What the moderation evaluator decided, plus turn context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModerationPayload {
    pub character: String,
    pub audio_id: String,
    /// Sequence id of the entry, 0 for turns that produced none.
    #[serde(default)]
    pub session_id: u64,
    pub user_text: String,
    pub moderation: ModerationResult,
}

/// Writes and patches notification documents.
pub struct NotificationSink {
    docs: Arc<dyn DocumentStore>,
}

impl NotificationSink {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self { docs }
    }

    fn path(account_id: &str, profile_id: &str, id: &str) -> String {
        format!("accounts/{account_id}/profiles/{profile_id}/notifications/{id}")
    }

    /// Records a moderation event, returning the new notification id.
    pub async fn post_moderation(
        &self,
        ctx: &CallCtx,
        account_id: &str,
        profile_id: &str,
        payload: ModerationPayload,
    ) -> Result<String, VoxaError> {
        let notification = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            kind: "moderation".to_string(),
            timestamp: Utc::now(),
            inactive: false,
            read: false,
            payload,
        };
        let path = Self::path(account_id, profile_id, &notification.id);
        let doc = serde_json::to_value(&notification)
            .map_err(|e| VoxaError::Internal(format!("encode notification: {e}")))?;
        self.docs.create(ctx, &path, doc).await?;
        tracing::info!(id = %notification.id, profile_id, "moderation notification recorded");
        Ok(notification.id)
    }

    pub async fn get(
        &self,
        ctx: &CallCtx,
        account_id: &str,
        profile_id: &str,
        id: &str,
    ) -> Result<Notification, VoxaError> {
        let path = Self::path(account_id, profile_id, id);
        let doc = self
            .docs
            .get(ctx, &path)
            .await?
            .ok_or_else(|| VoxaError::NotFound(format!("notification {id}")))?;
        serde_json::from_value(doc)
            .map_err(|e| VoxaError::Consistency(format!("malformed notification {id}: {e}")))
    }

    /// Patches the read flag.
    pub async fn mark_read(
        &self,
        ctx: &CallCtx,
        account_id: &str,
        profile_id: &str,
        id: &str,
        read: bool,
    ) -> Result<(), VoxaError> {
        self.docs
            .update(
                ctx,
                &Self::path(account_id, profile_id, id),
                vec![("read".to_string(), FieldOp::Set(json!(read)))],
            )
            .await
    }

    /// Patches the inactive flag.
    pub async fn mark_inactive(
        &self,
        ctx: &CallCtx,
        account_id: &str,
        profile_id: &str,
        id: &str,
        inactive: bool,
    ) -> Result<(), VoxaError> {
        self.docs
            .update(
                ctx,
                &Self::path(account_id, profile_id, id),
                vec![("inactive".to_string(), FieldOp::Set(json!(inactive)))],
            )
            .await
    }
}
