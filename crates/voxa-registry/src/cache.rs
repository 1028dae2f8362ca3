// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide read-through cache over registry documents.
//!
//! Characters are cached by `"{character}_{language}"`, localizations by
//! language. Writers only ever append new keys; `invalidate` clears both
//! maps. The `disable_caches` flag turns every lookup into a store read.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use voxa_core::{CallCtx, DocumentStore, VoxaError};

use crate::localization::{Localization, builtin_en_us};
use crate::types::{Account, CharacterDef, Profile};

/// Registry over the document store with process-wide caches.
pub struct Registry {
    docs: Arc<dyn DocumentStore>,
    /// Character definition version (e.g. `v2`).
    version: String,
    disable_caches: bool,
    characters: DashMap<String, Arc<CharacterDef>>,
    localizations: DashMap<String, Arc<Localization>>,
}

impl Registry {
    pub fn new(docs: Arc<dyn DocumentStore>, version: impl Into<String>, disable_caches: bool) -> Self {
        Self {
            docs,
            version: version.into(),
            disable_caches,
            characters: DashMap::new(),
            localizations: DashMap::new(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Drops every cached definition and string table.
    pub fn invalidate(&self) {
        self.characters.clear();
        self.localizations.clear();
    }

    /// Character definition for (name, language), read-through cached.
    pub async fn character(
        &self,
        ctx: &CallCtx,
        name: &str,
        language: &str,
    ) -> Result<Arc<CharacterDef>, VoxaError> {
        let key = format!("{name}_{language}");
        if !self.disable_caches {
            if let Some(cached) = self.characters.get(&key) {
                return Ok(Arc::clone(&cached));
            }
        }

        let path = format!("registry/{}/characters/{key}", self.version);
        let doc = self
            .docs
            .get(ctx, &path)
            .await?
            .ok_or_else(|| VoxaError::NotFound(format!("character {name} ({language})")))?;
        let def: CharacterDef = decode(&path, doc)?;
        let def = Arc::new(def);

        if !self.disable_caches {
            self.characters.insert(key, Arc::clone(&def));
        }
        Ok(def)
    }

    /// Localization for a language, falling back to `en-US`, then to the
    /// compiled-in table.
    pub async fn localization(
        &self,
        ctx: &CallCtx,
        language: &str,
    ) -> Result<Arc<Localization>, VoxaError> {
        if !self.disable_caches {
            if let Some(cached) = self.localizations.get(language) {
                return Ok(Arc::clone(&cached));
            }
        }

        let loaded = match self.load_localization(ctx, language).await? {
            Some(table) => table,
            None if language != "en-US" => {
                tracing::debug!(language, "locale missing, falling back to en-US");
                self.load_localization(ctx, "en-US")
                    .await?
                    .unwrap_or_else(builtin_en_us)
            }
            None => builtin_en_us(),
        };
        let table = Arc::new(loaded);

        if !self.disable_caches {
            self.localizations
                .insert(language.to_string(), Arc::clone(&table));
        }
        Ok(table)
    }

    async fn load_localization(
        &self,
        ctx: &CallCtx,
        language: &str,
    ) -> Result<Option<Localization>, VoxaError> {
        let path = format!("registry/{}/localization/{language}", self.version);
        match self.docs.get(ctx, &path).await? {
            Some(doc) => Ok(Some(decode(&path, doc)?)),
            None => Ok(None),
        }
    }

    /// Loads a profile document; never cached (owners patch them live).
    pub async fn profile(
        &self,
        ctx: &CallCtx,
        account_id: &str,
        profile_id: &str,
    ) -> Result<Profile, VoxaError> {
        let path = format!("accounts/{account_id}/profiles/{profile_id}");
        let doc = self
            .docs
            .get(ctx, &path)
            .await?
            .ok_or_else(|| VoxaError::NotFound(format!("profile {profile_id}")))?;
        decode(&path, doc)
    }

    /// Loads an account document; never cached.
    pub async fn account(&self, ctx: &CallCtx, account_id: &str) -> Result<Account, VoxaError> {
        let path = format!("accounts/{account_id}");
        let doc = self
            .docs
            .get(ctx, &path)
            .await?
            .ok_or_else(|| VoxaError::NotFound(format!("account {account_id}")))?;
        decode(&path, doc)
    }
}

fn decode<T: serde::de::DeserializeOwned>(path: &str, doc: Value) -> Result<T, VoxaError> {
    serde_json::from_value(doc)
        .map_err(|e| VoxaError::Consistency(format!("malformed document {path}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use voxa_store::SqliteDocumentStore;

    async fn seeded() -> (Registry, Arc<SqliteDocumentStore>) {
        let store = Arc::new(SqliteDocumentStore::open(":memory:").await.unwrap());
        let ctx = CallCtx::unbounded();
        store
            .set(
                &ctx,
                "registry/v2/characters/batman_en-US",
                json!({
                    "short_name": "Batman",
                    "long_name": "The Dark Knight",
                    "model": "gpt-3.5-turbo",
                    "modes": {
                        "conversation": {"prompt": "You are Batman.", "creativity": 40}
                    },
                    "voices": {"en-US": "voice-1"}
                }),
            )
            .await
            .unwrap();
        let registry = Registry::new(store.clone(), "v2", false);
        (registry, store)
    }

    #[tokio::test]
    async fn character_is_read_through_cached() {
        let (registry, store) = seeded().await;
        let ctx = CallCtx::unbounded();

        let def = registry.character(&ctx, "batman", "en-US").await.unwrap();
        assert_eq!(def.short_name, "Batman");

        // Mutate the stored document; the cache must still serve the old one.
        store
            .set(&ctx, "registry/v2/characters/batman_en-US", json!({
                "short_name": "Changed", "long_name": "", "model": "m", "modes": {}
            }))
            .await
            .unwrap();
        let again = registry.character(&ctx, "batman", "en-US").await.unwrap();
        assert_eq!(again.short_name, "Batman");

        // Until invalidated.
        registry.invalidate();
        let fresh = registry.character(&ctx, "batman", "en-US").await.unwrap();
        assert_eq!(fresh.short_name, "Changed");
    }

    #[tokio::test]
    async fn unknown_character_is_not_found() {
        let (registry, _store) = seeded().await;
        let ctx = CallCtx::unbounded();
        let err = registry.character(&ctx, "joker", "en-US").await.unwrap_err();
        assert!(matches!(err, VoxaError::NotFound(_)));
    }

    #[tokio::test]
    async fn localization_falls_back_to_builtin() {
        let (registry, _store) = seeded().await;
        let ctx = CallCtx::unbounded();
        let table = registry.localization(&ctx, "fr-FR").await.unwrap();
        assert!(
            table
                .get_or_builtin(crate::localization::section::PREDEFINED, "dont_understand")
                .contains("didn't catch")
        );
    }

    #[tokio::test]
    async fn localization_prefers_stored_locale() {
        let (registry, store) = seeded().await;
        let ctx = CallCtx::unbounded();
        store
            .set(
                &ctx,
                "registry/v2/localization/de-DE",
                json!({"sections": {"Predefined": {"dont_understand": "Wie bitte?"}}}),
            )
            .await
            .unwrap();
        let table = registry.localization(&ctx, "de-DE").await.unwrap();
        assert_eq!(
            table.get(crate::localization::section::PREDEFINED, "dont_understand"),
            Some("Wie bitte?")
        );
    }

    #[tokio::test]
    async fn disable_caches_bypasses_the_map() {
        let store = Arc::new(SqliteDocumentStore::open(":memory:").await.unwrap());
        let ctx = CallCtx::unbounded();
        store
            .set(&ctx, "registry/v2/characters/dora_en-US", json!({
                "short_name": "Dora", "long_name": "Dora", "model": "m", "modes": {}
            }))
            .await
            .unwrap();
        let registry = Registry::new(store.clone(), "v2", true);

        registry.character(&ctx, "dora", "en-US").await.unwrap();
        store
            .set(&ctx, "registry/v2/characters/dora_en-US", json!({
                "short_name": "Dora2", "long_name": "Dora", "model": "m", "modes": {}
            }))
            .await
            .unwrap();
        let def = registry.character(&ctx, "dora", "en-US").await.unwrap();
        assert_eq!(def.short_name, "Dora2");
    }
}
