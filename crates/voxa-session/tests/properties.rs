// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property tests over the session log: sequence contiguity and rollover
//! conservation hold for arbitrary append patterns.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use proptest::prelude::*;
use voxa_core::CallCtx;
use voxa_session::{
    Entry, KEEP_SESSION_ENTRIES, ROLLOVER_THRESHOLD, SessionScope, SessionStore, UserAudio,
    parse_seq, seq_key,
};
use voxa_store::SqliteDocumentStore;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

async fn store() -> (SessionStore, Arc<SqliteDocumentStore>) {
    let docs = Arc::new(SqliteDocumentStore::open(":memory:").await.unwrap());
    (SessionStore::new(docs.clone()), docs)
}

fn scope() -> SessionScope {
    SessionScope::new("a1", "p1", "batman")
}

async fn append_n(store: &SessionStore, scope: &SessionScope, n: u64) {
    let ctx = CallCtx::unbounded();
    for i in 1..=n {
        let audio_id = format!("u{i}");
        let ts = Utc::now();
        store
            .record_user_audio(
                &ctx,
                scope,
                &UserAudio {
                    audio_id: audio_id.clone(),
                    timestamp: ts,
                    text: format!("q{i}"),
                    ..UserAudio::default()
                },
            )
            .await
            .unwrap();
        store
            .append_entry(
                &ctx,
                scope,
                &audio_id,
                Entry {
                    user: format!("q{i}"),
                    assistant: format!("a{i}"),
                    timestamp: ts,
                    ..Entry::default()
                },
            )
            .await
            .unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Sequence ids are exactly `start_entry .. start_entry + len` after
    /// any number of appends.
    #[test]
    fn appends_stay_contiguous(n in 1u64..48) {
        runtime().block_on(async {
            let (store, _docs) = store().await;
            let scope = scope();
            append_n(&store, &scope, n).await;

            let doc = store.get_latest(&CallCtx::unbounded(), &scope).await.unwrap();
            prop_assert_eq!(doc.entries.len() as u64, n);
            for (offset, key) in doc.entries.keys().enumerate() {
                prop_assert_eq!(parse_seq(key), Some(doc.start_entry + offset as u64));
            }
            Ok(())
        })?;
    }

    /// After seeding an aged window of arbitrary size past the threshold
    /// and appending more, the union of archives and the live window holds
    /// every id exactly once.
    #[test]
    fn rollover_conserves_entries(extra in 0usize..12, appended in 1u64..6) {
        runtime().block_on(async {
            let (store, docs) = store().await;
            let scope = scope();
            let ctx = CallCtx::unbounded();

            let seeded = (ROLLOVER_THRESHOLD + extra) as u64;
            let old = Utc::now() - Duration::hours(30);
            let mut doc = voxa_session::SessionDoc {
                archive: Some(old),
                last_archive: Some(old),
                ..voxa_session::SessionDoc::default()
            };
            for id in 1..=seeded {
                doc.entries.insert(
                    seq_key(id),
                    Entry { id, timestamp: old, ..Entry::default() },
                );
            }
            voxa_core::DocumentStore::set(
                docs.as_ref(),
                &ctx,
                &scope.latest_path(),
                serde_json::to_value(&doc).unwrap(),
            )
            .await
            .unwrap();

            append_n(&store, &scope, appended).await;

            let mut seen = BTreeSet::new();
            let index = store.get_archive_index(&ctx, &scope).await.unwrap();
            for archive_id in index.entries.keys() {
                for entry in store.get_archive_entries(&ctx, &scope, archive_id).await.unwrap() {
                    prop_assert!(seen.insert(entry.id), "duplicate id {}", entry.id);
                }
            }

            let expected: BTreeSet<u64> = (1..=seeded + appended).collect();
            prop_assert_eq!(seen, expected);

            // The live window kept the newest tail only.
            let latest = store.get_latest(&ctx, &scope).await.unwrap();
            prop_assert_eq!(
                latest.entries.len(),
                KEEP_SESSION_ENTRIES + appended as usize
            );
            Ok(())
        })?;
    }
}
