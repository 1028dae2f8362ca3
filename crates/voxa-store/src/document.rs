// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed document store.
//!
//! Documents are JSON bodies keyed by slash-separated paths in a single
//! table. All writes are serialized through tokio-rusqlite's background
//! thread, so a field-op batch applies atomically. Do NOT create
//! additional connections for writes.

use async_trait::async_trait;
use serde_json::Value;
use tokio_rusqlite::Connection;
use voxa_core::{CallCtx, DocumentStore, FieldOp, VoxaError};

use crate::fieldops::apply_ops;

/// Document store over a single SQLite connection.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    conn: Connection,
}

impl SqliteDocumentStore {
    /// Opens (or creates) the store at `path`; `:memory:` for tests.
    pub async fn open(path: &str) -> Result<Self, VoxaError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory().await
        } else {
            Connection::open(path).await
        }
        .map_err(db_err)?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 CREATE TABLE IF NOT EXISTS documents (
                     path TEXT PRIMARY KEY NOT NULL,
                     body TEXT NOT NULL
                 );",
            )?;
            Ok(())
        })
        .await
        .map_err(db_err)?;

        Ok(Self { conn })
    }

    /// The underlying connection, for crates layering their own queries in
    /// tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn db_err<E: std::fmt::Display>(e: E) -> VoxaError {
    VoxaError::Internal(format!("document store: {e}"))
}

fn parse_body(path: &str, body: String) -> Result<Value, VoxaError> {
    serde_json::from_str(&body)
        .map_err(|e| VoxaError::Consistency(format!("corrupt document {path}: {e}")))
}

fn validate_path(path: &str) -> Result<(), VoxaError> {
    if path.is_empty() || path.starts_with('/') || path.ends_with('/') || path.contains("//") {
        return Err(VoxaError::bad_request("doc_path", format!("malformed path {path:?}")));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, ctx: &CallCtx, path: &str) -> Result<Option<Value>, VoxaError> {
        validate_path(path)?;
        let path_owned = path.to_string();
        let body: Option<String> = ctx
            .run(self.conn.call(move |conn| -> Result<Option<String>, rusqlite::Error> {
                conn.query_row(
                    "SELECT body FROM documents WHERE path = ?1",
                    [&path_owned],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })
            }))
            .await?
            .map_err(db_err)?;

        body.map(|b| parse_body(path, b)).transpose()
    }

    async fn set(&self, ctx: &CallCtx, path: &str, value: Value) -> Result<(), VoxaError> {
        validate_path(path)?;
        let path_owned = path.to_string();
        let body = value.to_string();
        ctx.run(self.conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO documents (path, body) VALUES (?1, ?2)
                 ON CONFLICT(path) DO UPDATE SET body = excluded.body",
                [&path_owned, &body],
            )?;
            Ok(())
        }))
        .await?
        .map_err(db_err)
    }

    async fn create(&self, ctx: &CallCtx, path: &str, value: Value) -> Result<(), VoxaError> {
        validate_path(path)?;
        let path_owned = path.to_string();
        let body = value.to_string();
        let inserted = ctx
            .run(self.conn.call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO documents (path, body) VALUES (?1, ?2)",
                    [&path_owned, &body],
                )
            }))
            .await?
            .map_err(db_err)?;

        if inserted == 0 {
            return Err(VoxaError::AlreadyExists(path.to_string()));
        }
        Ok(())
    }

    async fn update(
        &self,
        ctx: &CallCtx,
        path: &str,
        ops: Vec<(String, FieldOp)>,
    ) -> Result<(), VoxaError> {
        validate_path(path)?;
        let path_owned = path.to_string();
        // The read-modify-write runs inside one call on the single writer
        // thread, which is what makes the batch atomic.
        let result = ctx
            .run(self.conn.call(
                move |conn| -> Result<Result<(), VoxaError>, rusqlite::Error> {
                    let tx = conn.transaction()?;
                    let body: Option<String> = tx
                        .query_row(
                            "SELECT body FROM documents WHERE path = ?1",
                            [&path_owned],
                            |row| row.get(0),
                        )
                        .map(Some)
                        .or_else(|e| match e {
                            rusqlite::Error::QueryReturnedNoRows => Ok(None),
                            other => Err(other),
                        })?;

                    let mut doc = match body {
                        Some(b) => match parse_body(&path_owned, b) {
                            Ok(v) => v,
                            Err(e) => return Ok(Err(e)),
                        },
                        None => Value::Object(serde_json::Map::new()),
                    };

                    if let Err(e) = apply_ops(&mut doc, &ops) {
                        return Ok(Err(e));
                    }

                    tx.execute(
                        "INSERT INTO documents (path, body) VALUES (?1, ?2)
                         ON CONFLICT(path) DO UPDATE SET body = excluded.body",
                        [&path_owned, &doc.to_string()],
                    )?;
                    tx.commit()?;
                    Ok(Ok(()))
                },
            ))
            .await?
            .map_err(db_err)?;
        result
    }

    async fn delete(&self, ctx: &CallCtx, path: &str) -> Result<(), VoxaError> {
        validate_path(path)?;
        let path_owned = path.to_string();
        ctx.run(self.conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM documents WHERE path = ?1", [&path_owned])?;
            Ok(())
        }))
        .await?
        .map_err(db_err)
    }

    async fn list(&self, ctx: &CallCtx, prefix: &str) -> Result<Vec<String>, VoxaError> {
        validate_path(prefix)?;
        let like = format!("{}/%", prefix.replace('%', "\\%").replace('_', "\\_"));
        let depth = prefix.matches('/').count() + 1;
        let paths: Vec<String> = ctx
            .run(self.conn.call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT path FROM documents WHERE path LIKE ?1 ESCAPE '\\' ORDER BY path",
                )?;
                let rows = stmt.query_map([&like], |row| row.get::<_, String>(0))?;
                rows.collect()
            }))
            .await?
            .map_err(db_err)?;

        Ok(paths
            .into_iter()
            .filter(|p| p.matches('/').count() == depth)
            .filter_map(|p| p.rsplit_once('/').map(|(_, id)| id.to_string()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store() -> SqliteDocumentStore {
        SqliteDocumentStore::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let s = store().await;
        let ctx = CallCtx::unbounded();
        assert!(s.get(&ctx, "accounts/a1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let s = store().await;
        let ctx = CallCtx::unbounded();
        let doc = json!({"active": true, "timezone": "Europe/Berlin"});
        s.set(&ctx, "accounts/a1", doc.clone()).await.unwrap();
        assert_eq!(s.get(&ctx, "accounts/a1").await.unwrap(), Some(doc));
    }

    #[tokio::test]
    async fn create_fails_on_existing() {
        let s = store().await;
        let ctx = CallCtx::unbounded();
        s.create(&ctx, "accounts/a1", json!({})).await.unwrap();
        let err = s.create(&ctx, "accounts/a1", json!({})).await.unwrap_err();
        assert!(matches!(err, VoxaError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn update_creates_missing_document() {
        let s = store().await;
        let ctx = CallCtx::unbounded();
        s.update(
            &ctx,
            "accounts/a1/bank/balance",
            vec![
                ("balance".to_string(), FieldOp::Increment(1000)),
                ("subscription_balance".to_string(), FieldOp::Set(json!(0))),
            ],
        )
        .await
        .unwrap();
        let doc = s.get(&ctx, "accounts/a1/bank/balance").await.unwrap().unwrap();
        assert_eq!(doc["balance"], 1000);
        assert_eq!(doc["subscription_balance"], 0);
    }

    #[tokio::test]
    async fn concurrent_increments_compose() {
        let s = store().await;
        let ctx = CallCtx::unbounded();
        s.set(&ctx, "accounts/a1/bank/balance", json!({"balance": 0}))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let s = s.clone();
            handles.push(tokio::spawn(async move {
                let ctx = CallCtx::unbounded();
                s.update(
                    &ctx,
                    "accounts/a1/bank/balance",
                    vec![("balance".to_string(), FieldOp::Increment(5))],
                )
                .await
                .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let doc = s.get(&ctx, "accounts/a1/bank/balance").await.unwrap().unwrap();
        assert_eq!(doc["balance"], 100);
    }

    #[tokio::test]
    async fn list_returns_direct_children_only() {
        let s = store().await;
        let ctx = CallCtx::unbounded();
        let base = "accounts/a1/profiles/p1/vox_sessions/batman/memory";
        s.set(&ctx, &format!("{base}/latest"), json!({})).await.unwrap();
        s.set(&ctx, &format!("{base}/2026-01-10"), json!({})).await.unwrap();
        s.set(&ctx, &format!("{base}/2026-03-02"), json!({})).await.unwrap();
        s.set(&ctx, &format!("{base}/index"), json!({})).await.unwrap();
        // A deeper document must not show up.
        s.set(&ctx, &format!("{base}/sub/deep"), json!({})).await.unwrap();

        let ids = s.list(&ctx, base).await.unwrap();
        assert_eq!(ids, vec!["2026-01-10", "2026-03-02", "index", "latest"]);
    }

    #[tokio::test]
    async fn malformed_paths_are_rejected() {
        let s = store().await;
        let ctx = CallCtx::unbounded();
        for bad in ["", "/abs", "trailing/", "a//b"] {
            let err = s.get(&ctx, bad).await.unwrap_err();
            assert!(matches!(err, VoxaError::BadRequest { .. }), "path {bad:?}");
        }
    }
}
