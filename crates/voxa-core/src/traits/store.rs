// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document and blob storage traits.
//!
//! The document store is a typed key/path store: documents are JSON values
//! addressed by slash-separated paths, and field-path atomic updates are a
//! first-class primitive. Expressing increments as read-modify-write in
//! process would break the deduction-exactness invariant under
//! concurrency, so implementations must apply a whole `update` batch
//! atomically.

use async_trait::async_trait;
use serde_json::Value;

use crate::ctx::CallCtx;
use crate::error::VoxaError;
use crate::traits::provider::ByteStream;

/// One atomic operation on a dotted field path inside a document.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Sets the field, creating intermediate maps as needed.
    Set(Value),
    /// Deletes the field; a no-op when absent.
    Delete,
    /// Adds `n` to an integer field, treating an absent field as 0.
    Increment(i64),
    /// Unions values into an array field, skipping duplicates.
    ArrayUnion(Vec<Value>),
}

/// A typed key/path document store with atomic field updates.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches a document, or `None` when absent.
    async fn get(&self, ctx: &CallCtx, path: &str) -> Result<Option<Value>, VoxaError>;

    /// Replaces (or creates) the whole document.
    async fn set(&self, ctx: &CallCtx, path: &str, value: Value) -> Result<(), VoxaError>;

    /// Creates the document; fails `AlreadyExists` when present.
    async fn create(&self, ctx: &CallCtx, path: &str, value: Value) -> Result<(), VoxaError>;

    /// Applies all field operations atomically. The document is created
    /// empty first when absent.
    async fn update(
        &self,
        ctx: &CallCtx,
        path: &str,
        ops: Vec<(String, FieldOp)>,
    ) -> Result<(), VoxaError>;

    /// Deletes a document; a no-op when absent.
    async fn delete(&self, ctx: &CallCtx, path: &str) -> Result<(), VoxaError>;

    /// Lists the ids (final path segments) of documents directly under
    /// `prefix`, sorted ascending.
    async fn list(&self, ctx: &CallCtx, prefix: &str) -> Result<Vec<String>, VoxaError>;
}

/// Object storage for audio blobs, addressed by slash-separated paths.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Streams `data` to EOF into the blob at `path`, returning the byte
    /// count. Overwrites any existing blob.
    async fn put(&self, ctx: &CallCtx, path: &str, data: ByteStream) -> Result<u64, VoxaError>;

    /// Opens the blob for reading; fails `Gone` when it has vanished.
    async fn get(&self, ctx: &CallCtx, path: &str) -> Result<ByteStream, VoxaError>;

    /// Deletes the blob; a no-op when absent.
    async fn delete(&self, ctx: &CallCtx, path: &str) -> Result<(), VoxaError>;
}
