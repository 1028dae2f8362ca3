// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem blob store for audio.
//!
//! Blobs are written to a temp file next to the target and renamed into
//! place, so readers never observe partial uploads.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use voxa_core::{BlobStore, ByteStream, CallCtx, VoxaError};

/// Blob store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, VoxaError> {
        if path.is_empty()
            || path.starts_with('/')
            || path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
        {
            return Err(VoxaError::bad_request("blob_path", format!("malformed path {path:?}")));
        }
        Ok(self.root.join(Path::new(path)))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, ctx: &CallCtx, path: &str, mut data: ByteStream) -> Result<u64, VoxaError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| VoxaError::Internal(format!("blob mkdir: {e}")))?;
        }

        let tmp = target.with_extension(format!("part-{}", uuid::Uuid::new_v4()));
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| VoxaError::Internal(format!("blob create: {e}")))?;

        let copy_result = ctx.run(tokio::io::copy(&mut data, &mut file)).await;
        let written = match copy_result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(VoxaError::Internal(format!("blob write: {e}")));
            }
            Err(cancel) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(cancel);
            }
        };

        file.flush()
            .await
            .map_err(|e| VoxaError::Internal(format!("blob flush: {e}")))?;
        drop(file);

        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| VoxaError::Internal(format!("blob rename: {e}")))?;

        tracing::debug!(path, bytes = written, "blob stored");
        Ok(written)
    }

    async fn get(&self, _ctx: &CallCtx, path: &str) -> Result<ByteStream, VoxaError> {
        let target = self.resolve(path)?;
        match tokio::fs::File::open(&target).await {
            Ok(file) => Ok(Box::pin(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(VoxaError::Gone(path.to_string()))
            }
            Err(e) => Err(VoxaError::Internal(format!("blob open: {e}"))),
        }
    }

    async fn delete(&self, _ctx: &CallCtx, path: &str) -> Result<(), VoxaError> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VoxaError::Internal(format!("blob delete: {e}"))),
        }
    }
}
