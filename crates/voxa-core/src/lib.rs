// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Voxa character backend.
//!
//! This crate provides the foundational trait definitions, error taxonomy,
//! and common types used throughout the Voxa workspace: the four external
//! capabilities (transcribe, chat, synthesize, classify), the document and
//! blob storage contracts, per-call cancellation contexts, rate limiting,
//! and the byte-stream tee.

pub mod ctx;
pub mod error;
pub mod ratelimit;
pub mod tee;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use ctx::CallCtx;
pub use error::VoxaError;
pub use ratelimit::{BucketConfig, RateLimiter};
pub use traits::provider::ByteStream;
pub use traits::{
    BlobStore, ChatProvider, ChatStream, Classifier, DocumentStore, EmailMessage,
    EmailTransport, FieldOp, Synthesizer, Transcriber,
};
pub use types::{AccountId, ProfileId};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_traits_are_object_safe() {
        fn _assert_transcriber(_: &dyn Transcriber) {}
        fn _assert_chat(_: &dyn ChatProvider) {}
        fn _assert_synthesizer(_: &dyn Synthesizer) {}
        fn _assert_classifier(_: &dyn Classifier) {}
        fn _assert_docs(_: &dyn DocumentStore) {}
        fn _assert_blobs(_: &dyn BlobStore) {}
        fn _assert_email(_: &dyn EmailTransport) {}
    }

    #[test]
    fn error_taxonomy_constructs() {
        let _ = VoxaError::Unauthorized("key".into());
        let _ = VoxaError::PaymentRequired("empty wallet".into());
        let _ = VoxaError::NotFound("entry 9".into());
        let _ = VoxaError::Gone("blob".into());
        let _ = VoxaError::bad_request("format", "unknown");
        let _ = VoxaError::AlreadyExists("doc".into());
        let _ = VoxaError::Unprocessable("schema".into());
        let _ = VoxaError::Consistency("sequence gap".into());
        let _ = VoxaError::connection("503");
        let _ = VoxaError::Limit("too long".into());
        let _ = VoxaError::Moderation("violence".into());
        let _ = VoxaError::DeadlineExceeded { duration: std::time::Duration::from_secs(60) };
        let _ = VoxaError::Canceled;
        let _ = VoxaError::Config("bad toml".into());
        let _ = VoxaError::Internal("bug".into());
    }
}
