// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability and storage traits implemented by adapter crates.

pub mod email;
pub mod provider;
pub mod store;

pub use email::{EmailMessage, EmailTransport};
pub use provider::{ChatProvider, ChatStream, Classifier, Synthesizer, Transcriber};
pub use store::{BlobStore, DocumentStore, FieldOp};
