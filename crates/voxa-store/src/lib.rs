// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage backends for Voxa: a SQLite document store with atomic
//! field-path updates and a filesystem blob store.

pub mod blob;
pub mod document;
mod fieldops;

pub use blob::FsBlobStore;
pub use document::SqliteDocumentStore;
