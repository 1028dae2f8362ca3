// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session memory for the Voxa backend: the `latest` rolling window, dated
//! archive documents, the archive index, and end-of-sequence markers.

pub mod models;
pub mod paths;
pub mod store;

pub use models::{
    ArchiveDoc, ArchiveIndex, ArchiveSpan, Entry, LATEST_ARCHIVE_ID, SessionDoc, UserAudio,
    parse_seq, seq_key,
};
pub use paths::SessionScope;
pub use store::{
    KEEP_SESSION_ENTRIES, MIN_SESSION_ARCHIVE_ENTRIES, ROLLOVER_THRESHOLD, SessionStore,
};
