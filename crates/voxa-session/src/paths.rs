// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document and blob path builders for one (account, profile, character)
//! session.

use chrono::{DateTime, Utc};

/// Addresses one profile's session with one character.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionScope {
    pub account_id: String,
    pub profile_id: String,
    pub character: String,
}

impl SessionScope {
    pub fn new(
        account_id: impl Into<String>,
        profile_id: impl Into<String>,
        character: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            profile_id: profile_id.into(),
            character: character.into(),
        }
    }

    /// `accounts/{aid}/profiles/{pid}/vox_sessions/{character}/memory`
    pub fn memory_dir(&self) -> String {
        format!(
            "accounts/{}/profiles/{}/vox_sessions/{}/memory",
            self.account_id, self.profile_id, self.character
        )
    }

    pub fn latest_path(&self) -> String {
        format!("{}/latest", self.memory_dir())
    }

    pub fn index_path(&self) -> String {
        format!("{}/index", self.memory_dir())
    }

    /// Archive documents are keyed by date (`2026-03-02`).
    pub fn archive_path(&self, archive_id: &str) -> String {
        format!("{}/{archive_id}", self.memory_dir())
    }

    /// `accounts/{aid}/profiles/{pid}/vox_sessions/{character}/archives/date_range`
    pub fn summary_path(&self) -> String {
        format!(
            "accounts/{}/profiles/{}/vox_sessions/{}/archives/date_range",
            self.account_id, self.profile_id, self.character
        )
    }

    fn blob_dir(&self, at: DateTime<Utc>) -> String {
        format!(
            "accounts/{}/profiles/{}/characters/{}/archives/{}",
            self.account_id,
            self.profile_id,
            self.character,
            at.format("%Y-%m-%d")
        )
    }

    /// Blob path of a user utterance clip.
    pub fn user_audio_blob(&self, at: DateTime<Utc>, audio_id: &str, ext: &str) -> String {
        format!("{}/{audio_id}.{ext}", self.blob_dir(at))
    }

    /// Blob path of an assistant response clip.
    pub fn assistant_audio_blob(
        &self,
        at: DateTime<Utc>,
        seq: u64,
        predefined: bool,
        ext: &str,
    ) -> String {
        if predefined {
            format!("{}/{seq}-predefined-assistant.{ext}", self.blob_dir(at))
        } else {
            format!("{}/{seq}-assistant.{ext}", self.blob_dir(at))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn scope() -> SessionScope {
        SessionScope::new("a1", "p1", "batman")
    }

    #[test]
    fn document_paths_follow_the_layout() {
        let s = scope();
        assert_eq!(
            s.latest_path(),
            "accounts/a1/profiles/p1/vox_sessions/batman/memory/latest"
        );
        assert_eq!(
            s.index_path(),
            "accounts/a1/profiles/p1/vox_sessions/batman/memory/index"
        );
        assert_eq!(
            s.archive_path("2026-03-02"),
            "accounts/a1/profiles/p1/vox_sessions/batman/memory/2026-03-02"
        );
        assert_eq!(
            s.summary_path(),
            "accounts/a1/profiles/p1/vox_sessions/batman/archives/date_range"
        );
    }

    #[test]
    fn blob_paths_follow_the_layout() {
        let s = scope();
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        assert_eq!(
            s.user_audio_blob(at, "abc", "mp3"),
            "accounts/a1/profiles/p1/characters/batman/archives/2026-03-02/abc.mp3"
        );
        assert_eq!(
            s.assistant_audio_blob(at, 7, false, "mp3"),
            "accounts/a1/profiles/p1/characters/batman/archives/2026-03-02/7-assistant.mp3"
        );
        assert_eq!(
            s.assistant_audio_blob(at, 7, true, "opus"),
            "accounts/a1/profiles/p1/characters/batman/archives/2026-03-02/7-predefined-assistant.opus"
        );
    }
}
