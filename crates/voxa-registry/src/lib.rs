// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Character/profile/localization registry for the Voxa backend.
//!
//! A process-wide read-through cache over a small set of registry
//! documents, plus the profile and account loaders the pipeline consults
//! on every turn.

pub mod cache;
pub mod localization;
pub mod types;

pub use cache::Registry;
pub use localization::{Localization, builtin_en_us, section};
pub use types::{Account, CharacterDef, CharacterPrefs, Mode, NotificationSettings, Profile};
