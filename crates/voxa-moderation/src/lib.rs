// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Moderation evaluator.
//!
//! Combines a classifier response with the profile's policy (enabled
//! categories, age rating, toxicity flag) into a single `triggered`
//! boolean plus a localized reason list.

pub mod ratings;

use voxa_core::types::{Classification, MODERATION_CATEGORIES, ModerationResult};
use voxa_registry::{Localization, Profile};

use crate::ratings::{esrb_rating_age, movie_rating_age, pegi_rating_age, tv_rating_age};

/// The lowest age floor across the direct assessment and every rating
/// label the classifier attached.
pub fn min_age(classification: &Classification) -> u8 {
    let analysis = &classification.analysis;
    [
        Some(analysis.assessment_age),
        movie_rating_age(&analysis.movie_rating),
        tv_rating_age(&analysis.tv_rating),
        esrb_rating_age(&analysis.esrb_rating),
        pegi_rating_age(&analysis.pegi_rating),
    ]
    .into_iter()
    .flatten()
    .min()
    .unwrap_or(0)
}

/// Evaluates a classification against the profile's moderation policy.
pub fn evaluate(
    classification: &Classification,
    profile: &Profile,
    localization: &Localization,
) -> ModerationResult {
    let floor = min_age(classification);
    let age_appropriate = profile.response_age >= floor;

    let mut flagged = Vec::new();
    let mut reasons = Vec::new();

    if !age_appropriate {
        flagged.push("not_age_appropriate".to_string());
        reasons.push(localization.moderation_reason("not_age_appropriate"));
    }

    for category in MODERATION_CATEGORIES {
        let enabled = profile
            .notifications
            .moderations
            .get(category)
            .copied()
            .unwrap_or(false);
        let tripped = classification
            .categories
            .get(category)
            .copied()
            .unwrap_or(false);
        if enabled && tripped {
            flagged.push(category.to_string());
            reasons.push(localization.moderation_reason(category));
        }
    }

    if profile.notifications.text_analysis_toxic && classification.analysis.toxic {
        flagged.push("toxic".to_string());
        reasons.push(localization.moderation_reason("toxic"));
    }

    let triggered = !flagged.is_empty();
    if triggered {
        tracing::debug!(flagged = ?flagged, age_floor = floor, "moderation triggered");
    }

    ModerationResult {
        triggered,
        age_appropriate,
        reasons,
        flagged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use voxa_core::types::TextAnalysis;
    use voxa_registry::builtin_en_us;

    fn profile_with(enabled: &[&str], age: u8, toxic_toggle: bool) -> Profile {
        Profile {
            response_age: age,
            moderate: true,
            notifications: voxa_registry::NotificationSettings {
                emails: vec![],
                moderations: enabled.iter().map(|c| (c.to_string(), true)).collect(),
                text_analysis_toxic: toxic_toggle,
            },
            ..Profile::default()
        }
    }

    fn classification_with(tripped: &[&str], analysis: TextAnalysis) -> Classification {
        Classification {
            categories: tripped.iter().map(|c| (c.to_string(), true)).collect(),
            scores: BTreeMap::new(),
            analysis,
        }
    }

    #[test]
    fn enabled_and_tripped_category_triggers() {
        let profile = profile_with(&["sexual/minors"], 10, false);
        let c = classification_with(
            &["sexual/minors"],
            TextAnalysis { assessment_age: 2, ..TextAnalysis::default() },
        );
        let result = evaluate(&c, &profile, &builtin_en_us());
        assert!(result.triggered);
        assert_eq!(result.flagged, vec!["sexual/minors"]);
        assert_eq!(result.reasons, vec!["sexual content involving minors"]);
    }

    #[test]
    fn tripped_but_disabled_category_does_not_trigger() {
        let profile = profile_with(&["violence"], 10, false);
        let c = classification_with(
            &["sexual"],
            TextAnalysis { assessment_age: 2, ..TextAnalysis::default() },
        );
        let result = evaluate(&c, &profile, &builtin_en_us());
        assert!(!result.triggered);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn age_floor_uses_the_minimum_across_ratings() {
        // assessment says 17 but the TV rating floors at 2.
        let analysis = TextAnalysis {
            assessment_age: 17,
            tv_rating: "TV-Y".into(),
            ..TextAnalysis::default()
        };
        let c = classification_with(&[], analysis);
        assert_eq!(min_age(&c), 2);

        let profile = profile_with(&[], 10, false);
        let result = evaluate(&c, &profile, &builtin_en_us());
        assert!(result.age_appropriate);
        assert!(!result.triggered);
    }

    #[test]
    fn response_age_below_floor_triggers() {
        let analysis = TextAnalysis {
            assessment_age: 13,
            movie_rating: "PG-13".into(),
            ..TextAnalysis::default()
        };
        let c = classification_with(&[], analysis);
        let profile = profile_with(&[], 10, false);
        let result = evaluate(&c, &profile, &builtin_en_us());
        assert!(result.triggered);
        assert!(!result.age_appropriate);
        assert_eq!(result.flagged, vec!["not_age_appropriate"]);
    }

    #[test]
    fn toxicity_requires_both_toggle_and_flag() {
        let toxic = TextAnalysis { assessment_age: 2, toxic: true, ..TextAnalysis::default() };

        let off = profile_with(&[], 10, false);
        assert!(!evaluate(&classification_with(&[], toxic.clone()), &off, &builtin_en_us()).triggered);

        let on = profile_with(&[], 10, true);
        let result = evaluate(&classification_with(&[], toxic), &on, &builtin_en_us());
        assert!(result.triggered);
        assert_eq!(result.flagged, vec!["toxic"]);
    }

    #[test]
    fn unknown_rating_labels_contribute_no_floor() {
        let analysis = TextAnalysis {
            assessment_age: 8,
            movie_rating: "UNRATED".into(),
            esrb_rating: "??".into(),
            pegi_rating: "".into(),
            ..TextAnalysis::default()
        };
        assert_eq!(min_age(&classification_with(&[], analysis)), 8);
    }
}
