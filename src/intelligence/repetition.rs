// ABOUTME: Rule-based classification of how often an activity can repeat
// ABOUTME: Ordered predicate rules over typed tags with a medium default
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Repetition Classification
//!
//! Each activity gets a [`RepetitionTolerance`] tier from an ordered rule
//! list. Rules are evaluated most-restrictive-first so a "holiday concert in
//! the park" lands in the very-low tier on its concert signal before the
//! high-tier park rule can claim it. First match wins; unmatched activities
//! default to medium.

use tracing::trace;

use super::RepetitionTolerance;
use crate::models::{Activity, Location};

/// One classification rule: any matching signal claims the activity
#[derive(Debug)]
struct RepetitionRule {
    tier: RepetitionTolerance,
    themes: &'static [&'static str],
    activity_types: &'static [&'static str],
    keywords: &'static [&'static str],
    locations: &'static [Location],
}

impl RepetitionRule {
    fn matches(&self, activity: &Activity, text: &str) -> bool {
        if self.keywords.iter().any(|kw| text.contains(kw)) {
            return true;
        }
        if activity
            .themes
            .iter()
            .any(|t| self.themes.contains(&t.as_str()))
        {
            return true;
        }
        if activity
            .activity_types
            .iter()
            .any(|t| self.activity_types.contains(&t.as_str()))
        {
            return true;
        }
        self.locations
            .iter()
            .any(|loc| activity.locations.contains(loc))
    }
}

/// Evaluation order is part of the contract: very-low and low signals are
/// rarer and more specific, so they get first claim; high beats the medium
/// default for the routine-outing signals.
const RULES: &[RepetitionRule] = &[
    RepetitionRule {
        tier: RepetitionTolerance::VeryLow,
        themes: &["CULTURAL", "SEASONAL_SPECIAL"],
        activity_types: &[],
        keywords: &["exhibit", "show", "concert", "festival", "fair", "circus"],
        locations: &[],
    },
    RepetitionRule {
        tier: RepetitionTolerance::Low,
        themes: &["ENTERTAINMENT", "SPECIAL_EVENT"],
        activity_types: &["ENTERTAINMENT", "EVENT"],
        keywords: &[
            "bounce",
            "arcade",
            "bowling",
            "mini golf",
            "trampoline",
            "laser tag",
        ],
        locations: &[Location::IndoorEntertainment],
    },
    RepetitionRule {
        tier: RepetitionTolerance::High,
        themes: &["OUTDOOR", "PHYSICAL_ACTIVITY", "NATURE", "READING"],
        activity_types: &["OUTDOOR", "EXERCISE", "PLAYGROUND"],
        keywords: &[
            "park",
            "playground",
            "walk",
            "hike",
            "bike",
            "read",
            "library",
            "beach",
            "garden",
        ],
        locations: &[
            Location::Park,
            Location::Beach,
            Location::Trail,
            Location::Outdoor,
        ],
    },
    RepetitionRule {
        tier: RepetitionTolerance::Medium,
        themes: &["CREATIVE", "EDUCATIONAL", "SOCIAL"],
        activity_types: &["CREATIVE", "EDUCATIONAL", "COOKING"],
        keywords: &["restaurant", "movie", "cooking", "craft", "swimming"],
        locations: &[],
    },
];

/// Stateless repetition-tolerance classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct RepetitionClassifier;

impl RepetitionClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Classify an activity's repetition tolerance
    #[must_use]
    pub fn classify(&self, activity: &Activity) -> RepetitionTolerance {
        let text = format!(
            "{} {}",
            activity.title.to_lowercase(),
            activity.description.to_lowercase()
        );

        for rule in RULES {
            if rule.matches(activity, &text) {
                trace!(activity_id = activity.id, tier = rule.tier.as_str(), "classified");
                return rule.tier;
            }
        }
        RepetitionTolerance::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(title: &str, themes: &[&str], locations: &[Location]) -> Activity {
        Activity {
            id: 1,
            title: title.to_owned(),
            description: String::new(),
            themes: themes.iter().map(|&s| s.to_owned()).collect(),
            locations: locations.to_vec(),
            ..Activity::default()
        }
    }

    #[test]
    fn test_park_keyword_is_high() {
        let a = activity("Afternoon at the park", &[], &[]);
        assert_eq!(RepetitionClassifier.classify(&a), RepetitionTolerance::High);
    }

    #[test]
    fn test_concert_beats_park() {
        // Very-low signal must win even when a high-tier signal is present
        let a = activity("Summer concert in the park", &[], &[Location::Park]);
        assert_eq!(
            RepetitionClassifier.classify(&a),
            RepetitionTolerance::VeryLow
        );
    }

    #[test]
    fn test_arcade_is_low() {
        let a = activity("Retro arcade afternoon", &[], &[]);
        assert_eq!(RepetitionClassifier.classify(&a), RepetitionTolerance::Low);
    }

    #[test]
    fn test_indoor_entertainment_location_is_low() {
        let a = activity("Family fun center", &[], &[Location::IndoorEntertainment]);
        assert_eq!(RepetitionClassifier.classify(&a), RepetitionTolerance::Low);
    }

    #[test]
    fn test_creative_theme_is_medium() {
        let a = activity("Watercolor session", &["CREATIVE"], &[]);
        assert_eq!(
            RepetitionClassifier.classify(&a),
            RepetitionTolerance::Medium
        );
    }

    #[test]
    fn test_unmatched_defaults_to_medium() {
        let a = activity("Tidy the garage together", &[], &[]);
        assert_eq!(
            RepetitionClassifier.classify(&a),
            RepetitionTolerance::Medium
        );
    }

    #[test]
    fn test_cultural_theme_is_very_low() {
        let a = activity("City heritage visit", &["CULTURAL"], &[]);
        assert_eq!(
            RepetitionClassifier.classify(&a),
            RepetitionTolerance::VeryLow
        );
    }
}
