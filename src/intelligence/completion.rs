// ABOUTME: Infers completion status for suggestions the user never marked
// ABOUTME: Uses marking behavior, activity size, weather, and elapsed time
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Completion Inference
//!
//! Most families never mark small activities done. The inferencer estimates
//! what actually happened from the user's marking behavior: a user who
//! reliably marks big outings but leaves a zoo suggestion untouched probably
//! skipped it, while the unmarked "walk to the playground" next to it very
//! likely happened. Explicit user marks always win; inferred statuses are
//! recomputed per run and never written back.

use chrono::NaiveDate;
use tracing::trace;

use super::repetition::RepetitionClassifier;
use super::RepetitionTolerance;
use crate::models::{Activity, ActivitySuggestion, CompletionStatus, Cost, Duration, Location};

const BIG_TITLE_KEYWORDS: &[&str] = &["museum", "zoo", "concert", "show"];
const BIG_LOCATIONS: &[Location] = &[Location::Museum, Location::Zoo, Location::AmusementPark];

/// Whether an activity is a "big" outing the user would bother to mark
///
/// At least two independent size signals are required so a cheap museum
/// visit or an expensive picnic does not flip the classification alone.
#[must_use]
pub fn is_big_activity(activity: &Activity) -> bool {
    let mut signals = 0;

    if activity
        .costs
        .iter()
        .any(|c| matches!(c, Cost::High | Cost::Medium))
    {
        signals += 1;
    }
    if activity
        .durations
        .iter()
        .any(|d| matches!(d, Duration::HalfDay | Duration::FullDay))
    {
        signals += 1;
    }
    if activity
        .locations
        .iter()
        .any(|loc| BIG_LOCATIONS.contains(loc))
    {
        signals += 1;
    }
    let title = activity.title.to_lowercase();
    if BIG_TITLE_KEYWORDS.iter().any(|kw| title.contains(kw)) {
        signals += 1;
    }

    signals >= 2
}

/// Marking behavior the inferencer needs from analytics
///
/// The default assumes a big-only marker, matching the persisted
/// low-confidence row for thin histories: a cold-start user behaves the
/// same before and after their first analytics recompute.
#[derive(Debug, Clone, Copy)]
pub struct MarkingBehavior {
    pub marks_big_activities_only: bool,
}

impl Default for MarkingBehavior {
    fn default() -> Self {
        Self {
            marks_big_activities_only: true,
        }
    }
}

/// Stateless completion-status inferencer
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionInferencer {
    classifier: RepetitionClassifier,
}

impl CompletionInferencer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Infer the effective completion status of a suggestion as of `today`
    #[must_use]
    pub fn infer(
        &self,
        suggestion: &ActivitySuggestion,
        activity: &Activity,
        behavior: MarkingBehavior,
        today: NaiveDate,
    ) -> CompletionStatus {
        // Explicit user marks are authoritative
        if suggestion.completion_status.is_explicit() {
            return suggestion.completion_status;
        }

        let days_elapsed = (today - suggestion.suggested_date).num_days();

        if behavior.marks_big_activities_only {
            if is_big_activity(activity) {
                // This user marks big outings; silence past the weekend
                // window means it did not happen
                if days_elapsed > 3 {
                    return CompletionStatus::LikelySkipped;
                }
            } else {
                return self.infer_small_activity(suggestion, activity, days_elapsed);
            }
        }

        Self::time_decay_status(days_elapsed)
    }

    /// Likelihood model for small activities under a big-only marker
    fn infer_small_activity(
        &self,
        suggestion: &ActivitySuggestion,
        activity: &Activity,
        days_elapsed: i64,
    ) -> CompletionStatus {
        let weather_suitable = suggestion.weather_was_outdoor_suitable();
        let weather_dependent = activity.is_weather_dependent();

        if weather_dependent && !weather_suitable {
            return CompletionStatus::WeatherPrevented;
        }

        let mut likelihood: f64 = 0.6;
        if weather_dependent && weather_suitable {
            likelihood += 0.2;
        }
        if self.classifier.classify(activity) == RepetitionTolerance::High {
            likelihood += 0.3;
        }
        if activity
            .costs
            .iter()
            .any(|c| matches!(c, Cost::Free | Cost::Low))
        {
            likelihood += 0.2;
        }
        if days_elapsed <= 7 {
            likelihood += 0.1;
        } else if days_elapsed > 14 {
            likelihood -= 0.2;
        }
        let likelihood = likelihood.clamp(0.0, 1.0);

        trace!(
            suggestion_id = suggestion.id,
            likelihood,
            "small-activity completion likelihood"
        );

        if likelihood >= 0.8 {
            CompletionStatus::LikelyCompleted
        } else if likelihood >= 0.6 {
            CompletionStatus::PossiblyCompleted
        } else if likelihood >= 0.4 {
            CompletionStatus::Unknown
        } else {
            CompletionStatus::LikelySkipped
        }
    }

    /// Default chain for users without a clear marking pattern
    const fn time_decay_status(days_elapsed: i64) -> CompletionStatus {
        if days_elapsed > 21 {
            CompletionStatus::AssumedSkipped
        } else if days_elapsed > 14 {
            CompletionStatus::LikelySkipped
        } else if days_elapsed <= 3 {
            CompletionStatus::Pending
        } else {
            CompletionStatus::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn suggestion(suggested: NaiveDate, weather: serde_json::Value) -> ActivitySuggestion {
        ActivitySuggestion {
            id: 1,
            user_id: Uuid::new_v4(),
            activity_id: 1,
            suggested_date: suggested,
            target_week_start: suggested,
            suggested_reason: None,
            completion_status: CompletionStatus::Unknown,
            completion_date: None,
            user_rating: None,
            user_feedback: None,
            weather_conditions: weather,
        }
    }

    fn zoo_trip() -> Activity {
        Activity {
            id: 1,
            title: "Day at the zoo".into(),
            costs: vec![Cost::High],
            durations: vec![Duration::FullDay],
            locations: vec![Location::Zoo],
            ..Activity::default()
        }
    }

    fn park_walk() -> Activity {
        Activity {
            id: 2,
            title: "Walk in the park".into(),
            themes: vec!["OUTDOOR".into()],
            costs: vec![Cost::Free],
            durations: vec![Duration::Short],
            locations: vec![Location::Park],
            ..Activity::default()
        }
    }

    #[test]
    fn test_big_activity_needs_two_signals() {
        assert!(is_big_activity(&zoo_trip()));

        // Expensive alone is not big
        let pricey_craft = Activity {
            title: "Pottery kit session".into(),
            costs: vec![Cost::High],
            durations: vec![Duration::Short],
            ..Activity::default()
        };
        assert!(!is_big_activity(&pricey_craft));
    }

    #[test]
    fn test_explicit_status_wins() {
        let mut s = suggestion(date(2025, 5, 1), json!({}));
        s.completion_status = CompletionStatus::ExplicitlySkipped;
        let status = CompletionInferencer::new().infer(
            &s,
            &park_walk(),
            MarkingBehavior {
                marks_big_activities_only: true,
            },
            date(2025, 6, 1),
        );
        assert_eq!(status, CompletionStatus::ExplicitlySkipped);
    }

    #[test]
    fn test_unmarked_big_activity_likely_skipped() {
        let s = suggestion(date(2025, 6, 2), json!({}));
        let status = CompletionInferencer::new().infer(
            &s,
            &zoo_trip(),
            MarkingBehavior {
                marks_big_activities_only: true,
            },
            date(2025, 6, 9),
        );
        assert_eq!(status, CompletionStatus::LikelySkipped);
    }

    #[test]
    fn test_fresh_big_activity_still_pending() {
        let s = suggestion(date(2025, 6, 2), json!({}));
        let status = CompletionInferencer::new().infer(
            &s,
            &zoo_trip(),
            MarkingBehavior {
                marks_big_activities_only: true,
            },
            date(2025, 6, 4),
        );
        assert_eq!(status, CompletionStatus::Pending);
    }

    #[test]
    fn test_small_free_outdoor_likely_completed() {
        // base 0.6 + outdoor-suitable 0.2 + high tier 0.3 + free 0.2
        // + recent 0.1, clamped to 1.0
        let s = suggestion(date(2025, 6, 2), json!({"suitable_for_outdoor": true}));
        let status = CompletionInferencer::new().infer(
            &s,
            &park_walk(),
            MarkingBehavior {
                marks_big_activities_only: true,
            },
            date(2025, 6, 6),
        );
        assert_eq!(status, CompletionStatus::LikelyCompleted);
    }

    #[test]
    fn test_outdoor_in_bad_weather_is_weather_prevented() {
        let s = suggestion(date(2025, 6, 2), json!({"suitable_for_outdoor": false}));
        let status = CompletionInferencer::new().infer(
            &s,
            &park_walk(),
            MarkingBehavior {
                marks_big_activities_only: true,
            },
            date(2025, 6, 6),
        );
        assert_eq!(status, CompletionStatus::WeatherPrevented);
    }

    #[test]
    fn test_default_behavior_is_big_only_marker() {
        assert!(MarkingBehavior::default().marks_big_activities_only);
    }

    #[test]
    fn test_time_decay_chain() {
        let inferencer = CompletionInferencer::new();
        let behavior = MarkingBehavior {
            marks_big_activities_only: false,
        };
        let s = suggestion(date(2025, 6, 2), json!({}));

        let cases = [
            (date(2025, 6, 2), CompletionStatus::Pending),
            (date(2025, 6, 5), CompletionStatus::Pending),
            (date(2025, 6, 10), CompletionStatus::Unknown),
            (date(2025, 6, 18), CompletionStatus::LikelySkipped),
            (date(2025, 6, 30), CompletionStatus::AssumedSkipped),
        ];
        for (today, expected) in cases {
            assert_eq!(
                inferencer.infer(&s, &park_walk(), behavior, today),
                expected,
                "today={today}"
            );
        }
    }
}
