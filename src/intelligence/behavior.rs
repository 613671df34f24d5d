// ABOUTME: Periodic recomputation of per-user suggestion marking behavior
// ABOUTME: Produces the persisted UserBehaviorAnalytic rows inference reads
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Behavior Analytics
//!
//! Recomputes a user's marking profile from the trailing suggestion window
//! and persists it. Runs on its own schedule (after feedback events or
//! nightly); a planning run only ever reads the stored row, so a stale
//! profile degrades quality but never blocks planning.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::completion::is_big_activity;
use crate::database::{ActivityRepository, BehaviorAnalyticsRepository, SuggestionRepository};
use crate::errors::AppResult;
use crate::models::{CompletionStatus, Cost, UserBehaviorAnalytic};

/// Below this many suggestions the profile is a low-confidence default
const MIN_SAMPLE_SIZE: usize = 5;
/// Sample size at which confidence saturates
const FULL_CONFIDENCE_SAMPLES: usize = 50;
/// Minimum samples for a theme or activity-type rate to be reported
const MIN_TAG_SAMPLES: usize = 3;
/// Minimum samples for a cost-tier rate to be reported
const MIN_COST_SAMPLES: usize = 2;

const BIG_MARKING_THRESHOLD: f64 = 0.2;
const SMALL_MARKING_THRESHOLD: f64 = 0.1;

/// Recomputes and persists [`UserBehaviorAnalytic`] rows
pub struct BehaviorAnalyticsService {
    suggestions: Arc<dyn SuggestionRepository>,
    activities: Arc<dyn ActivityRepository>,
    analytics: Arc<dyn BehaviorAnalyticsRepository>,
    lookback_weeks: u32,
}

impl BehaviorAnalyticsService {
    #[must_use]
    pub fn new(
        suggestions: Arc<dyn SuggestionRepository>,
        activities: Arc<dyn ActivityRepository>,
        analytics: Arc<dyn BehaviorAnalyticsRepository>,
        lookback_weeks: u32,
    ) -> Self {
        Self {
            suggestions,
            activities,
            analytics,
            lookback_weeks,
        }
    }

    /// Recompute the user's marking profile and persist it
    ///
    /// # Errors
    ///
    /// Returns an error when the ledger cannot be read or the row cannot
    /// be persisted.
    pub async fn recompute(&self, user_id: Uuid) -> AppResult<UserBehaviorAnalytic> {
        let rows = self
            .suggestions
            .get_user_suggestions(user_id, self.lookback_weeks)
            .await?;

        if rows.len() < MIN_SAMPLE_SIZE {
            debug!(user_id = %user_id, sample_size = rows.len(), "thin history, low-confidence default");
            let analytic = UserBehaviorAnalytic::low_confidence_default(user_id, rows.len());
            self.analytics.upsert(analytic.clone()).await?;
            return Ok(analytic);
        }

        let total = rows.len();
        let mut marked = 0usize;
        let mut big = (0usize, 0usize);
        let mut small = (0usize, 0usize);
        let mut theme_tallies: HashMap<String, (usize, usize)> = HashMap::new();
        let mut type_tallies: HashMap<String, (usize, usize)> = HashMap::new();
        let mut cost_tallies: HashMap<Cost, (usize, usize)> = HashMap::new();

        for suggestion in &rows {
            let completed = suggestion.completion_status == CompletionStatus::Completed;
            if completed {
                marked += 1;
            }

            let Some(activity) = self.activities.get(suggestion.activity_id).await? else {
                continue;
            };

            let bucket = if is_big_activity(&activity) {
                &mut big
            } else {
                &mut small
            };
            bucket.1 += 1;
            if completed {
                bucket.0 += 1;
            }

            for theme in &activity.themes {
                tally(&mut theme_tallies, theme.clone(), completed);
            }
            for activity_type in &activity.activity_types {
                tally(&mut type_tallies, activity_type.clone(), completed);
            }
            for cost in &activity.costs {
                tally(&mut cost_tallies, *cost, completed);
            }
        }

        let big_rate = rate(big);
        let small_rate = rate(small);
        let analytic = UserBehaviorAnalytic {
            user_id,
            marking_rate: marked as f64 / total as f64,
            marks_big_activities_only: big_rate > BIG_MARKING_THRESHOLD
                && small_rate < SMALL_MARKING_THRESHOLD,
            big_activity_marking_rate: big_rate,
            small_activity_marking_rate: small_rate,
            successful_themes: rates_with_min(theme_tallies, MIN_TAG_SAMPLES),
            successful_activity_types: rates_with_min(type_tallies, MIN_TAG_SAMPLES),
            successful_cost_ranges: rates_with_min(cost_tallies, MIN_COST_SAMPLES),
            sample_size: total,
            calculation_confidence: (total as f64 / FULL_CONFIDENCE_SAMPLES as f64).min(1.0),
        };

        self.analytics.upsert(analytic.clone()).await?;
        info!(
            user_id = %user_id,
            sample_size = total,
            marks_big_only = analytic.marks_big_activities_only,
            confidence = analytic.calculation_confidence,
            "behavior analytics recomputed"
        );
        Ok(analytic)
    }
}

fn tally<K: std::hash::Hash + Eq>(
    tallies: &mut HashMap<K, (usize, usize)>,
    key: K,
    completed: bool,
) {
    let entry = tallies.entry(key).or_default();
    entry.1 += 1;
    if completed {
        entry.0 += 1;
    }
}

fn rate((completed, total): (usize, usize)) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64
    }
}

fn rates_with_min<K: std::hash::Hash + Eq>(
    tallies: HashMap<K, (usize, usize)>,
    min_samples: usize,
) -> HashMap<K, f64> {
    tallies
        .into_iter()
        .filter(|(_, (_, total))| *total >= min_samples)
        .map(|(key, counts)| (key, rate(counts)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::in_memory::InMemoryStore;
    use crate::models::{Activity, ActivitySuggestion, Duration, Location};
    use chrono::Utc;
    use serde_json::json;

    fn seed(user_id: Uuid, activity_id: i64, n: i64, status: CompletionStatus) -> ActivitySuggestion {
        let date = Utc::now().date_naive() - chrono::Duration::days(n);
        ActivitySuggestion {
            id: 0,
            user_id,
            activity_id,
            suggested_date: date,
            target_week_start: date,
            suggested_reason: None,
            completion_status: status,
            completion_date: None,
            user_rating: None,
            user_feedback: None,
            weather_conditions: json!({}),
        }
    }

    fn service(store: &Arc<InMemoryStore>) -> BehaviorAnalyticsService {
        BehaviorAnalyticsService::new(store.clone(), store.clone(), store.clone(), 16)
    }

    #[tokio::test]
    async fn test_thin_history_persists_low_confidence_default() {
        let store = Arc::new(InMemoryStore::new());
        let user_id = Uuid::new_v4();
        store
            .insert_suggestion(seed(user_id, 1, 5, CompletionStatus::Completed))
            .await;

        let analytic = service(&store).recompute(user_id).await.unwrap();
        assert_eq!(analytic.sample_size, 1);
        assert!((analytic.calculation_confidence - 0.1).abs() < f64::EPSILON);

        let stored = store.get_by_user(user_id).await.unwrap().unwrap();
        assert!((stored.calculation_confidence - 0.1).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_big_only_marker_detection() {
        let store = Arc::new(InMemoryStore::new());
        let user_id = Uuid::new_v4();

        store
            .insert_activity(Activity {
                id: 1,
                title: "Day at the zoo".into(),
                costs: vec![Cost::High],
                durations: vec![Duration::FullDay],
                locations: vec![Location::Zoo],
                ..Activity::default()
            })
            .await;
        store
            .insert_activity(Activity {
                id: 2,
                title: "Backyard games".into(),
                costs: vec![Cost::Free],
                durations: vec![Duration::Short],
                locations: vec![Location::HomeOutdoor],
                ..Activity::default()
            })
            .await;

        // Big outings marked, small ones never
        for n in 0..3 {
            store
                .insert_suggestion(seed(user_id, 1, n * 7, CompletionStatus::Completed))
                .await;
        }
        for n in 0..4 {
            store
                .insert_suggestion(seed(user_id, 2, n * 7 + 1, CompletionStatus::Unknown))
                .await;
        }

        let analytic = service(&store).recompute(user_id).await.unwrap();
        assert!(analytic.marks_big_activities_only);
        assert!((analytic.big_activity_marking_rate - 1.0).abs() < f64::EPSILON);
        assert!((analytic.small_activity_marking_rate - 0.0).abs() < f64::EPSILON);
        assert!((analytic.marking_rate - 3.0 / 7.0).abs() < 1e-9);
        assert!((analytic.calculation_confidence - 7.0 / 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_tag_rates_require_minimum_samples() {
        let store = Arc::new(InMemoryStore::new());
        let user_id = Uuid::new_v4();

        store
            .insert_activity(Activity {
                id: 1,
                title: "Craft corner".into(),
                themes: vec!["CREATIVE".into()],
                costs: vec![Cost::Low],
                ..Activity::default()
            })
            .await;
        store
            .insert_activity(Activity {
                id: 2,
                title: "One-off pottery class".into(),
                themes: vec!["EDUCATIONAL".into()],
                costs: vec![Cost::Medium],
                ..Activity::default()
            })
            .await;

        for n in 0..4 {
            store
                .insert_suggestion(seed(user_id, 1, n * 3, CompletionStatus::Completed))
                .await;
        }
        store
            .insert_suggestion(seed(user_id, 2, 2, CompletionStatus::Completed))
            .await;

        let analytic = service(&store).recompute(user_id).await.unwrap();
        // CREATIVE has 4 samples, EDUCATIONAL only 1
        assert!(analytic.successful_themes.contains_key("CREATIVE"));
        assert!(!analytic.successful_themes.contains_key("EDUCATIONAL"));
        // Low cost has 4 samples, Medium only 1 (needs 2)
        assert!(analytic.successful_cost_ranges.contains_key(&Cost::Low));
        assert!(!analytic.successful_cost_ranges.contains_key(&Cost::Medium));
    }
}
