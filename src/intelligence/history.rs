// ABOUTME: Builds repetition guidance from the recent suggestion ledger
// ABOUTME: Buckets activities into encourage, cooldown, and avoid lists with reasons
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Historical Activity Analysis
//!
//! Walks the trailing suggestion window, infers what actually happened to
//! each suggestion, and condenses the result into the
//! [`PastActivityContext`] the prompt builder hands to the LLM: which
//! activities to repeat, which are resting, and which to hold back.

use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::completion::{CompletionInferencer, MarkingBehavior};
use super::repetition::RepetitionClassifier;
use super::{
    ActivityCooldownInfo, ActivityRepetitionInfo, PastActivityContext, PatternMap,
    RepetitionTolerance,
};
use crate::database::{ActivityRepository, BehaviorAnalyticsRepository, SuggestionRepository};
use crate::errors::AppResult;
use crate::models::{Activity, CompletionStatus, Cost};

const ENCOURAGE_CAP: usize = 10;
const COOLDOWN_CAP: usize = 15;
const AVOID_CAP: usize = 20;
const FAVORITE_THEME_COUNT: usize = 5;
const PREFERRED_DURATION_COUNT: usize = 3;
/// Sentinel for activities never suggested before
const NEVER_SUGGESTED_WEEKS: u32 = 999;

/// Per-activity accumulation over the lookback window
struct ActivityRecord {
    activity: Activity,
    tolerance: RepetitionTolerance,
    suggested_count: usize,
    estimated_completed: f64,
    explicit_completions: usize,
    last_suggested: NaiveDate,
}

impl ActivityRecord {
    fn completion_rate(&self) -> f64 {
        if self.suggested_count == 0 {
            0.0
        } else {
            self.estimated_completed / self.suggested_count as f64
        }
    }

    fn weeks_since(&self, today: NaiveDate) -> u32 {
        let days = (today - self.last_suggested).num_days();
        if days < 0 {
            0
        } else {
            u32::try_from(days / 7).unwrap_or(NEVER_SUGGESTED_WEEKS)
        }
    }
}

/// Analyzer over the recent suggestion ledger
pub struct HistoricalActivityAnalyzer {
    suggestions: Arc<dyn SuggestionRepository>,
    activities: Arc<dyn ActivityRepository>,
    analytics: Arc<dyn BehaviorAnalyticsRepository>,
    classifier: RepetitionClassifier,
    inferencer: CompletionInferencer,
    lookback_weeks: u32,
}

impl HistoricalActivityAnalyzer {
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
            classifier: RepetitionClassifier::new(),
            inferencer: CompletionInferencer::new(),
            lookback_weeks,
        }
    }

    /// Build repetition guidance for a user as of today
    ///
    /// # Errors
    ///
    /// Returns an error when the suggestion ledger cannot be read.
    pub async fn build_context(&self, user_id: uuid::Uuid) -> AppResult<PastActivityContext> {
        let today = Utc::now().date_naive();
        let rows = self
            .suggestions
            .get_user_suggestions(user_id, self.lookback_weeks)
            .await?;
        if rows.is_empty() {
            return Ok(PastActivityContext::default());
        }

        let behavior = self
            .analytics
            .get_by_user(user_id)
            .await?
            .map(|a| MarkingBehavior {
                marks_big_activities_only: a.marks_big_activities_only,
            })
            .unwrap_or_default();

        let mut records: HashMap<i64, ActivityRecord> = HashMap::new();
        let mut successful = PatternMap::default();
        let mut avoided = PatternMap::default();
        let mut theme_success_counts: HashMap<String, usize> = HashMap::new();
        let mut duration_totals: HashMap<String, (usize, usize)> = HashMap::new();

        for suggestion in &rows {
            let Some(activity) = self.activities.get(suggestion.activity_id).await? else {
                continue;
            };

            let status = self.inferencer.infer(suggestion, &activity, behavior, today);
            let tolerance = self.classifier.classify(&activity);

            let record = records
                .entry(activity.id)
                .or_insert_with(|| ActivityRecord {
                    tolerance,
                    suggested_count: 0,
                    estimated_completed: 0.0,
                    explicit_completions: 0,
                    last_suggested: suggestion.suggested_date,
                    activity: activity.clone(),
                });
            record.suggested_count += 1;
            record.estimated_completed += completion_weight(status);
            if status == CompletionStatus::Completed {
                record.explicit_completions += 1;
            }
            if suggestion.suggested_date > record.last_suggested {
                record.last_suggested = suggestion.suggested_date;
            }

            if status.is_successful() {
                accumulate_patterns(&mut successful, &activity);
                for theme in &activity.themes {
                    *theme_success_counts.entry(theme.clone()).or_default() += 1;
                }
            } else if status.is_skipped() {
                accumulate_patterns(&mut avoided, &activity);
            }

            for duration in &activity.durations {
                let entry = duration_totals
                    .entry(duration.as_str().to_owned())
                    .or_default();
                entry.1 += 1;
                if status.is_successful() {
                    entry.0 += 1;
                }
            }
        }

        let mut context = PastActivityContext {
            successful_patterns: successful,
            avoided_patterns: avoided,
            favorite_themes: top_by_count(theme_success_counts, FAVORITE_THEME_COUNT),
            preferred_durations: top_by_rate(duration_totals, PREFERRED_DURATION_COUNT),
            ..PastActivityContext::default()
        };

        for record in records.values() {
            self.bucket_record(record, today, &mut context);
        }

        context
            .encourage_repetition
            .sort_by(|a, b| b.completion_rate.total_cmp(&a.completion_rate));
        context.encourage_repetition.truncate(ENCOURAGE_CAP);
        context
            .moderate_cooldown
            .sort_by_key(|c| std::cmp::Reverse(c.weeks_until_available));
        context.moderate_cooldown.truncate(COOLDOWN_CAP);
        context
            .avoid_repetition
            .sort_by_key(|c| std::cmp::Reverse(c.weeks_until_available));
        context.avoid_repetition.truncate(AVOID_CAP);

        debug!(
            user_id = %user_id,
            encourage = context.encourage_repetition.len(),
            cooldown = context.moderate_cooldown.len(),
            avoid = context.avoid_repetition.len(),
            "repetition guidance built"
        );
        Ok(context)
    }

    fn bucket_record(
        &self,
        record: &ActivityRecord,
        today: NaiveDate,
        context: &mut PastActivityContext,
    ) {
        let rate = record.completion_rate();
        let weeks_since = record.weeks_since(today);
        let cooldown = record.tolerance.cooldown_weeks();

        match record.tolerance {
            RepetitionTolerance::High => {
                if rate >= 0.5 || record.explicit_completions >= 1 {
                    context.encourage_repetition.push(ActivityRepetitionInfo {
                        activity_id: record.activity.id,
                        title: record.activity.title.clone(),
                        tolerance: record.tolerance,
                        completion_rate: rate,
                        explicit_completions: record.explicit_completions,
                        weeks_since_last: weeks_since,
                        reason: encouragement_reason(record, rate),
                    });
                }
            }
            RepetitionTolerance::Medium => {
                if weeks_since < cooldown && rate > 0.4 {
                    context
                        .moderate_cooldown
                        .push(cooldown_info(record, weeks_since, cooldown));
                }
            }
            RepetitionTolerance::Low | RepetitionTolerance::VeryLow => {
                if weeks_since < cooldown && rate > 0.3 {
                    context
                        .avoid_repetition
                        .push(cooldown_info(record, weeks_since, cooldown));
                }
            }
        }
    }
}

/// Completion weight contributed by one suggestion's status
fn completion_weight(status: CompletionStatus) -> f64 {
    match status {
        CompletionStatus::Completed => 1.0,
        CompletionStatus::LikelyCompleted => 0.8,
        CompletionStatus::PossiblyCompleted => 0.6,
        _ => 0.0,
    }
}

fn accumulate_patterns(patterns: &mut PatternMap, activity: &Activity) {
    for theme in &activity.themes {
        *patterns.themes.entry(theme.clone()).or_default() += 1;
    }
    for activity_type in &activity.activity_types {
        *patterns.activity_types.entry(activity_type.clone()).or_default() += 1;
    }
}

fn encouragement_reason(record: &ActivityRecord, rate: f64) -> String {
    if record.explicit_completions > 0 {
        let times = record.explicit_completions;
        return format!(
            "marked completed {times} time{} recently",
            if times == 1 { "" } else { "s" }
        );
    }
    if rate >= 0.7 {
        return format!(
            "likely completed regularly (estimated {:.0}% completion)",
            rate * 100.0
        );
    }
    if record.activity.is_weather_dependent() {
        return "a family favorite for good-weather days".to_owned();
    }
    if record
        .activity
        .costs
        .iter()
        .any(|c| matches!(c, Cost::Free | Cost::Low))
    {
        return "an easy free or low-cost go-to".to_owned();
    }
    "has worked well for this family before".to_owned()
}

fn cooldown_info(record: &ActivityRecord, weeks_since: u32, cooldown: u32) -> ActivityCooldownInfo {
    let weeks_until = cooldown.saturating_sub(weeks_since);
    ActivityCooldownInfo {
        activity_id: record.activity.id,
        title: record.activity.title.clone(),
        tolerance: record.tolerance,
        weeks_since_last: weeks_since,
        cooldown_weeks: cooldown,
        weeks_until_available: weeks_until,
        reason: format!(
            "suggested {weeks_since} week{} ago, prefers a {cooldown}-week break \
             ({weeks_until} week{} until available)",
            if weeks_since == 1 { "" } else { "s" },
            if weeks_until == 1 { "" } else { "s" },
        ),
    }
}

fn top_by_count(counts: HashMap<String, usize>, limit: usize) -> Vec<String> {
    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.into_iter().take(limit).map(|(name, _)| name).collect()
}

fn top_by_rate(totals: HashMap<String, (usize, usize)>, limit: usize) -> Vec<String> {
    let mut entries: Vec<(String, f64)> = totals
        .into_iter()
        .filter(|(_, (_, total))| *total > 0)
        .map(|(name, (success, total))| (name, success as f64 / total as f64))
        .collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.into_iter().take(limit).map(|(name, _)| name).collect()
}
