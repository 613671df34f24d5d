// ABOUTME: In-memory reference implementations of the repository traits
// ABOUTME: Backs the integration tests and database-free callers with tokio RwLocks
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ActivityRepository, BehaviorAnalyticsRepository, FamilyProfileProvider, SuggestionRepository,
    SuggestionStats, WeekActivityRepository,
};
use crate::catalog::TagSource;
use crate::errors::{AppError, AppResult};
use crate::models::{
    Activity, ActivitySuggestion, CompletionStatus, FamilyProfile, NewSuggestion,
    UserBehaviorAnalytic, WeekActivity,
};

/// In-memory store implementing every repository trait
///
/// Single-process only; clones of the `Arc`-wrapped store share state. Rows
/// keep the same uniqueness rules as the real schema, including the
/// `(user_id, activity_id, target_week_start)` constraint on suggestions.
#[derive(Default)]
pub struct InMemoryStore {
    activities: RwLock<HashMap<i64, Activity>>,
    week_activities: RwLock<Vec<WeekActivity>>,
    suggestions: RwLock<Vec<ActivitySuggestion>>,
    analytics: RwLock<HashMap<Uuid, UserBehaviorAnalytic>>,
    profiles: RwLock<HashMap<Uuid, FamilyProfile>>,
    themes: RwLock<Vec<String>>,
    activity_types: RwLock<Vec<String>>,
    next_suggestion_id: AtomicI64,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_suggestion_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    pub async fn insert_activity(&self, activity: Activity) {
        self.activities.write().await.insert(activity.id, activity);
    }

    pub async fn insert_week_activity(&self, row: WeekActivity) {
        self.week_activities.write().await.push(row);
    }

    /// Seed a historical suggestion row directly, bypassing the batch API
    pub async fn insert_suggestion(&self, mut suggestion: ActivitySuggestion) {
        if suggestion.id == 0 {
            suggestion.id = self.next_suggestion_id.fetch_add(1, Ordering::SeqCst);
        }
        self.suggestions.write().await.push(suggestion);
    }

    pub async fn set_profile(&self, profile: FamilyProfile) {
        self.profiles.write().await.insert(profile.user_id, profile);
    }

    pub async fn set_tag_vocabulary(&self, themes: Vec<String>, activity_types: Vec<String>) {
        *self.themes.write().await = themes;
        *self.activity_types.write().await = activity_types;
    }

    pub async fn suggestion_count(&self) -> usize {
        self.suggestions.read().await.len()
    }
}

#[async_trait]
impl ActivityRepository for InMemoryStore {
    async fn get_filtered_activities(&self, _user_id: Uuid) -> AppResult<Vec<Activity>> {
        let mut activities: Vec<Activity> =
            self.activities.read().await.values().cloned().collect();
        activities.sort_by_key(|a| a.id);
        Ok(activities)
    }

    async fn get(&self, activity_id: i64) -> AppResult<Option<Activity>> {
        Ok(self.activities.read().await.get(&activity_id).cloned())
    }
}

#[async_trait]
impl WeekActivityRepository for InMemoryStore {
    async fn get_week_activities(
        &self,
        user_id: Uuid,
        year: i32,
        week: u32,
    ) -> AppResult<Vec<WeekActivity>> {
        Ok(self
            .week_activities
            .read()
            .await
            .iter()
            .filter(|row| row.user_id == user_id && row.year == year && row.week == week)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SuggestionRepository for InMemoryStore {
    async fn get_user_suggestions(
        &self,
        user_id: Uuid,
        lookback_weeks: u32,
    ) -> AppResult<Vec<ActivitySuggestion>> {
        let cutoff = Utc::now().date_naive() - chrono::Duration::weeks(i64::from(lookback_weeks));
        Ok(self
            .suggestions
            .read()
            .await
            .iter()
            .filter(|s| s.user_id == user_id && s.suggested_date >= cutoff)
            .cloned()
            .collect())
    }

    async fn get_activities_suggested_for_week(
        &self,
        user_id: Uuid,
        target_week_start: NaiveDate,
    ) -> AppResult<Vec<i64>> {
        Ok(self
            .suggestions
            .read()
            .await
            .iter()
            .filter(|s| s.user_id == user_id && s.target_week_start == target_week_start)
            .map(|s| s.activity_id)
            .collect())
    }

    async fn create_suggestions(
        &self,
        new_rows: Vec<NewSuggestion>,
    ) -> AppResult<Vec<ActivitySuggestion>> {
        let mut suggestions = self.suggestions.write().await;

        // Uniqueness check up front so a conflict inserts nothing
        for row in &new_rows {
            let exists = suggestions.iter().any(|s| {
                s.user_id == row.user_id
                    && s.activity_id == row.activity_id
                    && s.target_week_start == row.target_week_start
            });
            if exists {
                return Err(AppError::new(
                    crate::errors::ErrorCode::ResourceAlreadyExists,
                    format!(
                        "suggestion for activity {} already exists for week {}",
                        row.activity_id, row.target_week_start
                    ),
                )
                .with_user_id(row.user_id));
            }
        }

        let mut created = Vec::with_capacity(new_rows.len());
        for row in new_rows {
            let suggestion = ActivitySuggestion {
                id: self.next_suggestion_id.fetch_add(1, Ordering::SeqCst),
                user_id: row.user_id,
                activity_id: row.activity_id,
                suggested_date: row.suggested_date,
                target_week_start: row.target_week_start,
                suggested_reason: row.suggested_reason,
                completion_status: CompletionStatus::Unknown,
                completion_date: None,
                user_rating: None,
                user_feedback: None,
                weather_conditions: row.weather_conditions,
            };
            suggestions.push(suggestion.clone());
            created.push(suggestion);
        }
        Ok(created)
    }

    async fn update_suggestion_status(
        &self,
        suggestion_id: i64,
        status: CompletionStatus,
        completion_date: Option<NaiveDate>,
    ) -> AppResult<ActivitySuggestion> {
        let mut suggestions = self.suggestions.write().await;
        let row = suggestions
            .iter_mut()
            .find(|s| s.id == suggestion_id)
            .ok_or_else(|| {
                AppError::not_found("suggestion").with_resource_id(suggestion_id.to_string())
            })?;

        // User-set statuses win over anything the engine computes later
        if row.completion_status.is_explicit() && !status.is_explicit() {
            return Ok(row.clone());
        }

        row.completion_status = status;
        row.completion_date = completion_date;
        Ok(row.clone())
    }

    async fn get_suggestion_stats(
        &self,
        user_id: Uuid,
        activity_id: i64,
    ) -> AppResult<SuggestionStats> {
        let suggestions = self.suggestions.read().await;
        let rows: Vec<&ActivitySuggestion> = suggestions
            .iter()
            .filter(|s| s.user_id == user_id && s.activity_id == activity_id)
            .collect();

        let total = rows.len();
        let completed = rows
            .iter()
            .filter(|s| s.completion_status == CompletionStatus::Completed)
            .count();
        let ratings: Vec<f64> = rows
            .iter()
            .filter_map(|s| s.user_rating.map(f64::from))
            .collect();

        Ok(SuggestionStats {
            total_suggestions: total,
            completed_count: completed,
            completion_rate: if total == 0 {
                0.0
            } else {
                completed as f64 / total as f64
            },
            last_suggested: rows.iter().map(|s| s.suggested_date).max(),
            avg_rating: if ratings.is_empty() {
                None
            } else {
                Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
            },
        })
    }
}

#[async_trait]
impl BehaviorAnalyticsRepository for InMemoryStore {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<UserBehaviorAnalytic>> {
        Ok(self.analytics.read().await.get(&user_id).cloned())
    }

    async fn upsert(&self, analytic: UserBehaviorAnalytic) -> AppResult<()> {
        self.analytics
            .write()
            .await
            .insert(analytic.user_id, analytic);
        Ok(())
    }
}

#[async_trait]
impl FamilyProfileProvider for InMemoryStore {
    async fn get_family_profile(&self, user_id: Uuid) -> AppResult<FamilyProfile> {
        self.profiles
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("family profile").with_user_id(user_id))
    }
}

#[async_trait]
impl TagSource for InMemoryStore {
    async fn theme_names(&self) -> AppResult<Vec<String>> {
        Ok(self.themes.read().await.clone())
    }

    async fn activity_type_names(&self) -> AppResult<Vec<String>> {
        Ok(self.activity_types.read().await.clone())
    }
}
