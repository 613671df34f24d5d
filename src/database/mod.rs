// ABOUTME: Async repository traits the engine consumes for persistence access
// ABOUTME: Declares activity, schedule, suggestion, analytics, and profile seams
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Repository Traits
//!
//! The engine never owns persistence; the surrounding backend passes in
//! implementations of these traits. The [`in_memory`] module ships reference
//! implementations over tokio locks, used by the integration tests and by
//! callers without a database.

pub mod in_memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::{
    Activity, ActivitySuggestion, CompletionStatus, FamilyProfile, NewSuggestion,
    UserBehaviorAnalytic, WeekActivity,
};

/// Completion statistics for one activity, per user
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SuggestionStats {
    pub total_suggestions: usize,
    pub completed_count: usize,
    pub completion_rate: f64,
    pub last_suggested: Option<NaiveDate>,
    pub avg_rating: Option<f64>,
}

/// Access to the activity catalog
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// All activities eligible for the given user's suggestions
    async fn get_filtered_activities(&self, user_id: Uuid) -> AppResult<Vec<Activity>>;

    /// Single activity lookup
    async fn get(&self, activity_id: i64) -> AppResult<Option<Activity>>;
}

/// Access to the weekly planning board
#[async_trait]
pub trait WeekActivityRepository: Send + Sync {
    /// Activities already scheduled for the given ISO week
    async fn get_week_activities(
        &self,
        user_id: Uuid,
        year: i32,
        week: u32,
    ) -> AppResult<Vec<WeekActivity>>;
}

/// Access to the suggestion ledger
#[async_trait]
pub trait SuggestionRepository: Send + Sync {
    /// Suggestions for the user within the trailing lookback window
    async fn get_user_suggestions(
        &self,
        user_id: Uuid,
        lookback_weeks: u32,
    ) -> AppResult<Vec<ActivitySuggestion>>;

    /// Activity ids already suggested for the given target week
    async fn get_activities_suggested_for_week(
        &self,
        user_id: Uuid,
        target_week_start: NaiveDate,
    ) -> AppResult<Vec<i64>>;

    /// Record a planning run's output in one batch, all-or-nothing
    async fn create_suggestions(
        &self,
        suggestions: Vec<NewSuggestion>,
    ) -> AppResult<Vec<ActivitySuggestion>>;

    /// Update a suggestion's completion status
    ///
    /// Explicit user-set statuses are immutable: an engine update against a
    /// row the user already marked is a no-op returning the stored row.
    async fn update_suggestion_status(
        &self,
        suggestion_id: i64,
        status: CompletionStatus,
        completion_date: Option<NaiveDate>,
    ) -> AppResult<ActivitySuggestion>;

    /// Completion statistics for one activity
    async fn get_suggestion_stats(
        &self,
        user_id: Uuid,
        activity_id: i64,
    ) -> AppResult<SuggestionStats>;
}

/// Access to persisted behavior analytics rows
#[async_trait]
pub trait BehaviorAnalyticsRepository: Send + Sync {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<UserBehaviorAnalytic>>;

    async fn upsert(&self, analytic: UserBehaviorAnalytic) -> AppResult<()>;
}

/// Access to the assembled family profile
#[async_trait]
pub trait FamilyProfileProvider: Send + Sync {
    async fn get_family_profile(&self, user_id: Uuid) -> AppResult<FamilyProfile>;
}
