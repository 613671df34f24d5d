// ABOUTME: Weekly planning orchestrator: context, filtering, batching, two LLM rounds
// ABOUTME: Validates recommendations and records them in the suggestion ledger
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Activity Planner
//!
//! `plan_weekly_activities` runs the full pipeline for one user and one
//! target week: build the weekly context, filter candidates, batch them,
//! fan out concurrent shortlist calls, re-rank the merged shortlist in a
//! finalist call, validate, and record. The weather provider and the tag
//! catalog are degradable; the LLM finalist round is not.

use chrono::{Datelike, NaiveDate, Utc};
use futures_util::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::{TagCatalog, TagVocabulary};
use crate::config::PlannerConfig;
use crate::database::{
    ActivityRepository, BehaviorAnalyticsRepository, FamilyProfileProvider, SuggestionRepository,
    WeekActivityRepository,
};
use crate::errors::{AppError, AppResult};
use crate::intelligence::weather::{summarize_forecast, WeatherProvider, WeatherQuery};
use crate::intelligence::{
    DiversityBatchBuilder, HistoricalActivityAnalyzer, PastActivityContext, SchoolSchedule,
    SeasonLabel, WeeklyContext,
};
use crate::llm::prompts::{
    build_finalist_prompt, build_shortlist_prompt, recommendation_schema, MAX_RECOMMENDATIONS,
    MIN_RECOMMENDATIONS, SYSTEM_PROMPT,
};
use crate::llm::{extract_json, ChatMessage, ChatRequest, LlmProvider};
use crate::models::{Activity, FamilyProfile, NewSuggestion, RecommendedActivity};

/// Placeholder until per-item scoring exists downstream
const DEFAULT_PRIORITY_SCORE: f64 = 0.5;

/// One recommendation item as returned by either LLM round
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationItem {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub why_it_fits: String,
}

/// Weekly planning orchestrator
pub struct ActivityPlanner {
    config: PlannerConfig,
    llm: Arc<dyn LlmProvider>,
    weather: Arc<dyn WeatherProvider>,
    activities: Arc<dyn ActivityRepository>,
    week_activities: Arc<dyn WeekActivityRepository>,
    suggestions: Arc<dyn SuggestionRepository>,
    profiles: Arc<dyn FamilyProfileProvider>,
    analyzer: HistoricalActivityAnalyzer,
    catalog: Option<Arc<TagCatalog>>,
    rng_seed: Option<u64>,
}

impl ActivityPlanner {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        config: PlannerConfig,
        llm: Arc<dyn LlmProvider>,
        weather: Arc<dyn WeatherProvider>,
        activities: Arc<dyn ActivityRepository>,
        week_activities: Arc<dyn WeekActivityRepository>,
        suggestions: Arc<dyn SuggestionRepository>,
        analytics: Arc<dyn BehaviorAnalyticsRepository>,
        profiles: Arc<dyn FamilyProfileProvider>,
    ) -> Self {
        let analyzer = HistoricalActivityAnalyzer::new(
            suggestions.clone(),
            activities.clone(),
            analytics,
            config.history_lookback_weeks,
        );
        Self {
            config,
            llm,
            weather,
            activities,
            week_activities,
            suggestions,
            profiles,
            analyzer,
            catalog: None,
            rng_seed: None,
        }
    }

    /// Attach a tag catalog so prompts can name the known theme vocabulary
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<TagCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Fix the batching RNG seed, for deterministic tests
    #[must_use]
    pub const fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Plan activities for one user's week and record the result
    ///
    /// `target_week` defaults to next Monday; `notes` are free-form caller
    /// context passed through to the prompt.
    ///
    /// # Errors
    ///
    /// Fails when no candidates remain after filtering, when every shortlist
    /// batch fails, when the finalist round exhausts its retries, or when
    /// zero recommendations survive validation.
    pub async fn plan_weekly_activities(
        &self,
        user_id: Uuid,
        target_week: Option<NaiveDate>,
        notes: Option<String>,
    ) -> AppResult<Vec<RecommendedActivity>> {
        let today = Utc::now().date_naive();
        let target_week_start = target_week.unwrap_or_else(|| next_monday(today));
        info!(user_id = %user_id, week = %target_week_start, "planning weekly activities");

        let profile = self.profiles.get_family_profile(user_id).await?;
        let weekly = self.build_weekly_context(&profile, target_week_start, notes).await;
        let candidates = self.filter_candidates(user_id, target_week_start).await?;
        if candidates.is_empty() {
            return Err(
                AppError::validation("no candidate activities after filtering")
                    .with_user_id(user_id),
            );
        }

        let past = self.analyzer.build_context(user_id).await?;
        let vocabulary = self.load_vocabulary().await;

        let candidate_index: HashMap<i64, Activity> =
            candidates.iter().map(|a| (a.id, a.clone())).collect();

        let shortlist = self
            .run_shortlist_round(&profile, &weekly, &past, vocabulary.as_deref(), candidates)
            .await?;
        let finalists = resolve_items(&shortlist, &candidate_index);
        debug!(finalists = finalists.len(), "shortlist merged");

        let finalist_prompt =
            build_finalist_prompt(&profile, &weekly, &past, vocabulary.as_deref(), &finalists);
        let final_items = self.call_with_retry(&finalist_prompt).await?;

        let validated = validate_items(&final_items, &candidate_index);
        if validated.is_empty() {
            return Err(AppError::validation(
                "no usable recommendations after validation",
            )
            .with_user_id(user_id));
        }

        self.record_suggestions(user_id, target_week_start, today, &weekly, &validated)
            .await?;

        info!(
            user_id = %user_id,
            recommendations = validated.len(),
            "weekly plan recorded"
        );
        Ok(validated)
    }

    /// Weekly context; a weather failure degrades to an empty forecast
    async fn build_weekly_context(
        &self,
        profile: &FamilyProfile,
        target_week_start: NaiveDate,
        notes: Option<String>,
    ) -> WeeklyContext {
        let query = WeatherQuery {
            location: Some(profile.home_location.clone()),
            coordinates: profile.home_coordinates,
            week_start: target_week_start,
        };
        let forecast = match self.weather.get_weekly_forecast(&query).await {
            Ok(days) => days,
            Err(error) => {
                warn!(%error, "weather unavailable, planning without forecast");
                Vec::new()
            }
        };

        WeeklyContext {
            target_week_start,
            weather_forecast: forecast,
            season: SeasonLabel::from_month(target_week_start.month()),
            school_schedule: SchoolSchedule::from_date(target_week_start),
            additional_notes: notes,
        }
    }

    /// Eligible activities minus those scheduled or already suggested for
    /// the target week
    async fn filter_candidates(
        &self,
        user_id: Uuid,
        target_week_start: NaiveDate,
    ) -> AppResult<Vec<Activity>> {
        let all = self.activities.get_filtered_activities(user_id).await?;

        let iso = target_week_start.iso_week();
        let scheduled: HashSet<i64> = self
            .week_activities
            .get_week_activities(user_id, iso.year(), iso.week())
            .await?
            .into_iter()
            .map(|row| row.activity_id)
            .collect();
        let suggested: HashSet<i64> = self
            .suggestions
            .get_activities_suggested_for_week(user_id, target_week_start)
            .await?
            .into_iter()
            .collect();

        let candidates: Vec<Activity> = all
            .into_iter()
            .filter(|a| !scheduled.contains(&a.id) && !suggested.contains(&a.id))
            .collect();
        debug!(
            candidates = candidates.len(),
            scheduled = scheduled.len(),
            suggested = suggested.len(),
            "candidate pool filtered"
        );
        Ok(candidates)
    }

    async fn load_vocabulary(&self) -> Option<Arc<TagVocabulary>> {
        let catalog = self.catalog.as_ref()?;
        match catalog.vocabulary().await {
            Ok(vocab) => Some(vocab),
            Err(error) => {
                warn!(%error, "tag catalog unavailable, prompting without vocabulary");
                None
            }
        }
    }

    /// Batch the candidates and fan out one shortlist call per batch
    ///
    /// Failed batches are logged and dropped; only an empty merge is fatal.
    async fn run_shortlist_round(
        &self,
        profile: &FamilyProfile,
        weekly: &WeeklyContext,
        past: &PastActivityContext,
        vocabulary: Option<&TagVocabulary>,
        candidates: Vec<Activity>,
    ) -> AppResult<Vec<RecommendationItem>> {
        let mut rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let builder = DiversityBatchBuilder::new(
            self.config.min_batch_size,
            self.config.stretch_per_batch,
            self.config.diversity_weight,
        );
        let batches = builder.build_batches(candidates, &mut rng);
        let batch_count = batches.len();

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_batches.max(1)));
        let calls = batches.into_iter().enumerate().map(|(index, batch)| {
            let prompt = build_shortlist_prompt(profile, weekly, past, vocabulary, &batch);
            let semaphore = Arc::clone(&semaphore);
            async move {
                // Closed only on semaphore drop, which cannot happen here
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| AppError::internal(format!("semaphore closed: {e}")))?;
                self.call_with_retry(&prompt).await.map(|items| (index, items))
            }
        });

        let mut merged = Vec::new();
        let mut failed = 0usize;
        for result in join_all(calls).await {
            match result {
                Ok((index, items)) => {
                    debug!(batch = index, items = items.len(), "shortlist batch done");
                    merged.extend(items);
                }
                Err(error) => {
                    failed += 1;
                    warn!(%error, "shortlist batch failed, dropping");
                }
            }
        }

        if merged.is_empty() {
            return Err(AppError::internal(format!(
                "all {batch_count} shortlist batches failed ({failed} errors)"
            )));
        }
        Ok(merged)
    }

    /// One LLM round with bounded retries on transient failures
    async fn call_with_retry(&self, prompt: &str) -> AppResult<Vec<RecommendationItem>> {
        let request = ChatRequest {
            model: self.config.llm_model.clone(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
            temperature: self.config.llm_temperature,
            max_tokens: self.config.llm_max_tokens,
            response_schema: Some(recommendation_schema()),
        };

        let attempts = self.config.llm_max_retries.max(1);
        for attempt in 1..=attempts {
            let outcome = match self.llm.complete(&request).await {
                Ok(response) => parse_recommendations(&response.content),
                Err(error) => Err(error),
            };
            match outcome {
                Ok(items) => return Ok(items),
                Err(error) if error.code.is_transient() => {
                    warn!(%error, attempt, "LLM round failed, retrying");
                }
                Err(error) => return Err(error),
            }
        }
        Err(AppError::llm_retries_exhausted(attempts))
    }

    async fn record_suggestions(
        &self,
        user_id: Uuid,
        target_week_start: NaiveDate,
        today: NaiveDate,
        weekly: &WeeklyContext,
        validated: &[RecommendedActivity],
    ) -> AppResult<()> {
        let snapshot = weather_snapshot(weekly);
        let rows: Vec<NewSuggestion> = validated
            .iter()
            .map(|item| NewSuggestion {
                user_id,
                activity_id: item.id,
                suggested_date: today,
                target_week_start,
                suggested_reason: Some(item.why_it_fits.clone()),
                weather_conditions: snapshot.clone(),
            })
            .collect();

        self.suggestions.create_suggestions(rows).await?;
        Ok(())
    }
}

/// The Monday of the following ISO week
#[must_use]
pub fn next_monday(today: NaiveDate) -> NaiveDate {
    let ahead = 7 - i64::from(today.weekday().num_days_from_monday());
    today + chrono::Duration::days(ahead)
}

/// Decode a response body into recommendation items
///
/// Accepts both the schema shape (`{"recommendations": [...]}`) and a bare
/// array, which looser backends return. Malformed individual items are
/// dropped, not the round; only a response with zero decodable items is an
/// error (and gets retried).
fn parse_recommendations(content: &str) -> AppResult<Vec<RecommendationItem>> {
    let value = extract_json(content)?;
    let raw = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("recommendations") {
            Some(serde_json::Value::Array(items)) => items,
            _ => return Err(AppError::llm_schema("object without recommendations array")),
        },
        _ => return Err(AppError::llm_schema("expected array or object")),
    };

    let total = raw.len();
    let items: Vec<RecommendationItem> = raw
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(item) => Some(item),
            Err(error) => {
                warn!(%error, "malformed recommendation item, dropping");
                None
            }
        })
        .collect();

    if items.is_empty() {
        return Err(AppError::llm_parse(format!(
            "no decodable items among {total}"
        )));
    }
    Ok(items)
}

/// Map shortlist items back to full candidate payloads, deduplicated in
/// first-seen order; ids outside the pool are dropped
fn resolve_items(
    items: &[RecommendationItem],
    candidates: &HashMap<i64, Activity>,
) -> Vec<Activity> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    for item in items {
        if !seen.insert(item.id) {
            continue;
        }
        match candidates.get(&item.id) {
            Some(activity) => resolved.push(activity.clone()),
            None => warn!(id = item.id, "shortlisted id not in candidate pool, dropping"),
        }
    }
    resolved
}

/// Drop malformed items, enforce the candidate set, and clamp the count
fn validate_items(
    items: &[RecommendationItem],
    candidates: &HashMap<i64, Activity>,
) -> Vec<RecommendedActivity> {
    let mut validated = Vec::new();
    let mut seen = HashSet::new();
    for item in items {
        let Some(activity) = candidates.get(&item.id) else {
            warn!(id = item.id, "recommendation outside candidate pool, dropping");
            continue;
        };
        if item.why_it_fits.trim().is_empty() {
            warn!(id = item.id, "recommendation missing reasoning, dropping");
            continue;
        }
        if !seen.insert(item.id) {
            continue;
        }
        validated.push(RecommendedActivity {
            id: item.id,
            title: activity.title.clone(),
            why_it_fits: item.why_it_fits.trim().to_owned(),
            priority_score: DEFAULT_PRIORITY_SCORE,
        });
    }

    if validated.len() > MAX_RECOMMENDATIONS {
        warn!(
            count = validated.len(),
            "finalist round over-delivered, truncating"
        );
        validated.truncate(MAX_RECOMMENDATIONS);
    } else if validated.len() < MIN_RECOMMENDATIONS {
        warn!(count = validated.len(), "fewer recommendations than expected");
    }
    validated
}

/// Snapshot stored with each suggestion and read back during inference
fn weather_snapshot(weekly: &WeeklyContext) -> serde_json::Value {
    let suitable = weekly.weather_forecast.is_empty()
        || weekly
            .weather_forecast
            .iter()
            .any(|day| day.suitable_for_outdoor);
    json!({
        "forecast_summary": summarize_forecast(&weekly.weather_forecast),
        "season": weekly.season.as_str(),
        "suitable_for_outdoor": suitable,
    })
}
