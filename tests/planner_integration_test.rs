// ABOUTME: End-to-end planner tests with a scripted LLM provider and in-memory store
// ABOUTME: Covers the two-round pipeline, retries, validation, and ledger recording

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use famplan::config::PlannerConfig;
use famplan::database::in_memory::InMemoryStore;
use famplan::database::SuggestionRepository;
use famplan::errors::{AppError, AppResult, ErrorCode};
use famplan::intelligence::weather::{WeatherDay, WeatherProvider, WeatherQuery};
use famplan::llm::{ChatRequest, ChatResponse, LlmProvider};
use famplan::models::{Activity, Cost, Duration, FamilyProfile, KidProfile, Location};
use famplan::planner::ActivityPlanner;

/// Replays a fixed sequence of responses and records every prompt
struct ScriptedLlm {
    responses: Mutex<VecDeque<AppResult<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new(responses: Vec<AppResult<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    async fn call_count(&self) -> usize {
        self.prompts.lock().await.len()
    }

    async fn prompt(&self, index: usize) -> String {
        self.prompts.lock().await[index].clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        let user_prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().await.push(user_prompt);

        let next = self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(AppError::llm_empty()));
        next.map(|content| ChatResponse {
            content,
            model: request.model.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

struct SunnyWeather;

#[async_trait]
impl WeatherProvider for SunnyWeather {
    async fn get_weekly_forecast(&self, query: &WeatherQuery) -> AppResult<Vec<WeatherDay>> {
        Ok((0..7)
            .map(|i| {
                WeatherDay::from_measurements(
                    query.week_start + chrono::Duration::days(i),
                    "Clear sky".to_owned(),
                    14.0,
                    24.0,
                    0.0,
                    0.0,
                    0.0,
                )
            })
            .collect())
    }
}

struct BrokenWeather;

#[async_trait]
impl WeatherProvider for BrokenWeather {
    async fn get_weekly_forecast(&self, _query: &WeatherQuery) -> AppResult<Vec<WeatherDay>> {
        Err(AppError::external_service("weather", "service down"))
    }
}

fn activity(id: i64, title: &str) -> Activity {
    Activity {
        id,
        title: title.to_owned(),
        description: format!("{title} for the whole family"),
        themes: vec!["OUTDOOR".into()],
        costs: vec![Cost::Free],
        durations: vec![Duration::Short],
        locations: vec![Location::Local],
        ..Activity::default()
    }
}

fn profile(user_id: Uuid) -> FamilyProfile {
    FamilyProfile {
        user_id,
        family_size: 4,
        adults_count: 2,
        kids: vec![
            KidProfile {
                name: "Maya".into(),
                age: 6,
            },
            KidProfile {
                name: "Theo".into(),
                age: 9,
            },
        ],
        home_location: "Lisbon".into(),
        home_coordinates: Some((38.72, -9.14)),
        max_travel_distance_km: 40,
        has_car: true,
        preferred_cost_ranges: vec![Cost::Free, Cost::Low],
        available_days: vec!["saturday".into(), "sunday".into()],
        preferred_themes: vec!["OUTDOOR".into()],
        preferred_activity_types: vec![],
        group_activity_comfort: "medium".into(),
        new_experience_openness: "high".into(),
    }
}

async fn seed_store(store: &InMemoryStore, user_id: Uuid, activity_count: i64) {
    store.set_profile(profile(user_id)).await;
    for i in 1..=activity_count {
        store.insert_activity(activity(i, &format!("Family outing {i}"))).await;
    }
}

fn recommendations(ids: &[i64]) -> String {
    let items: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "title": format!("Family outing {id}"),
                "why_it_fits": format!("matches the family's outdoor preference ({id})"),
            })
        })
        .collect();
    json!({ "recommendations": items }).to_string()
}

fn planner(
    store: &Arc<InMemoryStore>,
    llm: Arc<ScriptedLlm>,
    weather: Arc<dyn WeatherProvider>,
    config: PlannerConfig,
) -> ActivityPlanner {
    ActivityPlanner::new(
        config,
        llm,
        weather,
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    )
    .with_rng_seed(7)
}

fn week() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

#[tokio::test]
async fn test_single_batch_runs_exactly_two_rounds() {
    let store = Arc::new(InMemoryStore::new());
    let user_id = Uuid::new_v4();
    seed_store(&store, user_id, 10).await;

    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(recommendations(&[1, 3, 5, 7, 9])),
        Ok(recommendations(&[3, 5, 7, 9])),
    ]));
    let planner = planner(&store, llm.clone(), Arc::new(SunnyWeather), PlannerConfig::default());

    let picks = planner
        .plan_weekly_activities(user_id, Some(week()), Some("lazy weekend".into()))
        .await
        .unwrap();

    assert_eq!(llm.call_count().await, 2);
    assert_eq!(picks.len(), 4);
    assert_eq!(picks[0].title, "Family outing 3");
    assert!((picks[0].priority_score - 0.5).abs() < f64::EPSILON);

    // Every pick came from the candidate pool and was shortlisted
    for pick in &picks {
        assert!([3, 5, 7, 9].contains(&pick.id));
    }

    // The caller's notes and the forecast made it into the prompts
    let shortlist_prompt = llm.prompt(0).await;
    assert!(shortlist_prompt.contains("lazy weekend"));
    assert!(shortlist_prompt.contains("7 of 7 days suitable"));

    // Recorded with the weather snapshot
    let recorded = store.get_user_suggestions(user_id, 1).await.unwrap();
    assert_eq!(recorded.len(), 4);
    assert_eq!(recorded[0].weather_conditions["season"], "summer");
    assert_eq!(recorded[0].weather_conditions["suitable_for_outdoor"], true);
    assert!(recorded[0]
        .suggested_reason
        .as_deref()
        .unwrap()
        .contains("outdoor preference"));
}

#[tokio::test]
async fn test_multiple_batches_fan_out() {
    let store = Arc::new(InMemoryStore::new());
    let user_id = Uuid::new_v4();
    seed_store(&store, user_id, 12).await;

    let config = PlannerConfig {
        min_batch_size: 5,
        stretch_per_batch: 1,
        ..PlannerConfig::default()
    };
    // Two shortlist batches plus one finalist round
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(recommendations(&[1, 2, 3, 4])),
        Ok(recommendations(&[9, 10, 11, 12])),
        Ok(recommendations(&[1, 2, 9, 10, 11])),
    ]));
    let planner = planner(&store, llm.clone(), Arc::new(SunnyWeather), config);

    let picks = planner
        .plan_weekly_activities(user_id, Some(week()), None)
        .await
        .unwrap();
    assert_eq!(llm.call_count().await, 3);
    assert_eq!(picks.len(), 5);
}

#[tokio::test]
async fn test_garbage_shortlist_response_is_retried() {
    let store = Arc::new(InMemoryStore::new());
    let user_id = Uuid::new_v4();
    seed_store(&store, user_id, 8).await;

    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok("I would love to help but cannot".to_owned()),
        Ok(recommendations(&[1, 2, 3, 4])),
        Ok(recommendations(&[1, 2, 3, 4])),
    ]));
    let planner = planner(&store, llm.clone(), Arc::new(SunnyWeather), PlannerConfig::default());

    let picks = planner
        .plan_weekly_activities(user_id, Some(week()), None)
        .await
        .unwrap();
    assert_eq!(picks.len(), 4);
    assert_eq!(llm.call_count().await, 3);
}

#[tokio::test]
async fn test_finalist_exhaustion_fails_and_records_nothing() {
    let store = Arc::new(InMemoryStore::new());
    let user_id = Uuid::new_v4();
    seed_store(&store, user_id, 8).await;

    let config = PlannerConfig {
        llm_max_retries: 2,
        ..PlannerConfig::default()
    };
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(recommendations(&[1, 2, 3, 4])),
        Ok("still not json".to_owned()),
        Ok("nope".to_owned()),
    ]));
    let planner = planner(&store, llm.clone(), Arc::new(SunnyWeather), config);

    let error = planner
        .plan_weekly_activities(user_id, Some(week()), None)
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::LlmRetriesExhausted);
    assert_eq!(store.suggestion_count().await, 0);
}

#[tokio::test]
async fn test_validation_filters_bogus_finalists() {
    let store = Arc::new(InMemoryStore::new());
    let user_id = Uuid::new_v4();
    seed_store(&store, user_id, 8).await;

    let finalist = json!({
        "recommendations": [
            {"id": 2, "title": "Family outing 2", "why_it_fits": "good age fit"},
            {"id": 999, "title": "Phantom", "why_it_fits": "does not exist"},
            {"id": 4, "title": "Family outing 4", "why_it_fits": "  "},
            {"id": 6, "title": "Family outing 6", "why_it_fits": "free and nearby"},
        ]
    })
    .to_string();
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(recommendations(&[2, 4, 6])),
        Ok(finalist),
    ]));
    let planner = planner(&store, llm.clone(), Arc::new(SunnyWeather), PlannerConfig::default());

    let picks = planner
        .plan_weekly_activities(user_id, Some(week()), None)
        .await
        .unwrap();
    let ids: Vec<i64> = picks.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![2, 6]);
    assert_eq!(store.suggestion_count().await, 2);
}

#[tokio::test]
async fn test_weather_failure_is_non_fatal() {
    let store = Arc::new(InMemoryStore::new());
    let user_id = Uuid::new_v4();
    seed_store(&store, user_id, 6).await;

    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(recommendations(&[1, 2, 3, 4])),
        Ok(recommendations(&[1, 2, 3, 4])),
    ]));
    let planner = planner(&store, llm.clone(), Arc::new(BrokenWeather), PlannerConfig::default());

    let picks = planner
        .plan_weekly_activities(user_id, Some(week()), None)
        .await
        .unwrap();
    assert_eq!(picks.len(), 4);

    let prompt = llm.prompt(0).await;
    assert!(prompt.contains("No forecast available"));

    // Snapshot defaults to outdoor-suitable when there is no forecast
    let recorded = store.get_user_suggestions(user_id, 1).await.unwrap();
    assert_eq!(recorded[0].weather_conditions["suitable_for_outdoor"], true);
}

#[tokio::test]
async fn test_already_suggested_activities_are_excluded() {
    let store = Arc::new(InMemoryStore::new());
    let user_id = Uuid::new_v4();
    seed_store(&store, user_id, 6).await;

    // First run suggests 1-4 for the week
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(recommendations(&[1, 2, 3, 4])),
        Ok(recommendations(&[1, 2, 3, 4])),
    ]));
    planner(&store, llm, Arc::new(SunnyWeather), PlannerConfig::default())
        .plan_weekly_activities(user_id, Some(week()), None)
        .await
        .unwrap();

    // Second run for the same week must not see them as candidates
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(recommendations(&[5, 6])),
        Ok(recommendations(&[5, 6])),
    ]));
    let picks = planner(&store, llm.clone(), Arc::new(SunnyWeather), PlannerConfig::default())
        .plan_weekly_activities(user_id, Some(week()), None)
        .await
        .unwrap();

    let prompt = llm.prompt(0).await;
    assert!(!prompt.contains("Family outing 1\""));
    assert!(prompt.contains("Family outing 5"));
    let ids: Vec<i64> = picks.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![5, 6]);
}
