// ABOUTME: Domain value types for activities, suggestions, behavior analytics, and profiles
// ABOUTME: Tag enums carry serde representations and stable string accessors
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Domain Models
//!
//! Immutable value types consumed by the inference and planning modules.
//! [`Activity`] carries exactly the typed tag fields the classifiers need —
//! heuristics never reach into untyped maps. Themes and activity types stay
//! free-form strings because their vocabularies are catalog rows, surfaced
//! through [`crate::catalog::TagCatalog`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ============================================================================
// Tag Enums
// ============================================================================

/// Cost tier of an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cost {
    Free,
    Low,
    Medium,
    High,
}

impl Cost {
    /// Stable string representation for prompts and snapshots
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Time commitment of an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Duration {
    Short,
    Medium,
    Long,
    HalfDay,
    FullDay,
    MultiDay,
}

impl Duration {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
            Self::HalfDay => "half_day",
            Self::FullDay => "full_day",
            Self::MultiDay => "multi_day",
        }
    }
}

/// Expected participant grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Participants {
    Solo,
    TwoPlayer,
    SmallGroup,
    MediumGroup,
    LargeGroup,
    Family,
}

impl Participants {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Solo => "solo",
            Self::TwoPlayer => "two_player",
            Self::SmallGroup => "small_group",
            Self::MediumGroup => "medium_group",
            Self::LargeGroup => "large_group",
            Self::Family => "family",
        }
    }
}

/// Target age bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroup {
    Toddler,
    Child,
    Tween,
    Teen,
    Adult,
    Family,
}

impl AgeGroup {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Toddler => "toddler",
            Self::Child => "child",
            Self::Tween => "tween",
            Self::Teen => "teen",
            Self::Adult => "adult",
            Self::Family => "family",
        }
    }
}

/// Venue category of an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    HomeIndoor,
    HomeOutdoor,
    Local,
    Regional,
    Travel,
    Park,
    Beach,
    Trail,
    Outdoor,
    Museum,
    Zoo,
    AmusementPark,
    IndoorEntertainment,
}

impl Location {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HomeIndoor => "home_indoor",
            Self::HomeOutdoor => "home_outdoor",
            Self::Local => "local",
            Self::Regional => "regional",
            Self::Travel => "travel",
            Self::Park => "park",
            Self::Beach => "beach",
            Self::Trail => "trail",
            Self::Outdoor => "outdoor",
            Self::Museum => "museum",
            Self::Zoo => "zoo",
            Self::AmusementPark => "amusement_park",
            Self::IndoorEntertainment => "indoor_entertainment",
        }
    }
}

/// Season applicability tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    All,
    Spring,
    Summer,
    Fall,
    Winter,
    RainyDay,
    SnowyDay,
}

impl Season {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Fall => "fall",
            Self::Winter => "winter",
            Self::RainyDay => "rainy_day",
            Self::SnowyDay => "snowy_day",
        }
    }
}

/// Overall footprint of an activity (planning effort, not venue size)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityScale {
    Small,
    #[default]
    Medium,
    Large,
    ExtraLarge,
}

impl ActivityScale {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::ExtraLarge => "extra_large",
        }
    }
}

// ============================================================================
// Activity
// ============================================================================

/// A catalog activity, immutable from the engine's perspective
///
/// Owned by the catalog subsystem; the engine only reads tag fields to
/// classify, batch, and recommend.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Activity {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Theme names (catalog-owned vocabulary, e.g. "OUTDOOR", "CULTURAL")
    pub themes: Vec<String>,
    /// Activity type names (catalog-owned vocabulary)
    pub activity_types: Vec<String>,
    pub costs: Vec<Cost>,
    pub durations: Vec<Duration>,
    pub participants: Vec<Participants>,
    pub locations: Vec<Location>,
    pub seasons: Vec<Season>,
    pub age_groups: Vec<AgeGroup>,
    /// Suggested cadence tags (e.g. "weekly", "monthly")
    pub frequency: Vec<String>,
    pub activity_scale: ActivityScale,
}

impl Activity {
    /// All secondary tags as strings, used for diversity scoring
    #[must_use]
    pub fn secondary_tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        tags.extend(self.durations.iter().map(|t| t.as_str().to_owned()));
        tags.extend(self.participants.iter().map(|t| t.as_str().to_owned()));
        tags.extend(self.age_groups.iter().map(|t| t.as_str().to_owned()));
        tags.extend(self.locations.iter().map(|t| t.as_str().to_owned()));
        tags.extend(self.seasons.iter().map(|t| t.as_str().to_owned()));
        tags.extend(self.frequency.iter().cloned());
        tags.extend(self.themes.iter().cloned());
        tags.extend(self.activity_types.iter().cloned());
        tags
    }

    /// Whether the activity depends on outdoor-friendly weather
    #[must_use]
    pub fn is_weather_dependent(&self) -> bool {
        const OUTDOOR_KEYWORDS: &[&str] = &["park", "beach", "hike", "bike", "outdoor"];

        let title = self.title.to_lowercase();
        self.themes.iter().any(|t| t == "OUTDOOR")
            || self.activity_types.iter().any(|t| t == "OUTDOOR")
            || self.locations.contains(&Location::Park)
            || OUTDOOR_KEYWORDS.iter().any(|kw| title.contains(kw))
    }

    /// JSON payload handed to the LLM for this candidate
    #[must_use]
    pub fn to_llm_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "title": self.title,
            "description": self.description,
            "themes": self.themes,
            "activity_types": self.activity_types,
            "costs": self.costs,
            "durations": self.durations,
            "locations": self.locations,
            "age_groups": self.age_groups,
            "activity_scale": self.activity_scale,
        })
    }
}

// ============================================================================
// Completion Status
// ============================================================================

/// Completion state of a suggestion — explicit (user-set) or inferred
///
/// Explicit statuses are immutable once set by the user. Inferred statuses
/// are recomputed on every analysis run and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// User confirmed the activity happened
    Completed,
    /// User confirmed the activity was skipped
    ExplicitlySkipped,
    /// Strong indirect signals point to completion
    LikelyCompleted,
    /// Moderate indirect signals point to completion
    PossiblyCompleted,
    /// Outdoor activity blocked by unsuitable forecast
    WeatherPrevented,
    /// No positive mark appeared in the expected window
    LikelySkipped,
    /// Long-unmarked, presumed skipped
    AssumedSkipped,
    /// Too recent to judge
    Pending,
    /// No usable signal either way
    #[default]
    Unknown,
}

impl CompletionStatus {
    /// Stable string representation for the ledger
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::ExplicitlySkipped => "explicitly_skipped",
            Self::LikelyCompleted => "likely_completed",
            Self::PossiblyCompleted => "possibly_completed",
            Self::WeatherPrevented => "weather_prevented",
            Self::LikelySkipped => "likely_skipped",
            Self::AssumedSkipped => "assumed_skipped",
            Self::Pending => "pending",
            Self::Unknown => "unknown",
        }
    }

    /// Whether this status was set by the user (and is therefore immutable)
    #[must_use]
    pub const fn is_explicit(&self) -> bool {
        matches!(self, Self::Completed | Self::ExplicitlySkipped)
    }

    /// Whether this status counts toward success patterns
    #[must_use]
    pub const fn is_successful(&self) -> bool {
        matches!(self, Self::Completed | Self::LikelyCompleted)
    }

    /// Whether this status counts toward avoidance patterns
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(
            self,
            Self::LikelySkipped | Self::AssumedSkipped | Self::ExplicitlySkipped
        )
    }
}

// ============================================================================
// Suggestion Ledger
// ============================================================================

/// A recorded activity suggestion
///
/// Unique on `(user_id, activity_id, target_week_start)`. Created by the
/// planner after a run; mutated later only by explicit user feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySuggestion {
    pub id: i64,
    pub user_id: Uuid,
    pub activity_id: i64,
    pub suggested_date: NaiveDate,
    pub target_week_start: NaiveDate,
    pub suggested_reason: Option<String>,
    pub completion_status: CompletionStatus,
    pub completion_date: Option<NaiveDate>,
    /// 1-5 stars
    pub user_rating: Option<u8>,
    pub user_feedback: Option<String>,
    /// Forecast snapshot taken at suggestion time, consulted during inference
    pub weather_conditions: serde_json::Value,
}

impl ActivitySuggestion {
    /// Read the `suitable_for_outdoor` flag from the weather snapshot,
    /// defaulting to true when the snapshot lacks it
    #[must_use]
    pub fn weather_was_outdoor_suitable(&self) -> bool {
        self.weather_conditions
            .get("suitable_for_outdoor")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(true)
    }
}

/// New suggestion rows created in one batch after a planning run
#[derive(Debug, Clone)]
pub struct NewSuggestion {
    pub user_id: Uuid,
    pub activity_id: i64,
    pub suggested_date: NaiveDate,
    pub target_week_start: NaiveDate,
    pub suggested_reason: Option<String>,
    pub weather_conditions: serde_json::Value,
}

/// An activity already scheduled on the weekly board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekActivity {
    pub user_id: Uuid,
    pub activity_id: i64,
    pub year: i32,
    pub week: u32,
}

// ============================================================================
// Behavior Analytics
// ============================================================================

/// Aggregate marking behavior for one user, recomputed periodically
///
/// Cache-like: stale between recomputations, never updated transactionally
/// with individual suggestions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBehaviorAnalytic {
    pub user_id: Uuid,
    /// Fraction of suggestions the user explicitly marked completed
    pub marking_rate: f64,
    /// User only bothers marking big outings, small wins go unmarked
    pub marks_big_activities_only: bool,
    pub big_activity_marking_rate: f64,
    pub small_activity_marking_rate: f64,
    /// Theme name -> success rate, themes with >= 3 samples only
    pub successful_themes: HashMap<String, f64>,
    /// Activity type name -> success rate, types with >= 3 samples only
    pub successful_activity_types: HashMap<String, f64>,
    /// Cost tier -> success rate, tiers with >= 2 samples only
    pub successful_cost_ranges: HashMap<Cost, f64>,
    pub sample_size: usize,
    /// min(1.0, sample_size / 50)
    pub calculation_confidence: f64,
}

impl UserBehaviorAnalytic {
    /// Low-confidence default persisted when history is too thin (< 5 rows)
    #[must_use]
    pub fn low_confidence_default(user_id: Uuid, sample_size: usize) -> Self {
        Self {
            user_id,
            marking_rate: 0.0,
            marks_big_activities_only: true,
            big_activity_marking_rate: 0.0,
            small_activity_marking_rate: 0.0,
            successful_themes: HashMap::new(),
            successful_activity_types: HashMap::new(),
            successful_cost_ranges: HashMap::new(),
            sample_size,
            calculation_confidence: 0.1,
        }
    }
}

// ============================================================================
// Family Profile
// ============================================================================

/// A child in the family profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KidProfile {
    pub name: String,
    pub age: u8,
}

/// Assembled family profile, consumed read-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyProfile {
    pub user_id: Uuid,
    pub family_size: u8,
    pub adults_count: u8,
    pub kids: Vec<KidProfile>,
    pub home_location: String,
    pub home_coordinates: Option<(f64, f64)>,
    pub max_travel_distance_km: u32,
    pub has_car: bool,
    pub preferred_cost_ranges: Vec<Cost>,
    /// Lowercase day names, e.g. "saturday"
    pub available_days: Vec<String>,
    pub preferred_themes: Vec<String>,
    pub preferred_activity_types: Vec<String>,
    /// "low" / "medium" / "high"
    pub group_activity_comfort: String,
    /// "low" / "medium" / "high"
    pub new_experience_openness: String,
}

// ============================================================================
// Planner Output
// ============================================================================

/// One validated weekly recommendation returned to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedActivity {
    pub id: i64,
    pub title: String,
    pub why_it_fits: String,
    pub priority_score: f64,
}
