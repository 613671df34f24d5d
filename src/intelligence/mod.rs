// ABOUTME: Behavioral-inference subsystem: repetition, completion, history, batching, weather
// ABOUTME: Shared context types passed between analyzers and the planner
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Intelligence Module
//!
//! The inference half of the engine. Everything here is deterministic given
//! its inputs (the batch builder takes a seedable RNG); the LLM only enters
//! the picture in [`crate::planner`].

pub mod batching;
pub mod behavior;
pub mod completion;
pub mod history;
pub mod repetition;
pub mod weather;

pub use batching::DiversityBatchBuilder;
pub use behavior::BehaviorAnalyticsService;
pub use completion::CompletionInferencer;
pub use history::HistoricalActivityAnalyzer;
pub use repetition::RepetitionClassifier;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::intelligence::weather::WeatherDay;

/// How well an activity tolerates being suggested again soon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepetitionTolerance {
    /// Routine staples, fine every week
    High,
    /// Fine every few weeks
    Medium,
    /// Novelty outings, monthly-ish
    Low,
    /// Special occasions, seasonal at most
    VeryLow,
}

impl RepetitionTolerance {
    /// Weeks to wait before re-suggesting an activity of this tier
    #[must_use]
    pub const fn cooldown_weeks(&self) -> u32 {
        match self {
            Self::High => 0,
            Self::Medium => 2,
            Self::Low => 4,
            Self::VeryLow => 12,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::VeryLow => "very_low",
        }
    }
}

/// Calendar season of the target week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonLabel {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl SeasonLabel {
    /// Northern-hemisphere mapping: Dec-Feb winter, Mar-May spring,
    /// Jun-Aug summer, Sep-Nov fall
    #[must_use]
    pub const fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Self::Winter,
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            _ => Self::Fall,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Winter => "winter",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Fall => "fall",
        }
    }
}

/// School-calendar phase for the target week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchoolSchedule {
    InSession,
    SummerBreak,
    WinterBreak,
}

impl SchoolSchedule {
    /// Coarse heuristic: June-August is summer break, the weeks around the
    /// new year are winter break, everything else is in session
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        match date.month() {
            6..=8 => Self::SummerBreak,
            12 | 1 if date.day() < 15 => Self::WinterBreak,
            _ => Self::InSession,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InSession => "in_session",
            Self::SummerBreak => "summer_break",
            Self::WinterBreak => "winter_break",
        }
    }
}

/// Ephemeral context describing the week being planned
#[derive(Debug, Clone)]
pub struct WeeklyContext {
    pub target_week_start: NaiveDate,
    /// Empty when the weather provider was unavailable
    pub weather_forecast: Vec<WeatherDay>,
    pub season: SeasonLabel,
    pub school_schedule: SchoolSchedule,
    pub additional_notes: Option<String>,
}

/// An activity worth suggesting again
#[derive(Debug, Clone)]
pub struct ActivityRepetitionInfo {
    pub activity_id: i64,
    pub title: String,
    pub tolerance: RepetitionTolerance,
    pub completion_rate: f64,
    pub explicit_completions: usize,
    /// 999 when the activity was never suggested
    pub weeks_since_last: u32,
    pub reason: String,
}

/// An activity inside its repetition cooldown
#[derive(Debug, Clone)]
pub struct ActivityCooldownInfo {
    pub activity_id: i64,
    pub title: String,
    pub tolerance: RepetitionTolerance,
    pub weeks_since_last: u32,
    pub cooldown_weeks: u32,
    pub weeks_until_available: u32,
    pub reason: String,
}

/// Theme and activity-type distributions over a set of suggestions
#[derive(Debug, Clone, Default)]
pub struct PatternMap {
    pub themes: HashMap<String, usize>,
    pub activity_types: HashMap<String, usize>,
}

/// Ephemeral repetition guidance assembled from suggestion history
#[derive(Debug, Clone, Default)]
pub struct PastActivityContext {
    /// Capped at 10
    pub encourage_repetition: Vec<ActivityRepetitionInfo>,
    /// Capped at 15
    pub moderate_cooldown: Vec<ActivityCooldownInfo>,
    /// Capped at 20
    pub avoid_repetition: Vec<ActivityCooldownInfo>,
    pub successful_patterns: PatternMap,
    pub avoided_patterns: PatternMap,
    /// Top 5 themes by successful-completion count
    pub favorite_themes: Vec<String>,
    /// Top 3 duration tags by success rate
    pub preferred_durations: Vec<String>,
}

impl PastActivityContext {
    /// Whether there is any guidance worth putting in the prompt
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.encourage_repetition.is_empty()
            && self.moderate_cooldown.is_empty()
            && self.avoid_repetition.is_empty()
            && self.favorite_themes.is_empty()
    }
}
