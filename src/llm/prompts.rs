// ABOUTME: System and user prompt construction for the two planning rounds
// ABOUTME: Formats profile, weekly context, and repetition guidance into prompt blocks
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Prompt Construction
//!
//! Both rounds share one system prompt carrying the priority ladder; the
//! user prompt differs only in its instruction line and candidate payload.
//! Blocks are plain text — the model sees candidates as a JSON array and
//! everything else as labelled sections.

use serde_json::json;

use crate::catalog::TagVocabulary;
use crate::intelligence::weather::summarize_forecast;
use crate::intelligence::{PastActivityContext, WeeklyContext};
use crate::models::{Activity, FamilyProfile};

/// Fewest recommendations a round may return
pub const MIN_RECOMMENDATIONS: usize = 4;
/// Most recommendations a round may return
pub const MAX_RECOMMENDATIONS: usize = 7;

/// Shared system prompt for both planning rounds
pub const SYSTEM_PROMPT: &str = "\
You are a family activity planner. You select activities for one family's \
upcoming week from a provided candidate list.

Selection priorities, highest first:
1. Family favorites: activities flagged as worth repeating.
2. Age fit: every suggested activity must suit the children's ages.
3. Variety: mix themes, costs, durations, and venues across the week.
4. Feasibility: respect budget preferences, travel limits, and available days.
5. Repetition rules: never pick activities listed as on cooldown or to avoid.
6. Seasonality: prefer activities that match the season and weather.

Only recommend activities from the candidate list, referenced by their ids. \
For each pick, explain in one or two sentences why it fits this family this \
week. Respond with JSON only.";

/// Response schema for both rounds: an object wrapping 4-7 recommendation
/// items, the shape strict structured-output backends require
#[must_use]
pub fn recommendation_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "recommendations": {
                "type": "array",
                "minItems": MIN_RECOMMENDATIONS,
                "maxItems": MAX_RECOMMENDATIONS,
                "items": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "title": { "type": "string" },
                        "why_it_fits": { "type": "string" }
                    },
                    "required": ["id", "title", "why_it_fits"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["recommendations"],
        "additionalProperties": false
    })
}

/// User prompt for a per-batch shortlist round
#[must_use]
pub fn build_shortlist_prompt(
    profile: &FamilyProfile,
    weekly: &WeeklyContext,
    past: &PastActivityContext,
    vocabulary: Option<&TagVocabulary>,
    candidates: &[Activity],
) -> String {
    build_prompt(
        profile,
        weekly,
        past,
        vocabulary,
        candidates,
        "Shortlist the 4-7 candidates from this batch that best fit the \
         family's week.",
    )
}

/// User prompt for the finalist re-ranking round
#[must_use]
pub fn build_finalist_prompt(
    profile: &FamilyProfile,
    weekly: &WeeklyContext,
    past: &PastActivityContext,
    vocabulary: Option<&TagVocabulary>,
    finalists: &[Activity],
) -> String {
    build_prompt(
        profile,
        weekly,
        past,
        vocabulary,
        finalists,
        "These candidates were shortlisted from the full catalog. Pick the \
         final 4-7 activities for the family's week, balanced across the \
         priorities.",
    )
}

fn build_prompt(
    profile: &FamilyProfile,
    weekly: &WeeklyContext,
    past: &PastActivityContext,
    vocabulary: Option<&TagVocabulary>,
    candidates: &[Activity],
    instruction: &str,
) -> String {
    let mut prompt = String::new();

    prompt.push_str("## Family\n");
    prompt.push_str(&family_block(profile));

    prompt.push_str("\n## Week\n");
    prompt.push_str(&weekly_block(weekly));

    if !past.is_empty() {
        prompt.push_str("\n## Repetition guidance\n");
        prompt.push_str(&repetition_block(past));
    }

    prompt.push_str("\n## Preferences\n");
    prompt.push_str(&preferences_block(profile, vocabulary));

    prompt.push_str("\n## Candidates\n");
    let payload: Vec<serde_json::Value> =
        candidates.iter().map(Activity::to_llm_payload).collect();
    prompt.push_str(&serde_json::Value::Array(payload).to_string());

    prompt.push_str("\n\n## Task\n");
    prompt.push_str(instruction);
    prompt
}

fn family_block(profile: &FamilyProfile) -> String {
    let kid_ages: Vec<String> = profile.kids.iter().map(|k| k.age.to_string()).collect();
    format!(
        "{} people ({} adults, {} kids aged {}). Home: {}. Max travel: {} km{}.\n",
        profile.family_size,
        profile.adults_count,
        profile.kids.len(),
        if kid_ages.is_empty() {
            "-".to_owned()
        } else {
            kid_ages.join(", ")
        },
        profile.home_location,
        profile.max_travel_distance_km,
        if profile.has_car { ", has a car" } else { ", no car" },
    )
}

fn weekly_block(weekly: &WeeklyContext) -> String {
    let mut block = format!(
        "Week of {}. Season: {}. School: {}.\nWeather: {}\n",
        weekly.target_week_start,
        weekly.season.as_str(),
        weekly.school_schedule.as_str(),
        summarize_forecast(&weekly.weather_forecast),
    );
    if let Some(notes) = &weekly.additional_notes {
        block.push_str("Notes from the family: ");
        block.push_str(notes);
        block.push('\n');
    }
    block
}

fn repetition_block(past: &PastActivityContext) -> String {
    let mut block = String::new();

    if !past.encourage_repetition.is_empty() {
        block.push_str("Worth repeating:\n");
        for info in &past.encourage_repetition {
            block.push_str(&format!(
                "- [{}] {} ({})\n",
                info.activity_id, info.title, info.reason
            ));
        }
    }
    if !past.moderate_cooldown.is_empty() {
        block.push_str("Resting, prefer alternatives:\n");
        for info in &past.moderate_cooldown {
            block.push_str(&format!(
                "- [{}] {} ({})\n",
                info.activity_id, info.title, info.reason
            ));
        }
    }
    if !past.avoid_repetition.is_empty() {
        block.push_str("Do not suggest:\n");
        for info in &past.avoid_repetition {
            block.push_str(&format!(
                "- [{}] {} ({})\n",
                info.activity_id, info.title, info.reason
            ));
        }
    }
    if !past.favorite_themes.is_empty() {
        block.push_str(&format!(
            "Favorite themes: {}\n",
            past.favorite_themes.join(", ")
        ));
    }
    if !past.preferred_durations.is_empty() {
        block.push_str(&format!(
            "Preferred durations: {}\n",
            past.preferred_durations.join(", ")
        ));
    }
    block
}

fn preferences_block(profile: &FamilyProfile, vocabulary: Option<&TagVocabulary>) -> String {
    let costs: Vec<&str> = profile
        .preferred_cost_ranges
        .iter()
        .map(|c| c.as_str())
        .collect();
    let mut block = format!(
        "Budget: {}. Available days: {}. Group comfort: {}. Openness to new \
         experiences: {}.\n",
        if costs.is_empty() {
            "any".to_owned()
        } else {
            costs.join(", ")
        },
        if profile.available_days.is_empty() {
            "any".to_owned()
        } else {
            profile.available_days.join(", ")
        },
        profile.group_activity_comfort,
        profile.new_experience_openness,
    );
    if !profile.preferred_themes.is_empty() {
        block.push_str(&format!(
            "Preferred themes: {}\n",
            profile.preferred_themes.join(", ")
        ));
    }
    if !profile.preferred_activity_types.is_empty() {
        block.push_str(&format!(
            "Preferred activity types: {}\n",
            profile.preferred_activity_types.join(", ")
        ));
    }
    if let Some(vocab) = vocabulary {
        if !vocab.themes.is_empty() {
            block.push_str(&format!(
                "Known catalog themes: {}\n",
                vocab.themes.join(", ")
            ));
        }
    }
    block
}
