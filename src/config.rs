// ABOUTME: Environment-driven configuration for the planning engine
// ABOUTME: Collects LLM, batching, and lookback knobs with sane defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine configuration
//!
//! Configuration is environment-only: every knob has a default and an
//! override variable prefixed `FAMPLAN_`. Unparsable values fall back to
//! the default with a warning rather than failing startup.

use std::env;
use tracing::warn;

/// Configuration for a planning run
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Model identifier passed to the LLM provider
    pub llm_model: String,
    /// Sampling temperature for recommendation calls
    pub llm_temperature: f32,
    /// Maximum tokens per LLM response
    pub llm_max_tokens: u32,
    /// Bounded attempts per LLM call (shortlist and finalist alike)
    pub llm_max_retries: u32,
    /// Cap on simultaneous per-batch LLM calls
    pub max_concurrent_batches: usize,
    /// Minimum candidate count per batch
    pub min_batch_size: usize,
    /// Random wildcard activities injected per batch
    pub stretch_per_batch: usize,
    /// Scaling factor for secondary-tag underrepresentation
    pub diversity_weight: f64,
    /// Weeks of suggestion history consulted by the analyzer
    pub history_lookback_weeks: u32,
    /// Weeks of suggestion history consulted by behavior analytics
    pub analytics_lookback_weeks: u32,
    /// Days of weather forecast requested for the weekly context
    pub forecast_days: u8,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            llm_model: "gpt-4o-mini".into(),
            llm_temperature: 0.7,
            llm_max_tokens: 2000,
            llm_max_retries: 3,
            max_concurrent_batches: 4,
            min_batch_size: 50,
            stretch_per_batch: 5,
            diversity_weight: 10.0,
            history_lookback_weeks: 8,
            analytics_lookback_weeks: 16,
            forecast_days: 7,
        }
    }
}

impl PlannerConfig {
    /// Build configuration from `FAMPLAN_*` environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            llm_model: env::var("FAMPLAN_LLM_MODEL").unwrap_or(defaults.llm_model),
            llm_temperature: parse_var("FAMPLAN_LLM_TEMPERATURE", defaults.llm_temperature),
            llm_max_tokens: parse_var("FAMPLAN_LLM_MAX_TOKENS", defaults.llm_max_tokens),
            llm_max_retries: parse_var("FAMPLAN_LLM_MAX_RETRIES", defaults.llm_max_retries),
            max_concurrent_batches: parse_var(
                "FAMPLAN_MAX_CONCURRENT_BATCHES",
                defaults.max_concurrent_batches,
            ),
            min_batch_size: parse_var("FAMPLAN_MIN_BATCH_SIZE", defaults.min_batch_size),
            stretch_per_batch: parse_var("FAMPLAN_STRETCH_PER_BATCH", defaults.stretch_per_batch),
            diversity_weight: parse_var("FAMPLAN_DIVERSITY_WEIGHT", defaults.diversity_weight),
            history_lookback_weeks: parse_var(
                "FAMPLAN_HISTORY_LOOKBACK_WEEKS",
                defaults.history_lookback_weeks,
            ),
            analytics_lookback_weeks: parse_var(
                "FAMPLAN_ANALYTICS_LOOKBACK_WEEKS",
                defaults.analytics_lookback_weeks,
            ),
            forecast_days: parse_var("FAMPLAN_FORECAST_DAYS", defaults.forecast_days),
        }
    }
}

/// Parse an environment variable, falling back to the default on absence
/// or parse failure
fn parse_var<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("ignoring unparsable {name}={raw}, using default");
            default
        }),
        Err(_) => default,
    }
}
