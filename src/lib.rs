// ABOUTME: Crate root for the famplan activity recommendation engine
// ABOUTME: Wires domain models, behavioral inference, diversity batching, and LLM orchestration
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # famplan
//!
//! Activity recommendation and behavioral-inference engine for a family
//! weekly-planning backend. Given a family profile, a target week, and a
//! catalog of candidate activities, the engine:
//!
//! 1. Infers whether past suggestions were actually completed when no
//!    explicit signal exists ([`intelligence::CompletionInferencer`]).
//! 2. Classifies how tolerant each activity is to repetition
//!    ([`intelligence::RepetitionClassifier`]).
//! 3. Partitions the candidate pool into diverse, LLM-context-sized batches
//!    ([`intelligence::DiversityBatchBuilder`]).
//! 4. Runs a two-round LLM pipeline — concurrent per-batch shortlists, then
//!    a finalist re-ranking call — validates the output, and records the
//!    suggestions in the ledger ([`planner::ActivityPlanner`]).
//!
//! Persistence, HTTP routing, and authentication are external collaborators;
//! this crate consumes them through the traits in [`database`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use famplan::config::PlannerConfig;
//! use famplan::database::in_memory::InMemoryStore;
//! use famplan::llm::OpenAiCompatibleProvider;
//! use famplan::intelligence::weather::OpenMeteoWeatherService;
//! use famplan::planner::ActivityPlanner;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), famplan::errors::AppError> {
//!     let config = PlannerConfig::from_env();
//!     let store = Arc::new(InMemoryStore::new());
//!     let planner = ActivityPlanner::new(
//!         config,
//!         Arc::new(OpenAiCompatibleProvider::from_env()?),
//!         Arc::new(OpenMeteoWeatherService::new(7)),
//!         store.clone(),
//!         store.clone(),
//!         store.clone(),
//!         store.clone(),
//!         store,
//!     );
//!     let user_id = uuid::Uuid::new_v4();
//!     let picks = planner.plan_weekly_activities(user_id, None, None).await?;
//!     for pick in picks {
//!         println!("{}: {}", pick.title, pick.why_it_fits);
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod database;
pub mod errors;
pub mod intelligence;
pub mod llm;
pub mod logging;
pub mod models;
pub mod planner;

pub use errors::{AppError, AppResult};
pub use models::{Activity, ActivitySuggestion, CompletionStatus, RecommendedActivity};
pub use planner::ActivityPlanner;
