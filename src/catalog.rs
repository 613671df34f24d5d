// ABOUTME: Read-through cache over catalog tag vocabularies used in prompts
// ABOUTME: Explicitly constructed and dependency-injected, refreshable on demand
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Tag Catalog
//!
//! Theme and activity-type vocabularies live in catalog storage and grow over
//! time; the fixed tag families are compiled in. [`TagCatalog`] caches the
//! stored vocabularies behind a [`TagSource`] and hands the combined set to
//! prompt construction. Construct one per planner and share it via `Arc` —
//! there is no global instance.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::AppResult;
use crate::models::{AgeGroup, Cost, Duration, Location, Participants, Season};

/// Source of the catalog-owned tag vocabularies
#[async_trait]
pub trait TagSource: Send + Sync {
    /// All theme names known to the catalog
    async fn theme_names(&self) -> AppResult<Vec<String>>;

    /// All activity-type names known to the catalog
    async fn activity_type_names(&self) -> AppResult<Vec<String>>;
}

/// Snapshot of every tag vocabulary, compiled-in families included
#[derive(Debug, Clone, Default)]
pub struct TagVocabulary {
    pub themes: Vec<String>,
    pub activity_types: Vec<String>,
    pub costs: Vec<&'static str>,
    pub durations: Vec<&'static str>,
    pub participants: Vec<&'static str>,
    pub locations: Vec<&'static str>,
    pub seasons: Vec<&'static str>,
    pub age_groups: Vec<&'static str>,
}

/// Read-through cache over a [`TagSource`]
///
/// The first load populates the cache; later reads are lock-only. `refresh`
/// drops the snapshot so the next read reloads from the source.
pub struct TagCatalog {
    source: Arc<dyn TagSource>,
    cached: RwLock<Option<Arc<TagVocabulary>>>,
}

impl TagCatalog {
    #[must_use]
    pub fn new(source: Arc<dyn TagSource>) -> Self {
        Self {
            source,
            cached: RwLock::new(None),
        }
    }

    /// Current vocabulary snapshot, loading from the source if needed
    ///
    /// # Errors
    ///
    /// Returns an error when the initial load from the source fails.
    pub async fn vocabulary(&self) -> AppResult<Arc<TagVocabulary>> {
        if let Some(snapshot) = self.cached.read().await.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let mut slot = self.cached.write().await;
        // Another task may have loaded while we waited for the write lock
        if let Some(snapshot) = slot.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let snapshot = Arc::new(TagVocabulary {
            themes: self.source.theme_names().await?,
            activity_types: self.source.activity_type_names().await?,
            costs: vec![
                Cost::Free.as_str(),
                Cost::Low.as_str(),
                Cost::Medium.as_str(),
                Cost::High.as_str(),
            ],
            durations: vec![
                Duration::Short.as_str(),
                Duration::Medium.as_str(),
                Duration::Long.as_str(),
                Duration::HalfDay.as_str(),
                Duration::FullDay.as_str(),
                Duration::MultiDay.as_str(),
            ],
            participants: vec![
                Participants::Solo.as_str(),
                Participants::TwoPlayer.as_str(),
                Participants::SmallGroup.as_str(),
                Participants::MediumGroup.as_str(),
                Participants::LargeGroup.as_str(),
                Participants::Family.as_str(),
            ],
            locations: vec![
                Location::HomeIndoor.as_str(),
                Location::HomeOutdoor.as_str(),
                Location::Local.as_str(),
                Location::Regional.as_str(),
                Location::Travel.as_str(),
                Location::Park.as_str(),
                Location::Beach.as_str(),
                Location::Trail.as_str(),
                Location::Outdoor.as_str(),
                Location::Museum.as_str(),
                Location::Zoo.as_str(),
                Location::AmusementPark.as_str(),
                Location::IndoorEntertainment.as_str(),
            ],
            seasons: vec![
                Season::All.as_str(),
                Season::Spring.as_str(),
                Season::Summer.as_str(),
                Season::Fall.as_str(),
                Season::Winter.as_str(),
                Season::RainyDay.as_str(),
                Season::SnowyDay.as_str(),
            ],
            age_groups: vec![
                AgeGroup::Toddler.as_str(),
                AgeGroup::Child.as_str(),
                AgeGroup::Tween.as_str(),
                AgeGroup::Teen.as_str(),
                AgeGroup::Adult.as_str(),
                AgeGroup::Family.as_str(),
            ],
        });

        debug!(
            themes = snapshot.themes.len(),
            activity_types = snapshot.activity_types.len(),
            "tag catalog loaded"
        );

        *slot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Drop the cached snapshot; the next read reloads from the source
    pub async fn refresh(&self) {
        *self.cached.write().await = None;
        debug!("tag catalog cache invalidated");
    }
}

/// Fixed in-memory tag source for tests and standalone use
#[derive(Debug, Clone, Default)]
pub struct StaticTagSource {
    pub themes: Vec<String>,
    pub activity_types: Vec<String>,
}

#[async_trait]
impl TagSource for StaticTagSource {
    async fn theme_names(&self) -> AppResult<Vec<String>> {
        Ok(self.themes.clone())
    }

    async fn activity_type_names(&self) -> AppResult<Vec<String>> {
        Ok(self.activity_types.clone())
    }
}
