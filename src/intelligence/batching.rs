// ABOUTME: Partitions the candidate pool into diverse LLM-context-sized batches
// ABOUTME: Probabilistic tag-balanced filling with optional wildcard injection
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Diversity Batching
//!
//! A shortlist call can only see one batch, so each batch should look like a
//! miniature of the whole catalog rather than fifty variations on "go to the
//! park". The controlled mode buckets candidates by cost and scale, then
//! fills each batch with an acceptance-sampling pass that favors activities
//! whose secondary tags are still underrepresented in the batch.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::debug;

use crate::models::{Activity, ActivityScale, Cost};

/// Attempt multiplier guarding the acceptance-sampling loop
const FILL_ATTEMPT_FACTOR: usize = 50;

/// Batch builder configuration and algorithm
#[derive(Debug, Clone)]
pub struct DiversityBatchBuilder {
    min_batch_size: usize,
    stretch_per_batch: usize,
    diversity_weight: f64,
    /// When false, batches are plain shuffled slices
    diversity_controlled: bool,
}

impl DiversityBatchBuilder {
    #[must_use]
    pub fn new(min_batch_size: usize, stretch_per_batch: usize, diversity_weight: f64) -> Self {
        Self {
            min_batch_size: min_batch_size.max(1),
            stretch_per_batch,
            diversity_weight: diversity_weight.max(1.0),
            diversity_controlled: true,
        }
    }

    /// Disable tag balancing; batches become shuffled slices
    #[must_use]
    pub const fn without_diversity_control(mut self) -> Self {
        self.diversity_controlled = false;
        self
    }

    /// Split the candidate pool into batches, no candidate appearing twice
    pub fn build_batches<R: Rng>(
        &self,
        mut candidates: Vec<Activity>,
        rng: &mut R,
    ) -> Vec<Vec<Activity>> {
        if candidates.len() <= self.min_batch_size {
            return vec![candidates];
        }

        let sizes = self.batch_sizes(candidates.len());
        debug!(
            candidates = candidates.len(),
            batches = sizes.len(),
            controlled = self.diversity_controlled,
            "building batches"
        );

        if !self.diversity_controlled {
            candidates.shuffle(rng);
            let mut batches = Vec::with_capacity(sizes.len());
            let mut rest = candidates;
            for size in sizes {
                let tail = rest.split_off(size.min(rest.len()));
                batches.push(rest);
                rest = tail;
            }
            return batches;
        }

        self.build_controlled(candidates, &sizes, rng)
    }

    /// Batch sizes for a pool of `n` candidates: `n / min_batch_size`
    /// batches of the minimum size, remainder spread one per batch cycling
    /// round-robin so the total is preserved
    fn batch_sizes(&self, n: usize) -> Vec<usize> {
        let num_batches = (n / self.min_batch_size).max(1);
        let mut sizes = vec![self.min_batch_size; num_batches];
        let remainder = n - self.min_batch_size * num_batches;
        for i in 0..remainder {
            sizes[i % num_batches] += 1;
        }
        sizes
    }

    fn build_controlled<R: Rng>(
        &self,
        candidates: Vec<Activity>,
        sizes: &[usize],
        rng: &mut R,
    ) -> Vec<Vec<Activity>> {
        // Bucket by (primary cost, scale) so each combination stays reachable.
        // Ordered map: bucket iteration order must not depend on hasher state
        // or a seeded RNG stops being reproducible.
        let mut buckets: BTreeMap<(Cost, ActivityScale), VecDeque<Activity>> = BTreeMap::new();
        for activity in candidates {
            let cost = activity.costs.first().copied().unwrap_or(Cost::Low);
            buckets
                .entry((cost, activity.activity_scale))
                .or_default()
                .push_back(activity);
        }
        for bucket in buckets.values_mut() {
            bucket.make_contiguous().shuffle(rng);
        }

        let mut batches = Vec::with_capacity(sizes.len());
        for &size in sizes {
            let mut batch: Vec<Activity> = Vec::with_capacity(size + self.stretch_per_batch);
            let mut seen: HashMap<String, usize> = HashMap::new();
            let mut attempts = 0;
            let max_attempts = size * FILL_ATTEMPT_FACTOR;

            while batch.len() < size && attempts < max_attempts {
                attempts += 1;
                let Some(candidate) = pop_random(&mut buckets, rng) else {
                    break;
                };

                let score = diversity_score(&candidate, &seen);
                let accept = (score / self.diversity_weight).min(1.0);
                if rng.gen::<f64>() < accept {
                    for tag in candidate.secondary_tags() {
                        *seen.entry(tag).or_default() += 1;
                    }
                    batch.push(candidate);
                } else {
                    // Requeue at the front of its bucket for a later draw
                    let cost = candidate.costs.first().copied().unwrap_or(Cost::Low);
                    buckets
                        .entry((cost, candidate.activity_scale))
                        .or_default()
                        .push_front(candidate);
                }
            }

            // Wildcards keep some unscored randomness in every batch
            for _ in 0..self.stretch_per_batch {
                match pop_random(&mut buckets, rng) {
                    Some(wildcard) => batch.push(wildcard),
                    None => break,
                }
            }

            batches.push(batch);
        }
        batches
    }
}

/// Pop a random candidate from a random non-empty bucket
fn pop_random<R: Rng>(
    buckets: &mut BTreeMap<(Cost, ActivityScale), VecDeque<Activity>>,
    rng: &mut R,
) -> Option<Activity> {
    let keys: Vec<(Cost, ActivityScale)> = buckets
        .iter()
        .filter(|(_, bucket)| !bucket.is_empty())
        .map(|(key, _)| *key)
        .collect();
    let key = keys.choose(rng)?;
    let bucket = buckets.get_mut(key)?;
    let index = rng.gen_range(0..bucket.len());
    bucket.remove(index)
}

/// 1 plus one unit per secondary tag, discounted by how often the tag is
/// already present in the batch
fn diversity_score(activity: &Activity, seen: &HashMap<String, usize>) -> f64 {
    1.0 + activity
        .secondary_tags()
        .iter()
        .map(|tag| 1.0 / (1.0 + seen.get(tag).copied().unwrap_or(0) as f64))
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Duration;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn pool(n: i64) -> Vec<Activity> {
        (0..n)
            .map(|i| Activity {
                id: i,
                title: format!("Activity {i}"),
                costs: vec![if i % 2 == 0 { Cost::Free } else { Cost::High }],
                durations: vec![if i % 3 == 0 {
                    Duration::Short
                } else {
                    Duration::FullDay
                }],
                themes: vec![format!("THEME_{}", i % 5)],
                activity_scale: if i % 4 == 0 {
                    crate::models::ActivityScale::Large
                } else {
                    crate::models::ActivityScale::Medium
                },
                ..Activity::default()
            })
            .collect()
    }

    #[test]
    fn test_small_pool_single_batch() {
        let builder = DiversityBatchBuilder::new(50, 5, 10.0);
        let mut rng = StdRng::seed_from_u64(7);
        let batches = builder.build_batches(pool(30), &mut rng);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 30);
    }

    #[test]
    fn test_remainder_spreads_round_robin() {
        let builder = DiversityBatchBuilder::new(50, 5, 10.0);
        // 130 candidates, two batches of 50 plus 30 spread one at a time
        assert_eq!(builder.batch_sizes(130), vec![65, 65]);
        assert_eq!(builder.batch_sizes(103), vec![52, 51]);
        assert_eq!(builder.batch_sizes(100), vec![50, 50]);
    }

    #[test]
    fn test_no_duplicates_across_batches() {
        let builder = DiversityBatchBuilder::new(20, 3, 10.0);
        let mut rng = StdRng::seed_from_u64(42);
        let batches = builder.build_batches(pool(90), &mut rng);

        let mut ids = HashSet::new();
        for batch in &batches {
            for activity in batch {
                assert!(ids.insert(activity.id), "duplicate id {}", activity.id);
            }
        }
        assert!(ids.len() <= 90);
    }

    #[test]
    fn test_uncontrolled_slices_preserve_total() {
        let builder = DiversityBatchBuilder::new(20, 3, 10.0).without_diversity_control();
        let mut rng = StdRng::seed_from_u64(3);
        let batches = builder.build_batches(pool(90), &mut rng);
        assert_eq!(batches.len(), 4);
        assert_eq!(batches.iter().map(Vec::len).sum::<usize>(), 90);
    }

    #[test]
    fn test_seeded_runs_are_deterministic() {
        let builder = DiversityBatchBuilder::new(20, 3, 10.0);
        let first = builder.build_batches(pool(60), &mut StdRng::seed_from_u64(11));
        let second = builder.build_batches(pool(60), &mut StdRng::seed_from_u64(11));
        let ids = |batches: &[Vec<Activity>]| {
            batches
                .iter()
                .map(|b| b.iter().map(|a| a.id).collect::<Vec<_>>())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_diversity_score_discounts_repeats() {
        let activity = pool(1).remove(0);
        let empty = HashMap::new();
        let fresh = diversity_score(&activity, &empty);

        let mut seen = HashMap::new();
        for tag in activity.secondary_tags() {
            seen.insert(tag, 4);
        }
        let stale = diversity_score(&activity, &seen);
        assert!(fresh > stale);
        assert!(stale >= 1.0);
    }
}
