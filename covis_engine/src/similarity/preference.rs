//! Metrics over preference vectors, plus the weighting wrappers that
//! adjust an underlying metric.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

use crate::metrics::{self, DecayParams};
use crate::model::PreferenceMap;

use super::PreferenceSimilarity;

/// Jaccard coefficient over the key sets of the two vectors.
///
/// Only who interacted matters, not how strongly.
pub struct JaccardSimilarity;

impl PreferenceSimilarity for JaccardSimilarity {
    fn similarity(&self, from: &PreferenceMap, to: &PreferenceMap) -> Option<f64> {
        let from_keys: HashSet<&str> = from.keys().map(String::as_str).collect();
        let to_keys: HashSet<&str> = to.keys().map(String::as_str).collect();
        metrics::jaccard(&from_keys, &to_keys)
    }
}

/// Cosine similarity over the preference values of the two vectors.
pub struct CosineSimilarity;

impl PreferenceSimilarity for CosineSimilarity {
    fn similarity(&self, from: &PreferenceMap, to: &PreferenceMap) -> Option<f64> {
        let from_values: HashMap<&str, f64> = from
            .iter()
            .map(|(key, preference)| (key.as_str(), preference.value))
            .collect();
        let to_values: HashMap<&str, f64> = to
            .iter()
            .map(|(key, preference)| (key.as_str(), preference.value))
            .collect();
        metrics::cosine(&from_values, &to_values)
    }
}

/// Penalises similarities that rest on few shared keys.
///
/// The underlying value is scaled by `min(overlap, min_overlap) /
/// min_overlap`; an undefined similarity propagates unchanged.
pub struct SignificanceWeighting {
    inner: Box<dyn PreferenceSimilarity>,
    min_overlap: usize,
}

impl SignificanceWeighting {
    #[must_use]
    pub fn new(inner: Box<dyn PreferenceSimilarity>, min_overlap: usize) -> Self {
        assert!(min_overlap > 0, "min_overlap must be positive");
        Self { inner, min_overlap }
    }
}

impl PreferenceSimilarity for SignificanceWeighting {
    fn similarity(&self, from: &PreferenceMap, to: &PreferenceMap) -> Option<f64> {
        let similarity = self.inner.similarity(from, to)?;
        let overlap = from.keys().filter(|key| to.contains_key(*key)).count();
        #[allow(clippy::cast_precision_loss)]
        let weight = overlap.min(self.min_overlap) as f64 / self.min_overlap as f64;
        Some(similarity * weight)
    }
}

fn partition_by_age(
    preferences: &PreferenceMap,
    bounds: &[DateTime<Utc>],
) -> Vec<PreferenceMap> {
    let mut buckets = vec![PreferenceMap::new(); bounds.len()];
    for (key, preference) in preferences {
        for (bucket, bound) in buckets.iter_mut().zip(bounds) {
            if preference.recorded_at > *bound {
                bucket.insert(key.clone(), *preference);
                break;
            }
        }
    }
    buckets
}

/// Weighs down the contribution of older interactions.
///
/// Both vectors are partitioned into fixed-width age buckets; the
/// underlying metric runs per bucket pair and the defined results combine
/// with exponentially decaying weights, newest bucket first. The result is
/// normalized by the weights that were actually used, so sparse histories
/// are not diluted by empty buckets. Interactions older than
/// `interval × max_age` are dropped entirely.
pub struct TimeDecaySimilarity {
    inner: Box<dyn PreferenceSimilarity>,
    params: DecayParams,
}

impl TimeDecaySimilarity {
    /// Default decay for preference vectors: eight-week buckets, weight
    /// halving every two buckets, a horizon of twelve buckets.
    pub const DEFAULT_DECAY: DecayParams = DecayParams {
        interval_days: 56,
        half_life: 2.0,
        max_age: 12,
    };

    #[must_use]
    pub fn new(inner: Box<dyn PreferenceSimilarity>) -> Self {
        Self::with_params(inner, Self::DEFAULT_DECAY)
    }

    #[must_use]
    pub const fn with_params(inner: Box<dyn PreferenceSimilarity>, params: DecayParams) -> Self {
        Self { inner, params }
    }
}

impl PreferenceSimilarity for TimeDecaySimilarity {
    fn similarity(&self, from: &PreferenceMap, to: &PreferenceMap) -> Option<f64> {
        if from.is_empty() && to.is_empty() {
            return None;
        }

        let now = Utc::now();
        let interval = self.params.interval();
        let mut bounds = Vec::with_capacity(self.params.max_age as usize);
        let mut weights = Vec::with_capacity(self.params.max_age as usize);
        let mut cursor = now;
        for age in 0..self.params.max_age {
            cursor -= interval;
            bounds.push(cursor);
            weights.push(2_f64.powf(-f64::from(age) / self.params.half_life));
        }

        let from_buckets = partition_by_age(from, &bounds);
        let to_buckets = partition_by_age(to, &bounds);

        let mut weighted_sum = 0.0;
        let mut used_weight_sum = 0.0;
        for (bucket, weight) in weights.iter().enumerate() {
            if let Some(similarity) = self
                .inner
                .similarity(&from_buckets[bucket], &to_buckets[bucket])
            {
                weighted_sum += weight * similarity;
                used_weight_sum += weight;
            }
        }

        if used_weight_sum == 0.0 {
            return None;
        }
        Some(weighted_sum / used_weight_sum)
    }
}
