//! Scoring of candidate records in the case-based strategy.

use std::collections::HashMap;

use covis_core::RecordId;

/// The decayed hit values of one query, keyed by record.
pub type HitValueRow = HashMap<RecordId, f64>;

/// Turns a record's hits under one query into a raw score.
pub trait ScoreFunction: Send + Sync {
    fn apply(&self, record_id: &str, hit_values: &HitValueRow) -> f64;
}

/// The plain number of hits.
pub struct Frequency;

impl ScoreFunction for Frequency {
    fn apply(&self, record_id: &str, hit_values: &HitValueRow) -> f64 {
        hit_values.get(record_id).copied().unwrap_or(0.0)
    }
}

/// The record's share of all hits the query produced.
pub struct Relevance;

impl ScoreFunction for Relevance {
    fn apply(&self, record_id: &str, hit_values: &HitValueRow) -> f64 {
        let Some(hits) = hit_values.get(record_id) else {
            return 0.0;
        };
        let total: f64 = hit_values.values().sum();
        if total == 0.0 {
            return 0.0;
        }
        hits / total
    }
}

/// A smoothed popularity: `log_base(1 + scale · hits)`.
pub struct LogFrequency {
    base: f64,
    scale: f64,
}

impl LogFrequency {
    #[must_use]
    pub const fn new(base: f64) -> Self {
        Self { base, scale: 1.0 }
    }

    #[must_use]
    pub const fn with_scale(base: f64, scale: f64) -> Self {
        Self { base, scale }
    }
}

impl ScoreFunction for LogFrequency {
    fn apply(&self, record_id: &str, hit_values: &HitValueRow) -> f64 {
        let Some(hits) = hit_values.get(record_id) else {
            return 0.0;
        };
        let weight = self.scale.mul_add(*hits, 1.0);
        if weight > 0.0 {
            weight.log(self.base)
        } else {
            0.0
        }
    }
}

/// Combines a record's hits across all neighbour queries into one score.
pub trait Scorer: Send + Sync {
    /// `hit_value_rows` maps each neighbour query to its hit values;
    /// `query_sims` holds the similarity of each neighbour to the target
    /// query. Rows without a similarity contribute nothing.
    fn score(
        &self,
        record_id: &str,
        hit_value_rows: &HashMap<String, HitValueRow>,
        query_sims: &HashMap<String, f64>,
    ) -> f64;
}

/// Sums the per-query scores, each weighted by its query similarity.
pub struct WeightedSumScorer {
    function: Box<dyn ScoreFunction>,
}

impl WeightedSumScorer {
    #[must_use]
    pub fn new(function: Box<dyn ScoreFunction>) -> Self {
        Self { function }
    }
}

impl Scorer for WeightedSumScorer {
    fn score(
        &self,
        record_id: &str,
        hit_value_rows: &HashMap<String, HitValueRow>,
        query_sims: &HashMap<String, f64>,
    ) -> f64 {
        let mut total_score = 0.0;
        for (query_string, hit_values) in hit_value_rows {
            if !hit_values.contains_key(record_id) {
                continue;
            }
            let Some(similarity) = query_sims.get(query_string) else {
                continue;
            };
            total_score += similarity * self.function.apply(record_id, hit_values);
        }
        total_score
    }
}

/// The similarity-weighted average of the per-query scores.
///
/// Zero when no contributing query carries similarity weight.
pub struct WeightedAverageScorer {
    function: Box<dyn ScoreFunction>,
}

impl WeightedAverageScorer {
    #[must_use]
    pub fn new(function: Box<dyn ScoreFunction>) -> Self {
        Self { function }
    }
}

impl Scorer for WeightedAverageScorer {
    fn score(
        &self,
        record_id: &str,
        hit_value_rows: &HashMap<String, HitValueRow>,
        query_sims: &HashMap<String, f64>,
    ) -> f64 {
        let mut total_score = 0.0;
        let mut total_sim = 0.0;
        for (query_string, hit_values) in hit_value_rows {
            if !hit_values.contains_key(record_id) {
                continue;
            }
            let Some(similarity) = query_sims.get(query_string) else {
                continue;
            };
            total_score += similarity * self.function.apply(record_id, hit_values);
            total_sim += similarity;
        }
        if total_sim == 0.0 {
            return 0.0;
        }
        total_score / total_sim
    }
}
