//! Pure similarity and decay math.
//!
//! Similarities are `Option<f64>` in `[0, 1]`: `None` means the value is
//! undefined because neither input carries any signal. Consumers filter
//! undefined values before ranking; they are never an error.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Jaccard coefficient of two sets: `|A ∩ B| / |A ∪ B|`.
///
/// Two empty sets have no signal and yield `None`; one empty set yields 0.
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> Option<f64> {
    if a.is_empty() && b.is_empty() {
        return None;
    }
    if a.is_empty() || b.is_empty() {
        return Some(0.0);
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    #[allow(clippy::cast_precision_loss)]
    let coefficient = intersection as f64 / union as f64;
    Some(coefficient)
}

/// Contiguous character k-grams of a string.
///
/// A string shorter than `k` is its own single shingle, so very short
/// queries still compare against each other.
#[must_use]
pub fn shingles(text: &str, k: usize) -> HashSet<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < k {
        let mut single = HashSet::new();
        single.insert(text.to_string());
        return single;
    }
    chars
        .windows(k)
        .map(|window| window.iter().collect())
        .collect()
}

/// Cosine similarity of two sparse vectors.
///
/// Two empty vectors yield `None`; one empty vector yields 0. A zero dot
/// product is reported as 0 outright, which also covers vectors whose
/// values are all zero without running into a division by a zero norm.
pub fn cosine<K: Eq + Hash>(a: &HashMap<K, f64>, b: &HashMap<K, f64>) -> Option<f64> {
    if a.is_empty() && b.is_empty() {
        return None;
    }
    if a.is_empty() || b.is_empty() {
        return Some(0.0);
    }

    let dot: f64 = a
        .iter()
        .filter_map(|(key, a_value)| b.get(key).map(|b_value| a_value * b_value))
        .sum();
    if dot == 0.0 {
        return Some(0.0);
    }

    let norm_a = a.values().map(|value| value * value).sum::<f64>().sqrt();
    let norm_b = b.values().map(|value| value * value).sum::<f64>().sqrt();
    Some(dot / (norm_a * norm_b))
}

/// Parameters of the exponential time decay applied to aging contributions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayParams {
    /// Width of one age bucket.
    pub interval_days: i64,
    /// Number of intervals after which a weight halves.
    pub half_life: f64,
    /// Maximum age in intervals; anything older contributes zero.
    pub max_age: u32,
}

impl DecayParams {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::days(self.interval_days.max(1))
    }

    /// The point back in time beyond which contributions are zero.
    ///
    /// Safe to push down into a store query as a `max_age` bound.
    #[must_use]
    pub fn horizon(&self) -> Duration {
        self.interval() * (i32::try_from(self.max_age).unwrap_or(i32::MAX).saturating_add(1))
    }
}

/// Exponentially decays `value` by the age of its contribution.
///
/// Age is measured in whole intervals between `at` and `now`; future
/// timestamps pass through undecayed. Contributions older than `max_age`
/// intervals are dropped to exactly zero.
#[must_use]
pub fn exp_decay(value: f64, now: DateTime<Utc>, at: DateTime<Utc>, params: &DecayParams) -> f64 {
    if at > now {
        return value;
    }
    let age = (now - at).num_seconds() / params.interval().num_seconds();
    if age > i64::from(params.max_age) {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let age = age as f64;
    value * 2_f64.powf(-age / params.half_life)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use super::*;

    fn set_of(items: &[&str]) -> HashSet<String> {
        items.iter().map(ToString::to_string).collect()
    }

    fn vector_of(items: &[(&str, f64)]) -> HashMap<String, f64> {
        items
            .iter()
            .map(|(key, value)| ((*key).to_string(), *value))
            .collect()
    }

    #[test]
    fn jaccard_of_overlapping_sets() {
        let a: HashSet<i32> = [1, 2, 3, 4].into_iter().collect();
        let b: HashSet<i32> = [1, 4, 5].into_iter().collect();

        assert_eq!(jaccard(&a, &b), Some(0.4));
    }

    #[test]
    fn jaccard_of_identical_sets_is_one() {
        let a = set_of(&["x", "y"]);

        assert_eq!(jaccard(&a, &a), Some(1.0));
    }

    #[test]
    fn jaccard_with_one_empty_set_is_zero() {
        let a = set_of(&["x", "y"]);
        let empty = HashSet::new();

        assert_eq!(jaccard(&a, &empty), Some(0.0));
    }

    #[test]
    fn jaccard_of_empty_sets_is_undefined() {
        let empty: HashSet<String> = HashSet::new();

        assert_eq!(jaccard(&empty, &empty), None);
    }

    #[test]
    fn shingles_of_a_long_string() {
        let expected = set_of(&["123", "234", "345", "456", "567"]);

        assert_eq!(shingles("1234567", 3), expected);
    }

    #[test]
    fn short_string_is_its_own_shingle() {
        assert_eq!(shingles("12", 3), set_of(&["12"]));
    }

    #[test]
    fn cosine_matches_the_hand_computed_value() {
        let a = vector_of(&[("hello", 1.0), ("world", 2.0)]);
        let b = vector_of(&[("world", 3.0), ("is", 4.0), ("hello", 1.0)]);

        let similarity = cosine(&a, &b).unwrap();
        assert!((similarity - 0.6139).abs() < 0.0001);
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let a = vector_of(&[("hello", 1.0), ("world", 2.0)]);

        let similarity = cosine(&a, &a).unwrap();
        assert!((similarity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cosine_with_one_empty_vector_is_zero() {
        let a = vector_of(&[("hello", 1.0)]);
        let empty = HashMap::new();

        assert_eq!(cosine(&a, &empty), Some(0.0));
    }

    #[test]
    fn cosine_of_empty_vectors_is_undefined() {
        let empty: HashMap<String, f64> = HashMap::new();

        assert_eq!(cosine(&empty, &empty), None);
    }

    #[test]
    fn cosine_with_zero_dot_product_is_zero() {
        let a = vector_of(&[("hello", 1.0)]);
        let b = vector_of(&[("world", 1.0)]);

        assert_eq!(cosine(&a, &b), Some(0.0));
    }

    #[test]
    fn decay_halves_after_the_half_life() {
        let params = DecayParams {
            interval_days: 1,
            half_life: 2.0,
            max_age: 10,
        };
        let now = Utc::now();

        let decayed = exp_decay(1.0, now, now - Duration::days(2), &params);
        assert!((decayed - 0.5).abs() < 1e-12);
    }

    #[test]
    fn decay_beyond_max_age_is_exactly_zero() {
        let params = DecayParams {
            interval_days: 1,
            half_life: 2.0,
            max_age: 3,
        };
        let now = Utc::now();

        assert_eq!(exp_decay(1.0, now, now - Duration::days(4), &params), 0.0);
    }

    #[test]
    fn future_contributions_pass_through() {
        let params = DecayParams {
            interval_days: 1,
            half_life: 2.0,
            max_age: 3,
        };
        let now = Utc::now();

        assert_eq!(exp_decay(1.5, now, now + Duration::days(1), &params), 1.5);
    }
}
