//! Bounded top-K storage for imported record similarities.

use std::collections::{BTreeSet, HashMap};

use covis_core::RecordId;

/// An `f64` similarity with a total order, usable as a `BTreeSet` key.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SimValue(f64);

impl Eq for SimValue {}

impl PartialOrd for SimValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// The outgoing similarities of one source record.
///
/// Keeps at most `cap` entries, always the highest-valued ones. This is a
/// priority-eviction set ordered by value, not an LRU: at capacity a new
/// value only enters by displacing the current minimum, and only when it is
/// strictly larger.
#[derive(Debug)]
pub(crate) struct BoundedSimilarityRow {
    cap: usize,
    by_target: HashMap<RecordId, f64>,
    ordered: BTreeSet<(SimValue, RecordId)>,
}

impl BoundedSimilarityRow {
    pub(crate) fn new(cap: usize) -> Self {
        assert!(cap > 0, "similarity cap must be positive");
        Self {
            cap,
            by_target: HashMap::new(),
            ordered: BTreeSet::new(),
        }
    }

    /// Inserts or updates the similarity towards `to_record`.
    ///
    /// An existing pair is updated in place regardless of the new value.
    /// Returns whether the value was stored.
    pub(crate) fn insert(&mut self, to_record: &RecordId, value: f64) -> bool {
        if let Some(old) = self.by_target.get(to_record).copied() {
            self.ordered.remove(&(SimValue(old), to_record.clone()));
            self.ordered.insert((SimValue(value), to_record.clone()));
            self.by_target.insert(to_record.clone(), value);
            return true;
        }

        if self.by_target.len() < self.cap {
            self.ordered.insert((SimValue(value), to_record.clone()));
            self.by_target.insert(to_record.clone(), value);
            return true;
        }

        let Some((SimValue(min_value), min_record)) = self.ordered.first().cloned() else {
            return false;
        };
        if min_value >= value {
            return false;
        }
        self.ordered.remove(&(SimValue(min_value), min_record.clone()));
        self.by_target.remove(&min_record);
        self.ordered.insert((SimValue(value), to_record.clone()));
        self.by_target.insert(to_record.clone(), value);
        true
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&RecordId, f64)> {
        self.by_target.iter().map(|(record, value)| (record, *value))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]

    use super::*;

    fn row_with(cap: usize, entries: &[(&str, f64)]) -> BoundedSimilarityRow {
        let mut row = BoundedSimilarityRow::new(cap);
        for (record, value) in entries {
            row.insert(&(*record).to_string(), *value);
        }
        row
    }

    fn sorted_entries(row: &BoundedSimilarityRow) -> Vec<(String, f64)> {
        let mut entries: Vec<_> = row
            .iter()
            .map(|(record, value)| (record.clone(), value))
            .collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        entries
    }

    #[test]
    fn keeps_the_highest_values_at_capacity() {
        let row = row_with(3, &[("a", 0.1), ("b", 0.5), ("c", 0.3), ("d", 0.4)]);

        let entries = sorted_entries(&row);
        assert_eq!(
            entries,
            vec![
                ("b".to_string(), 0.5),
                ("d".to_string(), 0.4),
                ("c".to_string(), 0.3),
            ]
        );
    }

    #[test]
    fn rejects_a_value_not_above_the_minimum() {
        let mut row = row_with(2, &[("a", 0.4), ("b", 0.6)]);

        assert!(!row.insert(&"c".to_string(), 0.3));
        assert!(!row.insert(&"d".to_string(), 0.4));

        let entries = sorted_entries(&row);
        assert_eq!(
            entries,
            vec![("b".to_string(), 0.6), ("a".to_string(), 0.4)]
        );
    }

    #[test]
    fn existing_pair_is_updated_in_place() {
        let mut row = row_with(2, &[("a", 0.4), ("b", 0.6)]);

        assert!(row.insert(&"a".to_string(), 0.1));

        let entries = sorted_entries(&row);
        assert_eq!(
            entries,
            vec![("b".to_string(), 0.6), ("a".to_string(), 0.1)]
        );
    }
}
