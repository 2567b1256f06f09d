//! Similarity of two query strings.

use covis_core::{RefreshCycle, Refreshable};

use crate::metrics::{jaccard, shingles};

use super::QuerySimilarity;

/// Jaccard coefficient of the two queries' character shingle sets.
pub struct ShingleJaccardSimilarity {
    k_shingles: usize,
}

impl ShingleJaccardSimilarity {
    #[must_use]
    pub const fn new(k_shingles: usize) -> Self {
        Self { k_shingles }
    }
}

impl Refreshable for ShingleJaccardSimilarity {
    /// Pure string comparison, nothing to rebuild.
    fn refresh(&self, _cycle: &mut RefreshCycle) -> anyhow::Result<()> {
        Ok(())
    }
}

impl QuerySimilarity for ShingleJaccardSimilarity {
    fn similarity(&self, from_query: &str, to_query: &str) -> Option<f64> {
        let from_shingles = shingles(from_query, self.k_shingles);
        let to_shingles = shingles(to_query, self.k_shingles);
        jaccard(&from_shingles, &to_shingles)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]

    use super::*;

    #[test]
    fn shingled_jaccard_of_close_strings() {
        let sut = ShingleJaccardSimilarity::new(3);

        assert_eq!(sut.similarity("hello", "yellow"), Some(0.4));
    }

    #[test]
    fn a_query_matches_itself() {
        let sut = ShingleJaccardSimilarity::new(3);

        assert_eq!(sut.similarity("caesar", "caesar"), Some(1.0));
    }

    #[test]
    fn short_queries_compare_as_whole_strings() {
        let sut = ShingleJaccardSimilarity::new(3);

        assert_eq!(sut.similarity("ab", "ab"), Some(1.0));
        assert_eq!(sut.similarity("ab", "cd"), Some(0.0));
    }
}
