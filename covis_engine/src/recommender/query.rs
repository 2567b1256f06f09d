//! The case-based strategy: recommend search results for a query from the
//! hits this and similar past queries produced.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

use covis_core::{RecordId, RefreshCycle, Refreshable};

use crate::model::QueryDataModel;
use crate::neighbourhood::QueryNeighbourhood;
use crate::similarity::QuerySimilarity;

use super::scorer::{HitValueRow, Scorer};
use super::{QueryDetails, Recommendation};

/// Recommends records that sessions found relevant after committing the
/// same or a similar query.
pub struct QueryBasedRecommender {
    model: Arc<dyn QueryDataModel>,
    query_nhood: Arc<dyn QueryNeighbourhood>,
    query_sim: Arc<dyn QuerySimilarity>,
    scorer: Box<dyn Scorer>,
}

impl QueryBasedRecommender {
    #[must_use]
    pub fn new(
        model: Arc<dyn QueryDataModel>,
        query_nhood: Arc<dyn QueryNeighbourhood>,
        query_sim: Arc<dyn QuerySimilarity>,
        scorer: Box<dyn Scorer>,
    ) -> Self {
        Self {
            model,
            query_nhood,
            query_sim,
            scorer,
        }
    }

    /// Past queries similar to the target query.
    pub fn similar_queries(&self, query_string: &str) -> anyhow::Result<Vec<String>> {
        self.query_nhood.neighbours(query_string)
    }

    /// Ranked search result recommendations for the query.
    pub fn recommend_search_results(
        &self,
        query_string: &str,
        max_count: Option<usize>,
    ) -> anyhow::Result<Vec<Recommendation>> {
        let neighbours = self.query_nhood.neighbours(query_string)?;
        debug!(
            query = query_string,
            neighbours = neighbours.len(),
            "expanding query neighbourhood"
        );

        let mut neighbour_sims: HashMap<String, f64> = HashMap::new();
        for neighbour in &neighbours {
            if let Some(similarity) = self.query_sim.similarity(query_string, neighbour) {
                neighbour_sims.insert(neighbour.clone(), similarity);
            }
        }

        let hit_rows = self.model.hit_rows_for_queries(&neighbours)?;

        let mut candidates: BTreeSet<RecordId> = BTreeSet::new();
        let mut hit_value_rows: HashMap<String, HitValueRow> = HashMap::new();
        for (neighbour, hit_row) in &hit_rows {
            candidates.extend(hit_row.keys().cloned());
            hit_value_rows.insert(
                neighbour.clone(),
                hit_row
                    .iter()
                    .map(|(record_id, hit)| (record_id.clone(), hit.value))
                    .collect(),
            );
        }

        let mut recommendations: Vec<Recommendation> = Vec::with_capacity(candidates.len());
        for record_id in candidates {
            let score = self
                .scorer
                .score(&record_id, &hit_value_rows, &neighbour_sims);

            let mut current_query = None;
            let mut related_queries = Vec::new();
            let mut last_interaction = None;
            let mut total_hits = 0;
            for (neighbour, hit_row) in &hit_rows {
                let Some(hit) = hit_row.get(&record_id) else {
                    continue;
                };
                let details = QueryDetails {
                    query_string: neighbour.clone(),
                    decayed_hits: hit.value,
                    total_hits: hit.total_hits,
                    last_interaction: hit.last_interaction,
                };
                if neighbour == query_string {
                    current_query = Some(details);
                } else {
                    related_queries.push(details);
                }

                total_hits += hit.total_hits;
                if last_interaction.is_none_or(|last| hit.last_interaction > last) {
                    last_interaction = Some(hit.last_interaction);
                }
            }
            related_queries.sort_unstable_by(|a, b| {
                b.decayed_hits
                    .total_cmp(&a.decayed_hits)
                    .then_with(|| a.query_string.cmp(&b.query_string))
            });

            recommendations.push(Recommendation {
                record_id,
                score,
                current_query,
                related_queries,
                last_interaction,
                total_hits,
            });
        }

        recommendations.sort_unstable_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.record_id.cmp(&b.record_id))
        });
        if let Some(max_count) = max_count {
            recommendations.truncate(max_count);
        }
        Ok(recommendations)
    }
}

impl Refreshable for QueryBasedRecommender {
    fn refresh(&self, cycle: &mut RefreshCycle) -> anyhow::Result<()> {
        cycle.run(&self.model)?;
        cycle.run(&self.query_sim)?;
        cycle.run(&self.query_nhood)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use super::*;
    use crate::model::{Hit, HitRow};
    use crate::recommender::{Frequency, WeightedSumScorer};
    use chrono::{Duration, Utc};

    struct FixedQuerySimilarity {
        pairs: HashMap<(String, String), f64>,
    }

    impl Refreshable for FixedQuerySimilarity {
        fn refresh(&self, _cycle: &mut RefreshCycle) -> anyhow::Result<()> {
            Ok(())
        }
    }

    impl QuerySimilarity for FixedQuerySimilarity {
        fn similarity(&self, from_query: &str, to_query: &str) -> Option<f64> {
            self.pairs
                .get(&(from_query.to_string(), to_query.to_string()))
                .copied()
        }
    }

    struct FixedNeighbourhood {
        neighbours: Vec<String>,
    }

    impl Refreshable for FixedNeighbourhood {
        fn refresh(&self, _cycle: &mut RefreshCycle) -> anyhow::Result<()> {
            Ok(())
        }
    }

    impl QueryNeighbourhood for FixedNeighbourhood {
        fn neighbours(&self, _query_string: &str) -> anyhow::Result<Vec<String>> {
            Ok(self.neighbours.clone())
        }
    }

    struct FixedRows {
        rows: Vec<(String, HitRow)>,
    }

    impl Refreshable for FixedRows {
        fn refresh(&self, _cycle: &mut RefreshCycle) -> anyhow::Result<()> {
            Ok(())
        }
    }

    impl QueryDataModel for FixedRows {
        fn queries(&self) -> anyhow::Result<Vec<String>> {
            Ok(self.rows.iter().map(|(query, _)| query.clone()).collect())
        }

        fn hit_rows_for_queries(
            &self,
            query_strings: &[String],
        ) -> anyhow::Result<Vec<(String, HitRow)>> {
            Ok(self
                .rows
                .iter()
                .filter(|(query, _)| query_strings.contains(query))
                .cloned()
                .collect())
        }

        fn hit_rows(&self) -> anyhow::Result<Vec<(String, HitRow)>> {
            Ok(self.rows.clone())
        }
    }

    fn hit(value: f64, total_hits: u64, days_ago: i64) -> Hit {
        Hit {
            value,
            total_hits,
            last_interaction: Utc::now() - Duration::days(days_ago),
        }
    }

    fn caesar_recommender() -> QueryBasedRecommender {
        let model = FixedRows {
            rows: vec![
                (
                    "caesar".to_string(),
                    HitRow::from([
                        ("doc_a".to_string(), hit(2.0, 2, 3)),
                        ("doc_b".to_string(), hit(1.0, 1, 9)),
                    ]),
                ),
                (
                    "julius caesar".to_string(),
                    HitRow::from([("doc_a".to_string(), hit(1.0, 1, 1))]),
                ),
            ],
        };
        let neighbourhood = FixedNeighbourhood {
            neighbours: vec!["caesar".to_string(), "julius caesar".to_string()],
        };
        let similarity = FixedQuerySimilarity {
            pairs: HashMap::from([
                (("caesar".to_string(), "caesar".to_string()), 1.0),
                (("caesar".to_string(), "julius caesar".to_string()), 0.8),
            ]),
        };
        QueryBasedRecommender::new(
            Arc::new(model),
            Arc::new(neighbourhood),
            Arc::new(similarity),
            Box::new(WeightedSumScorer::new(Box::new(Frequency))),
        )
    }

    #[test]
    fn scores_accumulate_across_similar_queries() {
        let sut = caesar_recommender();

        let recommendations = sut.recommend_search_results("caesar", None).unwrap();

        assert_eq!(recommendations.len(), 2);
        assert_eq!(recommendations[0].record_id, "doc_a");
        assert!((recommendations[0].score - 2.8).abs() < 1e-12);
        assert_eq!(recommendations[1].record_id, "doc_b");
        assert!((recommendations[1].score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn recommendations_carry_their_evidence() {
        let sut = caesar_recommender();

        let recommendations = sut.recommend_search_results("caesar", None).unwrap();
        let doc_a = &recommendations[0];

        let current = doc_a.current_query.as_ref().unwrap();
        assert_eq!(current.query_string, "caesar");
        assert_eq!(current.total_hits, 2);

        assert_eq!(doc_a.related_queries.len(), 1);
        assert_eq!(doc_a.related_queries[0].query_string, "julius caesar");

        assert_eq!(doc_a.total_hits, 3);
        // The most recent interaction came through "julius caesar".
        assert_eq!(
            doc_a.last_interaction,
            Some(doc_a.related_queries[0].last_interaction)
        );
    }

    #[test]
    fn truncation_keeps_the_best_scored(){
        let sut = caesar_recommender();

        let recommendations = sut.recommend_search_results("caesar", Some(1)).unwrap();
        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].record_id, "doc_a");
    }

    #[test]
    fn unseen_query_with_no_neighbours_recommends_nothing() {
        let sut = QueryBasedRecommender::new(
            Arc::new(FixedRows { rows: Vec::new() }),
            Arc::new(FixedNeighbourhood {
                neighbours: Vec::new(),
            }),
            Arc::new(FixedQuerySimilarity {
                pairs: HashMap::new(),
            }),
            Box::new(WeightedSumScorer::new(Box::new(Frequency))),
        );

        assert!(sut.recommend_search_results("caesar", None).unwrap().is_empty());
        assert!(sut.similar_queries("caesar").unwrap().is_empty());
    }
}
