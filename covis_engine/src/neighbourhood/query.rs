//! Query neighbourhoods.

use std::sync::Arc;

use covis_core::{RefreshCycle, Refreshable};

use crate::model::QueryDataModel;
use crate::similarity::QuerySimilarity;

use super::QueryNeighbourhood;

/// Every past query whose similarity to the target reaches a threshold.
///
/// There is no size cap: a query either is related enough or it is not.
/// The target query itself is part of its own neighbourhood whenever it
/// was committed before, since it matches itself with similarity 1.
pub struct ThresholdQueryNeighbourhood {
    model: Arc<dyn QueryDataModel>,
    query_sim: Arc<dyn QuerySimilarity>,
    sim_threshold: f64,
}

impl ThresholdQueryNeighbourhood {
    #[must_use]
    pub fn new(
        model: Arc<dyn QueryDataModel>,
        query_sim: Arc<dyn QuerySimilarity>,
        sim_threshold: f64,
    ) -> Self {
        Self {
            model,
            query_sim,
            sim_threshold,
        }
    }
}

impl Refreshable for ThresholdQueryNeighbourhood {
    fn refresh(&self, cycle: &mut RefreshCycle) -> anyhow::Result<()> {
        cycle.run(&self.model)?;
        cycle.run(&self.query_sim)
    }
}

impl QueryNeighbourhood for ThresholdQueryNeighbourhood {
    fn neighbours(&self, query_string: &str) -> anyhow::Result<Vec<String>> {
        let mut related: Vec<(String, f64)> = Vec::new();
        for other_query in self.model.queries()? {
            let Some(similarity) = self.query_sim.similarity(query_string, &other_query) else {
                continue;
            };
            if similarity >= self.sim_threshold {
                related.push((other_query, similarity));
            }
        }

        related.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(related.into_iter().map(|(query, _)| query).collect())
    }
}
