//! The item-based strategy: recommend records from a session's history.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use covis_core::{RecordId, RefreshCycle, Refreshable};

use crate::model::RecordDataModel;
use crate::neighbourhood::RecordNeighbourhood;

use super::ScoredRecord;

fn ranked(candidates: HashMap<RecordId, f64>, max_count: Option<usize>) -> Vec<ScoredRecord> {
    let mut scored: Vec<ScoredRecord> = candidates
        .into_iter()
        .map(|(record_id, score)| ScoredRecord { record_id, score })
        .collect();
    scored.sort_unstable_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.record_id.cmp(&b.record_id))
    });
    if let Some(max_count) = max_count {
        scored.truncate(max_count);
    }
    scored
}

/// Recommends records that similar usage put next to what a session
/// already preferred.
pub struct RecordBasedRecommender {
    model: Arc<dyn RecordDataModel>,
    record_nhood: Arc<dyn RecordNeighbourhood>,
}

impl RecordBasedRecommender {
    /// The data model should be the persistent variant: a session's own
    /// history must be current at request time, not as old as the last
    /// refresh.
    #[must_use]
    pub fn new(model: Arc<dyn RecordDataModel>, record_nhood: Arc<dyn RecordNeighbourhood>) -> Self {
        Self {
            model,
            record_nhood,
        }
    }

    /// Records recommended from the session's history.
    ///
    /// Every preferred record votes for its neighbours with its
    /// similarity; records the session already preferred are skipped as
    /// candidates. An unknown session simply has nothing to expand.
    pub fn recommend_from_history(
        &self,
        session_id: &str,
        max_count: Option<usize>,
    ) -> anyhow::Result<Vec<ScoredRecord>> {
        let preferences = self.model.preferences_of_session(session_id)?;
        debug!(
            session_id,
            preferred = preferences.len(),
            "expanding session history"
        );

        let mut candidates: HashMap<RecordId, f64> = HashMap::new();
        for preferred_record in preferences.keys() {
            for (neighbour, similarity) in self.record_nhood.neighbours(preferred_record)? {
                if preferences.contains_key(&neighbour) {
                    continue;
                }
                *candidates.entry(neighbour).or_insert(0.0) += similarity;
            }
        }

        Ok(ranked(candidates, max_count))
    }

    /// The records most similar to the given one.
    pub fn most_similar_records(
        &self,
        record_id: &str,
        max_count: Option<usize>,
    ) -> anyhow::Result<Vec<ScoredRecord>> {
        let mut neighbours: Vec<ScoredRecord> = self
            .record_nhood
            .neighbours(record_id)?
            .into_iter()
            .map(|(record_id, score)| ScoredRecord { record_id, score })
            .collect();
        if let Some(max_count) = max_count {
            neighbours.truncate(max_count);
        }
        Ok(neighbours)
    }
}

impl Refreshable for RecordBasedRecommender {
    fn refresh(&self, cycle: &mut RefreshCycle) -> anyhow::Result<()> {
        cycle.run(&self.model)?;
        cycle.run(&self.record_nhood)
    }
}
