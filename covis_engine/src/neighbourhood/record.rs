//! Record neighbourhoods.

use arc_swap::ArcSwap;
use parking_lot::ReentrantMutex;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use covis_core::{RecordId, RefreshCycle, Refreshable};

use crate::model::RecordDataModel;
use crate::similarity::RecordSimilarity;

use super::RecordNeighbourhood;

/// The k records most similar to a target, computed by a full scan.
///
/// Every call walks the whole corpus, which is exact but expensive; wrap
/// it in a [`PrecomputedRecordNeighbourhood`] on the request path.
pub struct KNearestRecordNeighbourhood {
    k: usize,
    model: Arc<dyn RecordDataModel>,
    record_sim: Arc<dyn RecordSimilarity>,
}

impl KNearestRecordNeighbourhood {
    #[must_use]
    pub fn new(
        k: usize,
        model: Arc<dyn RecordDataModel>,
        record_sim: Arc<dyn RecordSimilarity>,
    ) -> Self {
        Self {
            k,
            model,
            record_sim,
        }
    }
}

impl Refreshable for KNearestRecordNeighbourhood {
    fn refresh(&self, cycle: &mut RefreshCycle) -> anyhow::Result<()> {
        cycle.run(&self.model)?;
        cycle.run(&self.record_sim)
    }
}

impl RecordNeighbourhood for KNearestRecordNeighbourhood {
    fn neighbours(&self, record_id: &str) -> anyhow::Result<Vec<(RecordId, f64)>> {
        let mut candidates: Vec<(RecordId, f64)> = Vec::new();
        for other_record in self.model.records()? {
            if other_record == record_id {
                continue;
            }
            let Some(similarity) = self.record_sim.similarity(record_id, &other_record)? else {
                continue;
            };
            if similarity == 0.0 {
                continue;
            }
            candidates.push((other_record, similarity));
        }

        // Descending by similarity; ascending by id on ties to keep the
        // ranking stable across runs.
        candidates.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        candidates.truncate(self.k);
        Ok(candidates)
    }
}

#[derive(Debug, Clone, Default)]
struct RecordNeighbours {
    ranked: Vec<(RecordId, f64)>,
    by_id: HashMap<RecordId, f64>,
}

/// Precomputed neighbourhoods for every record of the corpus.
///
/// The refresh runs one k-nearest computation per record — the O(N²)
/// comparison sweep that dominates a cycle — in parallel across target
/// records, and installs the result as a snapshot. Lookups afterwards are
/// map reads. The snapshot also answers pair similarities, so the same
/// component serves as the recommender's similarity source.
pub struct PrecomputedRecordNeighbourhood {
    max_neighbours: usize,
    model: Arc<dyn RecordDataModel>,
    record_sim: Arc<dyn RecordSimilarity>,
    snapshot: ArcSwap<HashMap<RecordId, RecordNeighbours>>,
    refresh_lock: ReentrantMutex<()>,
}

impl PrecomputedRecordNeighbourhood {
    #[must_use]
    pub fn new(
        max_neighbours: usize,
        model: Arc<dyn RecordDataModel>,
        record_sim: Arc<dyn RecordSimilarity>,
    ) -> Self {
        Self {
            max_neighbours,
            model,
            record_sim,
            snapshot: ArcSwap::from_pointee(HashMap::new()),
            refresh_lock: ReentrantMutex::new(()),
        }
    }
}

impl Refreshable for PrecomputedRecordNeighbourhood {
    fn refresh(&self, cycle: &mut RefreshCycle) -> anyhow::Result<()> {
        let _guard = self.refresh_lock.lock();
        cycle.run(&self.model)?;
        cycle.run(&self.record_sim)?;

        let scan = KNearestRecordNeighbourhood::new(
            self.max_neighbours,
            Arc::clone(&self.model),
            Arc::clone(&self.record_sim),
        );
        let records = self.model.records()?;
        let rebuilt: HashMap<RecordId, RecordNeighbours> = records
            .into_par_iter()
            .map(|record_id| -> anyhow::Result<(RecordId, RecordNeighbours)> {
                let ranked = scan.neighbours(&record_id)?;
                let by_id = ranked.iter().cloned().collect();
                Ok((record_id, RecordNeighbours { ranked, by_id }))
            })
            .collect::<anyhow::Result<_>>()?;

        debug!(records = rebuilt.len(), "record neighbourhoods precomputed");
        self.snapshot.store(Arc::new(rebuilt));
        Ok(())
    }
}

impl RecordNeighbourhood for PrecomputedRecordNeighbourhood {
    fn neighbours(&self, record_id: &str) -> anyhow::Result<Vec<(RecordId, f64)>> {
        Ok(self
            .snapshot
            .load()
            .get(record_id)
            .map(|entry| entry.ranked.clone())
            .unwrap_or_default())
    }
}

impl RecordSimilarity for PrecomputedRecordNeighbourhood {
    fn similarity(&self, from_record_id: &str, to_record_id: &str) -> anyhow::Result<Option<f64>> {
        Ok(self
            .snapshot
            .load()
            .get(from_record_id)
            .and_then(|entry| entry.by_id.get(to_record_id))
            .copied())
    }
}
