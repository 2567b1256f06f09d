//! Record-to-record similarities.

use arc_swap::ArcSwap;
use parking_lot::ReentrantMutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use covis_core::{RecordId, RefreshCycle, Refreshable, UsageStore};

use crate::model::RecordDataModel;

use super::{PreferenceSimilarity, RecordSimilarity};

/// Compares two records by running a preference metric on their columns of
/// the session-record matrix.
pub struct CollaborativeRecordSimilarity {
    model: Arc<dyn RecordDataModel>,
    metric: Box<dyn PreferenceSimilarity>,
}

impl CollaborativeRecordSimilarity {
    #[must_use]
    pub fn new(model: Arc<dyn RecordDataModel>, metric: Box<dyn PreferenceSimilarity>) -> Self {
        Self { model, metric }
    }
}

impl Refreshable for CollaborativeRecordSimilarity {
    fn refresh(&self, cycle: &mut RefreshCycle) -> anyhow::Result<()> {
        cycle.run(&self.model)
    }
}

impl RecordSimilarity for CollaborativeRecordSimilarity {
    fn similarity(&self, from_record_id: &str, to_record_id: &str) -> anyhow::Result<Option<f64>> {
        let from_preferences = self.model.preferences_for_record(from_record_id)?;
        let to_preferences = self.model.preferences_for_record(to_record_id)?;
        Ok(self.metric.similarity(&from_preferences, &to_preferences))
    }
}

/// Blends two record similarities: `w·sim1 + (1−w)·sim2`.
///
/// When exactly one side is undefined, the defined side is scaled by its
/// own weight without renormalizing; the blend therefore never reports
/// more confidence than the signal that is actually there. Both sides
/// undefined stays undefined.
pub struct CombinedRecordSimilarity {
    first: Arc<dyn RecordSimilarity>,
    second: Arc<dyn RecordSimilarity>,
    weight: f64,
}

impl CombinedRecordSimilarity {
    /// `weight` applies to `first`; `1 − weight` to `second`.
    #[must_use]
    pub fn new(
        first: Arc<dyn RecordSimilarity>,
        second: Arc<dyn RecordSimilarity>,
        weight: f64,
    ) -> Self {
        assert!((0.0..=1.0).contains(&weight), "weight must be in [0, 1]");
        Self {
            first,
            second,
            weight,
        }
    }
}

impl Refreshable for CombinedRecordSimilarity {
    fn refresh(&self, cycle: &mut RefreshCycle) -> anyhow::Result<()> {
        cycle.run(&self.first)?;
        cycle.run(&self.second)
    }
}

impl RecordSimilarity for CombinedRecordSimilarity {
    fn similarity(&self, from_record_id: &str, to_record_id: &str) -> anyhow::Result<Option<f64>> {
        let first = self.first.similarity(from_record_id, to_record_id)?;
        let second = self.second.similarity(from_record_id, to_record_id)?;

        Ok(match (first, second) {
            (None, None) => None,
            (None, Some(second)) => Some(second * (1.0 - self.weight)),
            (Some(first), None) => Some(first * self.weight),
            (Some(first), Some(second)) => {
                Some(first * self.weight + second * (1.0 - self.weight))
            }
        })
    }
}

/// In-memory snapshot of the similarities imported into the store.
///
/// On refresh the cache re-pulls every imported row and keeps at most
/// `max_per_record` of the highest values per source record. Lookups of
/// unknown pairs are undefined, which lets the combined similarity fall
/// back to the collaborative signal.
pub struct ImportedSimilarityCache {
    store: Arc<dyn UsageStore>,
    include_internal_records: bool,
    max_per_record: usize,
    snapshot: ArcSwap<HashMap<RecordId, HashMap<RecordId, f64>>>,
    refresh_lock: ReentrantMutex<()>,
}

impl ImportedSimilarityCache {
    #[must_use]
    pub fn new(
        store: Arc<dyn UsageStore>,
        include_internal_records: bool,
        max_per_record: usize,
    ) -> Self {
        Self {
            store,
            include_internal_records,
            max_per_record,
            snapshot: ArcSwap::from_pointee(HashMap::new()),
            refresh_lock: ReentrantMutex::new(()),
        }
    }
}

impl Refreshable for ImportedSimilarityCache {
    fn refresh(&self, _cycle: &mut RefreshCycle) -> anyhow::Result<()> {
        let _guard = self.refresh_lock.lock();
        let rows = self
            .store
            .imported_similarities(self.include_internal_records)?;

        let mut rebuilt: HashMap<RecordId, HashMap<RecordId, f64>> =
            HashMap::with_capacity(rows.len());
        for (from_record, sims) in rows {
            let mut sorted: Vec<(RecordId, f64)> = sims.into_iter().collect();
            sorted.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            sorted.truncate(self.max_per_record);
            rebuilt.insert(from_record, sorted.into_iter().collect());
        }
        debug!(sources = rebuilt.len(), "imported similarity cache rebuilt");
        self.snapshot.store(Arc::new(rebuilt));
        Ok(())
    }
}

impl RecordSimilarity for ImportedSimilarityCache {
    fn similarity(&self, from_record_id: &str, to_record_id: &str) -> anyhow::Result<Option<f64>> {
        Ok(self
            .snapshot
            .load()
            .get(from_record_id)
            .and_then(|row| row.get(to_record_id))
            .copied())
    }
}
