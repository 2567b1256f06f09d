//! Query-oriented data models backing the case-based strategy.

use arc_swap::ArcSwap;
use chrono::{Duration, Utc};
use parking_lot::ReentrantMutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use covis_core::{Action, RefreshCycle, Refreshable, UsageStore};

use crate::metrics::{DecayParams, exp_decay};

use super::{ActionWeights, Hit, HitRow, QueryDataModel};

/// Folds hit rows straight out of the store on every call.
pub struct PersistentQueryDataModel {
    store: Arc<dyn UsageStore>,
    include_internal_records: bool,
    weights: ActionWeights,
    time_decay: Option<DecayParams>,
}

impl PersistentQueryDataModel {
    /// Default decay: daily buckets, long half-life, hits older than 300
    /// days stop counting.
    pub const DEFAULT_DECAY: DecayParams = DecayParams {
        interval_days: 1,
        half_life: 50.0,
        max_age: 300,
    };

    #[must_use]
    pub fn new(store: Arc<dyn UsageStore>, include_internal_records: bool) -> Self {
        Self::with_params(
            store,
            include_internal_records,
            ActionWeights::default(),
            Some(Self::DEFAULT_DECAY),
        )
    }

    #[must_use]
    pub fn with_params(
        store: Arc<dyn UsageStore>,
        include_internal_records: bool,
        weights: ActionWeights,
        time_decay: Option<DecayParams>,
    ) -> Self {
        Self {
            store,
            include_internal_records,
            weights,
            time_decay,
        }
    }

    /// Everything older than this contributes zero anyway, so the bound is
    /// pushed down into the store query.
    fn max_age_bound(&self) -> Option<Duration> {
        self.time_decay.as_ref().map(DecayParams::horizon)
    }

    fn hits_from_actions(&self, actions: &[Action]) -> HitRow {
        let now = Utc::now();
        let mut hits = HitRow::new();
        for action in actions {
            let mut value = self.weights.weight_of(action.action_type);
            if let Some(params) = &self.time_decay {
                value = exp_decay(value, now, action.recorded_at, params);
            }

            let hit = hits.entry(action.record_id.clone()).or_insert_with(|| Hit {
                value: 0.0,
                total_hits: 0,
                last_interaction: action.recorded_at,
            });
            hit.value += value;
            hit.total_hits += 1;
            if action.recorded_at > hit.last_interaction {
                hit.last_interaction = action.recorded_at;
            }
        }
        hits
    }
}

impl Refreshable for PersistentQueryDataModel {
    /// Nothing to rebuild; the model works directly on the store.
    fn refresh(&self, _cycle: &mut RefreshCycle) -> anyhow::Result<()> {
        Ok(())
    }
}

impl QueryDataModel for PersistentQueryDataModel {
    fn queries(&self) -> anyhow::Result<Vec<String>> {
        self.store.queries()
    }

    fn hit_rows_for_queries(
        &self,
        query_strings: &[String],
    ) -> anyhow::Result<Vec<(String, HitRow)>> {
        let grouped = self.store.actions_for_queries(
            self.include_internal_records,
            Some(query_strings),
            self.max_age_bound(),
        )?;
        Ok(grouped
            .into_iter()
            .map(|(query, actions)| {
                let hits = self.hits_from_actions(&actions);
                (query, hits)
            })
            .collect())
    }

    fn hit_rows(&self) -> anyhow::Result<Vec<(String, HitRow)>> {
        let grouped = self.store.actions_for_queries(
            self.include_internal_records,
            None,
            self.max_age_bound(),
        )?;
        Ok(grouped
            .into_iter()
            .map(|(query, actions)| {
                let hits = self.hits_from_actions(&actions);
                (query, hits)
            })
            .collect())
    }
}

/// Serves the hit matrix from a refreshed snapshot.
pub struct InMemoryQueryDataModel {
    upstream: Arc<dyn QueryDataModel>,
    snapshot: ArcSwap<HashMap<String, HitRow>>,
    refresh_lock: ReentrantMutex<()>,
}

impl InMemoryQueryDataModel {
    /// Wraps an upstream model. The snapshot starts empty; run a refresh
    /// cycle before serving requests.
    #[must_use]
    pub fn new(upstream: Arc<dyn QueryDataModel>) -> Self {
        Self {
            upstream,
            snapshot: ArcSwap::from_pointee(HashMap::new()),
            refresh_lock: ReentrantMutex::new(()),
        }
    }
}

impl Refreshable for InMemoryQueryDataModel {
    fn refresh(&self, cycle: &mut RefreshCycle) -> anyhow::Result<()> {
        let _guard = self.refresh_lock.lock();
        cycle.run(&self.upstream)?;
        let rebuilt: HashMap<String, HitRow> = self.upstream.hit_rows()?.into_iter().collect();
        debug!(queries = rebuilt.len(), "hit matrix snapshot rebuilt");
        self.snapshot.store(Arc::new(rebuilt));
        Ok(())
    }
}

impl QueryDataModel for InMemoryQueryDataModel {
    fn queries(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.snapshot.load().keys().cloned().collect())
    }

    fn hit_rows_for_queries(
        &self,
        query_strings: &[String],
    ) -> anyhow::Result<Vec<(String, HitRow)>> {
        let snapshot = self.snapshot.load();
        Ok(query_strings
            .iter()
            .filter_map(|query| {
                snapshot
                    .get(query)
                    .map(|hits| (query.clone(), hits.clone()))
            })
            .collect())
    }

    fn hit_rows(&self) -> anyhow::Result<Vec<(String, HitRow)>> {
        Ok(self
            .snapshot
            .load()
            .iter()
            .map(|(query, hits)| (query.clone(), hits.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use super::*;
    use covis_core::{ActionType, RecordId};

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

    fn hit(value: f64) -> Hit {
        Hit {
            value,
            total_hits: 1,
            last_interaction: Utc::now(),
        }
    }

    fn action(record: &str, query: &str, action_type: ActionType, days_ago: i64) -> Action {
        Action {
            record_id: record.to_string(),
            session_id: "s1".to_string(),
            action_type,
            query: Some(query.to_string()),
            recorded_at: Utc::now() - Duration::days(days_ago),
        }
    }

    struct NoStore;

    impl covis_core::UsageStore for NoStore {
        fn queries(&self) -> anyhow::Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn records(&self, _include_internal: bool) -> anyhow::Result<Vec<RecordId>> {
            Ok(Vec::new())
        }

        fn actions_of_session(&self, _session_id: &str) -> anyhow::Result<Vec<Action>> {
            Ok(Vec::new())
        }

        fn actions_on_record(
            &self,
            _record_id: &str,
            _max_age: Option<Duration>,
        ) -> anyhow::Result<Vec<Action>> {
            Ok(Vec::new())
        }

        fn actions_on_records(
            &self,
            _include_internal: bool,
            _max_age: Option<Duration>,
        ) -> anyhow::Result<Vec<(RecordId, Vec<Action>)>> {
            Ok(Vec::new())
        }

        fn actions_for_queries(
            &self,
            _include_internal: bool,
            _query_strings: Option<&[String]>,
            _max_age: Option<Duration>,
        ) -> anyhow::Result<Vec<(String, Vec<Action>)>> {
            Ok(Vec::new())
        }

        fn imported_similarities(
            &self,
            _include_internal: bool,
        ) -> anyhow::Result<Vec<(RecordId, HashMap<RecordId, f64>)>> {
            Ok(Vec::new())
        }
    }

    fn model_without_decay() -> PersistentQueryDataModel {
        PersistentQueryDataModel::with_params(
            Arc::new(NoStore),
            true,
            ActionWeights::default(),
            None,
        )
    }

    #[test]
    fn hits_accumulate_weights_and_counts() {
        let model = model_without_decay();
        let actions = vec![
            action("doc", "maps", ActionType::View, 3),
            action("doc", "maps", ActionType::Copy, 1),
        ];

        let hits = model.hits_from_actions(&actions);

        let hit = &hits["doc"];
        assert_eq!(hit.value, 3.0);
        assert_eq!(hit.total_hits, 2);
        assert_eq!(hit.last_interaction, actions[1].recorded_at);
    }

    #[test]
    fn decay_shrinks_old_hits() {
        let model = PersistentQueryDataModel::with_params(
            Arc::new(NoStore),
            true,
            ActionWeights::default(),
            Some(DecayParams {
                interval_days: 1,
                half_life: 1.0,
                max_age: 100,
            }),
        );

        let hits =
            model.hits_from_actions(&[action("doc", "maps", ActionType::View, 2)]);

        assert!((hits["doc"].value - 0.25).abs() < 1e-9);
    }

    #[test]
    fn hits_beyond_max_age_contribute_zero() {
        let model = PersistentQueryDataModel::with_params(
            Arc::new(NoStore),
            true,
            ActionWeights::default(),
            Some(DecayParams {
                interval_days: 1,
                half_life: 1.0,
                max_age: 3,
            }),
        );

        let hits =
            model.hits_from_actions(&[action("doc", "maps", ActionType::View, 10)]);

        assert_eq!(hits["doc"].value, 0.0);
        assert_eq!(hits["doc"].total_hits, 1);
    }

    #[test]
    fn in_memory_model_serves_only_known_queries() {
        let upstream = Arc::new(FixedRows {
            rows: vec![
                ("maps".to_string(), HitRow::from([("a".to_string(), hit(2.0))])),
                ("atlas".to_string(), HitRow::from([("b".to_string(), hit(1.0))])),
            ],
        });
        let model = Arc::new(InMemoryQueryDataModel::new(upstream));

        assert!(model.queries().unwrap().is_empty());

        RefreshCycle::new().run(&model).unwrap();

        let rows = model
            .hit_rows_for_queries(&["maps".to_string(), "unknown".to_string()])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, "maps");
        assert_eq!(model.queries().unwrap().len(), 2);
    }
}
