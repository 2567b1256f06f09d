//! Record-oriented data models backing the item-based strategy.

use arc_swap::ArcSwap;
use parking_lot::ReentrantMutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use covis_core::{Action, ActionType, RecordId, RefreshCycle, Refreshable, UsageStore};

use super::{ActionWeights, Preference, PreferenceMap, RecordDataModel};

fn preferences_from_actions<'a, F>(
    actions: &'a [Action],
    weights: ActionWeights,
    key_of: F,
) -> PreferenceMap
where
    F: Fn(&'a Action) -> &'a str,
{
    let mut preferences = PreferenceMap::new();
    for action in actions {
        let key = key_of(action);
        match preferences.get_mut(key) {
            None => {
                preferences.insert(
                    key.to_string(),
                    Preference {
                        value: weights.weight_of(action.action_type),
                        recorded_at: action.recorded_at,
                    },
                );
            }
            // A copy outweighs whatever is there and refreshes the time;
            // a second view changes nothing.
            Some(preference) if action.action_type == ActionType::Copy => {
                preference.value = weights.copy;
                preference.recorded_at = action.recorded_at;
            }
            Some(_) => {}
        }
    }
    preferences
}

/// Folds preferences straight out of the store on every call.
///
/// Correct but too slow for the full-corpus scans of the neighbourhood
/// precompute; those run against the in-memory variant instead.
pub struct PersistentRecordDataModel {
    store: Arc<dyn UsageStore>,
    include_internal_records: bool,
    weights: ActionWeights,
}

impl PersistentRecordDataModel {
    #[must_use]
    pub fn new(store: Arc<dyn UsageStore>, include_internal_records: bool) -> Self {
        Self::with_weights(store, include_internal_records, ActionWeights::default())
    }

    #[must_use]
    pub fn with_weights(
        store: Arc<dyn UsageStore>,
        include_internal_records: bool,
        weights: ActionWeights,
    ) -> Self {
        Self {
            store,
            include_internal_records,
            weights,
        }
    }
}

impl Refreshable for PersistentRecordDataModel {
    /// Nothing to rebuild; the model works directly on the store.
    fn refresh(&self, _cycle: &mut RefreshCycle) -> anyhow::Result<()> {
        Ok(())
    }
}

impl RecordDataModel for PersistentRecordDataModel {
    fn records(&self) -> anyhow::Result<Vec<RecordId>> {
        self.store.records(self.include_internal_records)
    }

    fn preferences_of_session(&self, session_id: &str) -> anyhow::Result<PreferenceMap> {
        let actions = self.store.actions_of_session(session_id)?;
        Ok(preferences_from_actions(&actions, self.weights, |action| {
            action.record_id.as_str()
        }))
    }

    fn preferences_for_record(&self, record_id: &str) -> anyhow::Result<PreferenceMap> {
        let actions = self.store.actions_on_record(record_id, None)?;
        Ok(preferences_from_actions(&actions, self.weights, |action| {
            action.session_id.as_str()
        }))
    }

    fn preferences_for_records(&self) -> anyhow::Result<Vec<(RecordId, PreferenceMap)>> {
        let grouped = self
            .store
            .actions_on_records(self.include_internal_records, None)?;
        Ok(grouped
            .into_iter()
            .map(|(record_id, actions)| {
                let preferences = preferences_from_actions(&actions, self.weights, |action| {
                    action.session_id.as_str()
                });
                (record_id, preferences)
            })
            .collect())
    }
}

/// Serves the session-record matrix from a refreshed snapshot.
pub struct InMemoryRecordDataModel {
    upstream: Arc<dyn RecordDataModel>,
    snapshot: ArcSwap<HashMap<RecordId, PreferenceMap>>,
    refresh_lock: ReentrantMutex<()>,
}

impl InMemoryRecordDataModel {
    /// Wraps an upstream model. The snapshot starts empty; run a refresh
    /// cycle before serving requests.
    #[must_use]
    pub fn new(upstream: Arc<dyn RecordDataModel>) -> Self {
        Self {
            upstream,
            snapshot: ArcSwap::from_pointee(HashMap::new()),
            refresh_lock: ReentrantMutex::new(()),
        }
    }
}

impl Refreshable for InMemoryRecordDataModel {
    fn refresh(&self, cycle: &mut RefreshCycle) -> anyhow::Result<()> {
        let _guard = self.refresh_lock.lock();
        cycle.run(&self.upstream)?;
        let rebuilt: HashMap<RecordId, PreferenceMap> =
            self.upstream.preferences_for_records()?.into_iter().collect();
        debug!(records = rebuilt.len(), "record snapshot rebuilt");
        self.snapshot.store(Arc::new(rebuilt));
        Ok(())
    }
}

impl RecordDataModel for InMemoryRecordDataModel {
    fn records(&self) -> anyhow::Result<Vec<RecordId>> {
        Ok(self.snapshot.load().keys().cloned().collect())
    }

    fn preferences_of_session(&self, session_id: &str) -> anyhow::Result<PreferenceMap> {
        let snapshot = self.snapshot.load();
        let mut preferences = PreferenceMap::new();
        for (record_id, record_preferences) in snapshot.iter() {
            if let Some(preference) = record_preferences.get(session_id) {
                preferences.insert(record_id.clone(), *preference);
            }
        }
        Ok(preferences)
    }

    fn preferences_for_record(&self, record_id: &str) -> anyhow::Result<PreferenceMap> {
        Ok(self
            .snapshot
            .load()
            .get(record_id)
            .cloned()
            .unwrap_or_default())
    }

    fn preferences_for_records(&self) -> anyhow::Result<Vec<(RecordId, PreferenceMap)>> {
        Ok(self
            .snapshot
            .load()
            .iter()
            .map(|(record_id, preferences)| (record_id.clone(), preferences.clone()))
            .collect())
    }
}
