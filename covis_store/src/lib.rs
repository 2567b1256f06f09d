#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Embedded usage store.
//!
//! [`MemoryStore`] is the in-process implementation of the storage
//! interface the engine consumes. It holds records, sessions, queries,
//! actions and imported similarities behind a single read/write lock and
//! is the store used by the demo binary and the test suites. A production
//! deployment would put a database behind the same traits.

mod imported;

use chrono::{Duration, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use covis_core::{
    Action, ActionType, Record, RecordId, ReportedAction, Session, SessionId, SimilarityImport,
    StoreError, UsageRecorder, UsageStore,
};

use imported::BoundedSimilarityRow;

/// One action is kept per (record, session, action type).
type ActionKey = (RecordId, SessionId, ActionType);

#[derive(Default)]
struct StoreInner {
    records: HashMap<RecordId, Record>,
    sessions: HashMap<SessionId, Session>,
    queries: BTreeSet<String>,
    actions: BTreeMap<ActionKey, Action>,
    imported: HashMap<RecordId, BoundedSimilarityRow>,
}

impl StoreInner {
    fn record_visible(&self, record_id: &str, include_internal: bool) -> bool {
        self.records.get(record_id).is_some_and(|record| {
            record.active && (include_internal || !record.internal)
        })
    }

    fn ensure_record(&mut self, record_id: &str, internal: bool) {
        self.records
            .entry(record_id.to_string())
            .or_insert_with(|| Record {
                record_id: record_id.to_string(),
                active: true,
                internal,
            });
    }
}

/// In-memory usage store.
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
    max_sims_per_record: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub const DEFAULT_MAX_SIMS_PER_RECORD: usize = 100;

    #[must_use]
    pub fn new() -> Self {
        Self::with_max_sims_per_record(Self::DEFAULT_MAX_SIMS_PER_RECORD)
    }

    /// Creates a store that retains at most `cap` imported similarities
    /// per source record.
    #[must_use]
    pub fn with_max_sims_per_record(cap: usize) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            max_sims_per_record: cap,
        }
    }
}

fn within_age(action: &Action, max_age: Option<Duration>) -> bool {
    max_age.is_none_or(|bound| action.recorded_at >= Utc::now() - bound)
}

impl UsageStore for MemoryStore {
    fn queries(&self) -> anyhow::Result<Vec<String>> {
        let inner = self.inner.read();
        Ok(inner.queries.iter().cloned().collect())
    }

    fn records(&self, include_internal: bool) -> anyhow::Result<Vec<RecordId>> {
        let inner = self.inner.read();
        let mut records: Vec<RecordId> = inner
            .records
            .values()
            .filter(|record| record.active && (include_internal || !record.internal))
            .map(|record| record.record_id.clone())
            .collect();
        records.sort_unstable();
        Ok(records)
    }

    fn actions_of_session(&self, session_id: &str) -> anyhow::Result<Vec<Action>> {
        let inner = self.inner.read();
        Ok(inner
            .actions
            .values()
            .filter(|action| action.session_id == session_id)
            .filter(|action| inner.record_visible(&action.record_id, true))
            .cloned()
            .collect())
    }

    fn actions_on_record(
        &self,
        record_id: &str,
        max_age: Option<Duration>,
    ) -> anyhow::Result<Vec<Action>> {
        let inner = self.inner.read();
        Ok(inner
            .actions
            .values()
            .filter(|action| action.record_id == record_id)
            .filter(|action| inner.record_visible(record_id, true))
            .filter(|action| within_age(action, max_age))
            .cloned()
            .collect())
    }

    fn actions_on_records(
        &self,
        include_internal: bool,
        max_age: Option<Duration>,
    ) -> anyhow::Result<Vec<(RecordId, Vec<Action>)>> {
        let inner = self.inner.read();
        let mut grouped: Vec<(RecordId, Vec<Action>)> = Vec::new();
        for action in inner.actions.values() {
            if !inner.record_visible(&action.record_id, include_internal)
                || !within_age(action, max_age)
            {
                continue;
            }
            match grouped.last_mut() {
                Some((record_id, actions)) if *record_id == action.record_id => {
                    actions.push(action.clone());
                }
                _ => grouped.push((action.record_id.clone(), vec![action.clone()])),
            }
        }
        Ok(grouped)
    }

    fn actions_for_queries(
        &self,
        include_internal: bool,
        query_strings: Option<&[String]>,
        max_age: Option<Duration>,
    ) -> anyhow::Result<Vec<(String, Vec<Action>)>> {
        let inner = self.inner.read();
        let mut grouped: BTreeMap<String, Vec<Action>> = BTreeMap::new();
        for action in inner.actions.values() {
            let Some(query) = &action.query else {
                continue;
            };
            if let Some(wanted) = query_strings {
                if !wanted.contains(query) {
                    continue;
                }
            }
            if !inner.record_visible(&action.record_id, include_internal)
                || !within_age(action, max_age)
            {
                continue;
            }
            grouped.entry(query.clone()).or_default().push(action.clone());
        }
        Ok(grouped.into_iter().collect())
    }

    fn imported_similarities(
        &self,
        include_internal: bool,
    ) -> anyhow::Result<Vec<(RecordId, HashMap<RecordId, f64>)>> {
        let inner = self.inner.read();
        let mut rows: Vec<(RecordId, HashMap<RecordId, f64>)> = Vec::new();
        for (from_record, row) in &inner.imported {
            if !inner.record_visible(from_record, include_internal) {
                continue;
            }
            let sims: HashMap<RecordId, f64> = row
                .iter()
                .filter(|(to_record, _)| inner.record_visible(to_record, include_internal))
                .map(|(to_record, value)| (to_record.clone(), value))
                .collect();
            if !sims.is_empty() {
                rows.push((from_record.clone(), sims));
            }
        }
        rows.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        Ok(rows)
    }
}

impl UsageRecorder for MemoryStore {
    fn report_action(&self, report: &ReportedAction) -> anyhow::Result<bool> {
        let mut inner = self.inner.write();

        let key = (
            report.record_id.clone(),
            report.session_id.clone(),
            report.action_type,
        );
        // Register the same interaction only once per session.
        if inner.actions.contains_key(&key) {
            return Ok(false);
        }

        inner.ensure_record(&report.record_id, report.is_internal_record);
        if let Some(query) = &report.query {
            inner.queries.insert(query.clone());
        }
        inner
            .sessions
            .entry(report.session_id.clone())
            .or_insert_with(|| Session {
                session_id: report.session_id.clone(),
                created_at: report.timestamp,
            });

        inner.actions.insert(
            key,
            Action {
                record_id: report.record_id.clone(),
                session_id: report.session_id.clone(),
                action_type: report.action_type,
                query: report.query.clone(),
                recorded_at: report.timestamp,
            },
        );
        debug!(
            record_id = %report.record_id,
            session_id = %report.session_id,
            action_type = ?report.action_type,
            "action recorded"
        );
        Ok(true)
    }

    fn set_record_active(&self, record_id: &str, active: bool) -> anyhow::Result<()> {
        let mut inner = self.inner.write();
        let record = inner
            .records
            .get_mut(record_id)
            .ok_or_else(|| StoreError::RecordNotPresent(record_id.to_string()))?;
        record.active = active;
        Ok(())
    }

    fn import_record_similarity(&self, import: &SimilarityImport) -> anyhow::Result<bool> {
        let mut inner = self.inner.write();
        inner.ensure_record(&import.from_record_id, import.from_is_internal);
        inner.ensure_record(&import.to_record_id, import.to_is_internal);

        let cap = self.max_sims_per_record;
        let row = inner
            .imported
            .entry(import.from_record_id.clone())
            .or_insert_with(|| BoundedSimilarityRow::new(cap));
        Ok(row.insert(&import.to_record_id, import.similarity))
    }
}
