//! The storage interface consumed by the engine.
//!
//! The engine never talks to a concrete database. It reads usage signals
//! through [`UsageStore`] and the search platform records new signals
//! through [`UsageRecorder`]. Both traits are synchronous and fail fast;
//! retry policy belongs to the caller.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{Action, ActionType, RecordId, SessionId};

/// Read access to the accumulated usage signals.
///
/// Every method excludes inactive records. The `include_internal` switches
/// additionally exclude internal records and the actions performed on them,
/// which is how the public scope is kept free of restricted material. A
/// `max_age` bound drops actions older than now minus the bound.
pub trait UsageStore: Send + Sync {
    /// All query strings that were ever committed.
    fn queries(&self) -> anyhow::Result<Vec<String>>;

    /// Ids of all active records.
    fn records(&self, include_internal: bool) -> anyhow::Result<Vec<RecordId>>;

    /// Actions recorded in the given session.
    fn actions_of_session(&self, session_id: &str) -> anyhow::Result<Vec<Action>>;

    /// Actions performed on the given record.
    fn actions_on_record(
        &self,
        record_id: &str,
        max_age: Option<Duration>,
    ) -> anyhow::Result<Vec<Action>>;

    /// Actions grouped by record, ordered by record id.
    fn actions_on_records(
        &self,
        include_internal: bool,
        max_age: Option<Duration>,
    ) -> anyhow::Result<Vec<(RecordId, Vec<Action>)>>;

    /// Query-attributed actions grouped by query, ordered by query string.
    ///
    /// With `query_strings` set, only those queries are returned; otherwise
    /// every query that has attributed actions is.
    fn actions_for_queries(
        &self,
        include_internal: bool,
        query_strings: Option<&[String]>,
        max_age: Option<Duration>,
    ) -> anyhow::Result<Vec<(String, Vec<Action>)>>;

    /// Imported record-to-record similarity values, grouped by source record.
    fn imported_similarities(
        &self,
        include_internal: bool,
    ) -> anyhow::Result<Vec<(RecordId, HashMap<RecordId, f64>)>>;
}

/// An action report as handed in by the search platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportedAction {
    pub record_id: RecordId,
    pub is_internal_record: bool,
    pub session_id: SessionId,
    pub action_type: ActionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A directed record similarity computed by an external process.
///
/// Imported similarities back the engine up when no usage data is
/// available for a record yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityImport {
    pub from_record_id: RecordId,
    pub from_is_internal: bool,
    pub to_record_id: RecordId,
    pub to_is_internal: bool,
    pub similarity: f64,
}

/// Write access to the usage store.
pub trait UsageRecorder: Send + Sync {
    /// Stores a reported action.
    ///
    /// Record, query and session rows are created lazily on first
    /// reference. Only one action is kept per (session, record, action
    /// type); reporting the same combination again is a no-op and returns
    /// `false`.
    fn report_action(&self, report: &ReportedAction) -> anyhow::Result<bool>;

    /// Activates or deactivates a record.
    ///
    /// Deactivation removes the record from every query without deleting
    /// its historical actions. Unknown records are a
    /// [`crate::StoreError::RecordNotPresent`] fault.
    fn set_record_active(&self, record_id: &str, active: bool) -> anyhow::Result<()>;

    /// Imports a similarity value from one record to another.
    ///
    /// At most a configured number of outgoing values is retained per
    /// source record. At capacity, the import replaces the current minimum
    /// only if its value is strictly larger; otherwise it is rejected.
    /// Returns whether the value was stored.
    fn import_record_similarity(&self, import: &SimilarityImport) -> anyhow::Result<bool>;
}
