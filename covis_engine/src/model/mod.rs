//! Data models over the usage store.
//!
//! A data model folds raw actions into the derived signal the strategies
//! work with: [`Preference`] entries of the session-record matrix for the
//! item-based strategy, [`Hit`] entries of the query-record matrix for the
//! case-based one. Each orientation exists twice — a persistent variant
//! that queries the store on every call and an in-memory variant that
//! serves a refreshed snapshot. The two must behave identically; the
//! recommenders never know which one they received.

mod query;
mod record;

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use covis_core::{ActionType, RecordId, Refreshable};

pub use query::{InMemoryQueryDataModel, PersistentQueryDataModel};
pub use record::{InMemoryRecordDataModel, PersistentRecordDataModel};

/// An entry of the session-record matrix: the weighted interest of one
/// session in one record, with the most recent contributing time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preference {
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

/// One row or column of the session-record matrix, keyed by session id or
/// record id depending on the orientation of the lookup.
pub type PreferenceMap = HashMap<String, Preference>;

/// An entry of the query-record matrix: what happened on one record after
/// one query landed on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Time-decayed weighted count of the contributing actions.
    pub value: f64,
    /// Raw number of contributing actions.
    pub total_hits: u64,
    /// Time of the most recent contributing action.
    pub last_interaction: DateTime<Utc>,
}

/// The hits of one query, keyed by record.
pub type HitRow = HashMap<RecordId, Hit>;

/// The weight an action type contributes to a preference or hit.
///
/// A copy weighs more than a view: copying the link is the stronger
/// signal of interest.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ActionWeights {
    pub view: f64,
    pub copy: f64,
}

impl Default for ActionWeights {
    fn default() -> Self {
        Self {
            view: 1.0,
            copy: 2.0,
        }
    }
}

impl ActionWeights {
    #[must_use]
    pub const fn weight_of(&self, action_type: ActionType) -> f64 {
        match action_type {
            ActionType::View => self.view,
            ActionType::Copy => self.copy,
        }
    }
}

/// Repository of the session-record matrix.
pub trait RecordDataModel: Refreshable {
    /// All records known to the model.
    fn records(&self) -> anyhow::Result<Vec<RecordId>>;

    /// The preferences of a session, keyed by record id.
    fn preferences_of_session(&self, session_id: &str) -> anyhow::Result<PreferenceMap>;

    /// The preferences for a record, keyed by session id.
    fn preferences_for_record(&self, record_id: &str) -> anyhow::Result<PreferenceMap>;

    /// The full matrix, one preference column per record.
    ///
    /// This is the snapshot iteration the in-memory model rebuilds from.
    fn preferences_for_records(&self) -> anyhow::Result<Vec<(RecordId, PreferenceMap)>>;
}

/// Repository of the query-record matrix.
pub trait QueryDataModel: Refreshable {
    /// All queries known to the model.
    fn queries(&self) -> anyhow::Result<Vec<String>>;

    /// The hit rows of the given queries; unknown queries are skipped.
    fn hit_rows_for_queries(&self, query_strings: &[String])
        -> anyhow::Result<Vec<(String, HitRow)>>;

    /// The full hit matrix.
    fn hit_rows(&self) -> anyhow::Result<Vec<(String, HitRow)>>;
}
