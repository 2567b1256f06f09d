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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod error;
pub mod refresh;
pub mod store;

pub use error::StoreError;
pub use refresh::{RefreshCycle, Refreshable};
pub use store::{ReportedAction, SimilarityImport, UsageRecorder, UsageStore};

/// Identifier of a record in the search catalogue.
pub type RecordId = String;

/// Identifier of a visitor session as handed in by the search platform.
pub type SessionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// The session opened the detail view of a record.
    View,
    /// The session copied the record's link.
    Copy,
}

/// A single interaction of a session with a record, optionally attributed
/// to the search query that led to it.
///
/// At most one action exists per (session, record, action type); the store
/// treats a repeated report as a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub record_id: RecordId,
    pub session_id: SessionId,
    pub action_type: ActionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// A catalogue entry that can be recommended.
///
/// Inactive records are excluded from every store query. Internal records
/// are only visible to scopes that are allowed to see them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub record_id: RecordId,
    pub active: bool,
    pub internal: bool,
}

/// A stay of a single visitor. Sessions are created lazily when the first
/// action is reported and are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
}
