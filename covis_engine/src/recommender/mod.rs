//! The two recommendation strategies and their result types.

mod query;
mod record;
mod scorer;

use chrono::{DateTime, Utc};
use serde::Serialize;

use covis_core::RecordId;

pub use query::QueryBasedRecommender;
pub use record::RecordBasedRecommender;
pub use scorer::{
    Frequency, HitValueRow, LogFrequency, Relevance, ScoreFunction, Scorer,
    WeightedAverageScorer, WeightedSumScorer,
};

/// A record with the score the strategy assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    pub record_id: RecordId,
    pub score: f64,
}

/// What one query contributed to a recommended record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDetails {
    pub query_string: String,
    /// Time-decayed weighted hits of the record under this query.
    pub decayed_hits: f64,
    /// Raw number of hits of the record under this query.
    pub total_hits: u64,
    /// Last time the record was selected after this query.
    pub last_interaction: DateTime<Utc>,
}

/// A recommended search result with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub record_id: RecordId,
    pub score: f64,
    /// The record's hits under the exact target query, when there are any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_query: Option<QueryDetails>,
    /// Other contributing queries, strongest decayed hits first.
    pub related_queries: Vec<QueryDetails>,
    /// Most recent interaction across all contributing queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_interaction: Option<DateTime<Utc>>,
    /// Total hits across all contributing queries.
    pub total_hits: u64,
}
