//! Neighbourhood formation.
//!
//! A neighbourhood answers "which entities are related to this one". For
//! records the answer carries the similarity values, because the
//! item-based recommender accumulates them; for queries the ids suffice.

mod query;
mod record;

use covis_core::{RecordId, Refreshable};

pub use query::ThresholdQueryNeighbourhood;
pub use record::{KNearestRecordNeighbourhood, PrecomputedRecordNeighbourhood};

/// Retrieves the records related to a record.
pub trait RecordNeighbourhood: Refreshable {
    /// Neighbours with their similarity, ordered by descending similarity
    /// (ascending record id on ties). Never contains the record itself,
    /// undefined similarities or zero similarities.
    fn neighbours(&self, record_id: &str) -> anyhow::Result<Vec<(RecordId, f64)>>;
}

/// Retrieves the past queries related to a query.
pub trait QueryNeighbourhood: Refreshable {
    /// Neighbour queries, ordered by descending similarity (lexicographic
    /// on ties). Contains the query itself when it was seen before.
    fn neighbours(&self, query_string: &str) -> anyhow::Result<Vec<String>>;
}
