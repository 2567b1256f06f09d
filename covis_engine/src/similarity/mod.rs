//! Similarity components.
//!
//! Three seams with distinct inputs: [`PreferenceSimilarity`] compares two
//! preference vectors, [`RecordSimilarity`] compares two records by id and
//! [`QuerySimilarity`] compares two query strings. Record similarities may
//! reach into a data model or a cache and therefore refresh and fail like
//! any other store-backed component; the other two are pure.

mod preference;
mod query;
mod record;

use covis_core::Refreshable;

use crate::model::PreferenceMap;

pub use preference::{
    CosineSimilarity, JaccardSimilarity, SignificanceWeighting, TimeDecaySimilarity,
};
pub use query::ShingleJaccardSimilarity;
pub use record::{CollaborativeRecordSimilarity, CombinedRecordSimilarity, ImportedSimilarityCache};

/// Compares two preference vectors.
pub trait PreferenceSimilarity: Send + Sync {
    /// `None` means neither vector carries any signal.
    fn similarity(&self, from: &PreferenceMap, to: &PreferenceMap) -> Option<f64>;
}

/// Compares one record to another, directed from the first to the second.
pub trait RecordSimilarity: Refreshable {
    /// `Ok(None)` means the pair has no defined similarity; an `Err` is a
    /// storage fault surfacing through a persistent data model.
    fn similarity(&self, from_record_id: &str, to_record_id: &str) -> anyhow::Result<Option<f64>>;
}

/// Compares two query strings.
pub trait QuerySimilarity: Refreshable {
    fn similarity(&self, from_query: &str, to_query: &str) -> Option<f64>;
}
