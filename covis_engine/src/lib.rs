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

//! The recommendation engine.
//!
//! Two strategies work on the usage signals of the search platform. The
//! item-based strategy recommends records to a session from the records
//! that similar usage put next to its own history. The case-based strategy
//! recommends search results for a query from the hits that this and
//! similar past queries produced. Both strategies are assembled from the
//! same building blocks: a data model over the store, a similarity, a
//! neighbourhood and a recommender, every cache-holding piece taking part
//! in the cooperative refresh protocol of `covis_core`.

pub mod metrics;
pub mod model;
pub mod neighbourhood;
pub mod recommender;
pub mod registry;
pub mod similarity;

pub use metrics::DecayParams;
pub use model::{
    ActionWeights, Hit, HitRow, Preference, PreferenceMap, QueryDataModel, RecordDataModel,
};
pub use recommender::{QueryDetails, Recommendation, ScoredRecord};
pub use registry::{
    CaseParams, EngineParams, ItemParams, Recommender, RecommenderRegistry, Scope,
    ScoreFunctionParams, ScorerParams,
};
