//! Startup wiring.
//!
//! One [`Recommender`] per visibility scope, each owning its full
//! component graph, collected in an explicit [`RecommenderRegistry`] that
//! is constructed once and passed by reference to whatever serves
//! requests. No global state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use covis_core::{RefreshCycle, UsageStore};

use crate::metrics::DecayParams;
use crate::model::{
    ActionWeights, InMemoryQueryDataModel, InMemoryRecordDataModel, PersistentQueryDataModel,
    PersistentRecordDataModel, QueryDataModel, RecordDataModel,
};
use crate::neighbourhood::{
    PrecomputedRecordNeighbourhood, QueryNeighbourhood, RecordNeighbourhood,
    ThresholdQueryNeighbourhood,
};
use crate::recommender::{
    Frequency, LogFrequency, QueryBasedRecommender, Recommendation, RecordBasedRecommender,
    Relevance, ScoreFunction, ScoredRecord, Scorer, WeightedAverageScorer, WeightedSumScorer,
};
use crate::similarity::{
    CollaborativeRecordSimilarity, CombinedRecordSimilarity, CosineSimilarity,
    ImportedSimilarityCache, QuerySimilarity, RecordSimilarity, ShingleJaccardSimilarity,
    TimeDecaySimilarity,
};

/// Which records a caller is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// External callers; internal records stay hidden.
    Public,
    /// Callers permitted to see internal records.
    Internal,
}

impl Scope {
    pub const ALL: [Self; 2] = [Self::Public, Self::Internal];

    #[must_use]
    pub const fn include_internal_records(self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// The raw score applied to a record's hits under one query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFunctionParams {
    Frequency,
    Relevance,
    LogFrequency { base: f64, scale: f64 },
}

impl ScoreFunctionParams {
    fn build(self) -> Box<dyn ScoreFunction> {
        match self {
            Self::Frequency => Box::new(Frequency),
            Self::Relevance => Box::new(Relevance),
            Self::LogFrequency { base, scale } => Box::new(LogFrequency::with_scale(base, scale)),
        }
    }
}

/// How the per-query scores combine into one record score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerParams {
    WeightedSum(ScoreFunctionParams),
    WeightedAverage(ScoreFunctionParams),
}

impl ScorerParams {
    fn build(self) -> Box<dyn Scorer> {
        match self {
            Self::WeightedSum(function) => Box::new(WeightedSumScorer::new(function.build())),
            Self::WeightedAverage(function) => {
                Box::new(WeightedAverageScorer::new(function.build()))
            }
        }
    }
}

/// Parameters of the item-based strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemParams {
    pub weights: ActionWeights,
    pub time_decay: DecayParams,
    /// Neighbours kept per record by the precompute.
    pub neighbourhood_size: usize,
    /// Weight of the collaborative signal against the imported one.
    pub collaborative_weight: f64,
    /// Imported similarities kept per source record in the cache.
    pub max_imported_per_record: usize,
}

impl Default for ItemParams {
    fn default() -> Self {
        Self {
            weights: ActionWeights::default(),
            time_decay: TimeDecaySimilarity::DEFAULT_DECAY,
            neighbourhood_size: 10,
            collaborative_weight: 0.75,
            max_imported_per_record: 100,
        }
    }
}

/// Parameters of the case-based strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseParams {
    pub weights: ActionWeights,
    /// `None` counts hits without any time decay.
    pub time_decay: Option<DecayParams>,
    pub k_shingles: usize,
    pub similarity_threshold: f64,
    pub scorer: ScorerParams,
}

impl Default for CaseParams {
    fn default() -> Self {
        Self {
            weights: ActionWeights::default(),
            time_decay: Some(PersistentQueryDataModel::DEFAULT_DECAY),
            k_shingles: 3,
            similarity_threshold: 0.25,
            scorer: ScorerParams::WeightedSum(ScoreFunctionParams::LogFrequency {
                base: 2.0,
                scale: 1.0,
            }),
        }
    }
}

/// All engine parameters, one set shared by every scope.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    pub item_based: ItemParams,
    pub case_based: CaseParams,
}

/// One scope's pair of strategies behind the exposed surface.
pub struct Recommender {
    record_based: Arc<RecordBasedRecommender>,
    query_based: Arc<QueryBasedRecommender>,
}

impl Recommender {
    /// Records recommended from the session's history.
    pub fn recommend_from_history(
        &self,
        session_id: &str,
        max_count: Option<usize>,
    ) -> anyhow::Result<Vec<ScoredRecord>> {
        self.record_based.recommend_from_history(session_id, max_count)
    }

    /// Records used together with the given one.
    pub fn most_similar_records(
        &self,
        record_id: &str,
        max_count: Option<usize>,
    ) -> anyhow::Result<Vec<ScoredRecord>> {
        self.record_based.most_similar_records(record_id, max_count)
    }

    /// Search results recommended for the query.
    pub fn recommend_search_results(
        &self,
        query_string: &str,
        max_count: Option<usize>,
    ) -> anyhow::Result<Vec<Recommendation>> {
        self.query_based.recommend_search_results(query_string, max_count)
    }

    /// Past queries similar to the given one.
    pub fn similar_queries(&self, query_string: &str) -> anyhow::Result<Vec<String>> {
        self.query_based.similar_queries(query_string)
    }

    /// Rebuilds every cache of this scope. Idempotent.
    pub fn refresh(&self) -> anyhow::Result<()> {
        let mut cycle = RefreshCycle::new();
        self.refresh_with(&mut cycle)
    }

    fn refresh_with(&self, cycle: &mut RefreshCycle) -> anyhow::Result<()> {
        cycle.run(&self.record_based)?;
        cycle.run(&self.query_based)
    }
}

fn build_scope(store: &Arc<dyn UsageStore>, scope: Scope, params: &EngineParams) -> Recommender {
    let include_internal = scope.include_internal_records();
    let item = &params.item_based;
    let case = &params.case_based;

    let persistent_dm: Arc<dyn RecordDataModel> = Arc::new(
        PersistentRecordDataModel::with_weights(Arc::clone(store), include_internal, item.weights),
    );
    let in_memory_dm: Arc<dyn RecordDataModel> =
        Arc::new(InMemoryRecordDataModel::new(Arc::clone(&persistent_dm)));

    let collaborative: Arc<dyn RecordSimilarity> = Arc::new(CollaborativeRecordSimilarity::new(
        Arc::clone(&in_memory_dm),
        Box::new(TimeDecaySimilarity::with_params(
            Box::new(CosineSimilarity),
            item.time_decay,
        )),
    ));
    let imported: Arc<dyn RecordSimilarity> = Arc::new(ImportedSimilarityCache::new(
        Arc::clone(store),
        include_internal,
        item.max_imported_per_record,
    ));
    let combined: Arc<dyn RecordSimilarity> = Arc::new(CombinedRecordSimilarity::new(
        collaborative,
        imported,
        item.collaborative_weight,
    ));
    let record_nhood: Arc<dyn RecordNeighbourhood> = Arc::new(PrecomputedRecordNeighbourhood::new(
        item.neighbourhood_size,
        Arc::clone(&in_memory_dm),
        combined,
    ));
    // The session's own history comes from the persistent model so that a
    // request sees actions reported a moment ago.
    let record_based = Arc::new(RecordBasedRecommender::new(persistent_dm, record_nhood));

    let persistent_qdm: Arc<dyn QueryDataModel> = Arc::new(PersistentQueryDataModel::with_params(
        Arc::clone(store),
        include_internal,
        case.weights,
        case.time_decay,
    ));
    let in_memory_qdm: Arc<dyn QueryDataModel> =
        Arc::new(InMemoryQueryDataModel::new(persistent_qdm));
    let query_sim: Arc<dyn QuerySimilarity> =
        Arc::new(ShingleJaccardSimilarity::new(case.k_shingles));
    let query_nhood: Arc<dyn QueryNeighbourhood> = Arc::new(ThresholdQueryNeighbourhood::new(
        Arc::clone(&in_memory_qdm),
        Arc::clone(&query_sim),
        case.similarity_threshold,
    ));
    let query_based = Arc::new(QueryBasedRecommender::new(
        in_memory_qdm,
        query_nhood,
        query_sim,
        case.scorer.build(),
    ));

    Recommender {
        record_based,
        query_based,
    }
}

/// The recommender instances of every scope.
pub struct RecommenderRegistry {
    recommenders: HashMap<Scope, Recommender>,
}

impl RecommenderRegistry {
    /// Wires the component graphs of all scopes over the store and runs
    /// the initial refresh so the caches start populated.
    pub fn build(store: Arc<dyn UsageStore>, params: &EngineParams) -> anyhow::Result<Self> {
        let recommenders = Scope::ALL
            .into_iter()
            .map(|scope| (scope, build_scope(&store, scope, params)))
            .collect();

        let registry = Self { recommenders };
        registry.refresh_all()?;
        info!(scopes = registry.recommenders.len(), "recommender registry ready");
        Ok(registry)
    }

    #[must_use]
    pub fn get(&self, scope: Scope) -> &Recommender {
        // Both scopes are always present.
        &self.recommenders[&scope]
    }

    /// Rebuilds every cache of every scope in one shared cycle.
    pub fn refresh_all(&self) -> anyhow::Result<()> {
        let mut cycle = RefreshCycle::new();
        for recommender in self.recommenders.values() {
            recommender.refresh_with(&mut cycle)?;
        }
        Ok(())
    }
}
