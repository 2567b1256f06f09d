//! Running the engine over an ingested log and printing results.

use covis_config::Config;
use covis_core::UsageStore;
use covis_engine::{Recommender, RecommenderRegistry, Scope};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use super::ingest::load_store;

const fn scope_for(internal: bool) -> Scope {
    if internal {
        Scope::Internal
    } else {
        Scope::Public
    }
}

fn with_recommender<T, F>(
    log: &Path,
    config: &Config,
    internal: bool,
    request: F,
) -> anyhow::Result<T>
where
    F: FnOnce(&Recommender) -> anyhow::Result<T>,
{
    let (store, _) = load_store(log, config)?;
    let registry =
        RecommenderRegistry::build(store as Arc<dyn UsageStore>, &config.engine)?;
    request(registry.get(scope_for(internal)))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn recommend(
    log: &Path,
    config: &Config,
    session_id: &str,
    count: Option<usize>,
    internal: bool,
) -> anyhow::Result<()> {
    let scored = with_recommender(log, config, internal, |recommender| {
        recommender.recommend_from_history(session_id, count)
    })?;
    print_json(&scored)
}

pub fn similar(
    log: &Path,
    config: &Config,
    record_id: &str,
    count: Option<usize>,
    internal: bool,
) -> anyhow::Result<()> {
    let scored = with_recommender(log, config, internal, |recommender| {
        recommender.most_similar_records(record_id, count)
    })?;
    print_json(&scored)
}

pub fn search(
    log: &Path,
    config: &Config,
    query: &str,
    count: Option<usize>,
    internal: bool,
) -> anyhow::Result<()> {
    let recommendations = with_recommender(log, config, internal, |recommender| {
        recommender.recommend_search_results(query, count)
    })?;
    print_json(&recommendations)
}

pub fn queries(log: &Path, config: &Config, query: &str, internal: bool) -> anyhow::Result<()> {
    let related = with_recommender(log, config, internal, |recommender| {
        recommender.similar_queries(query)
    })?;
    print_json(&related)
}
