//! End-to-end tests of the item-based strategy over the embedded store.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::Utc;
use covis_core::{ActionType, ReportedAction, UsageRecorder, UsageStore};
use covis_engine::{EngineParams, RecommenderRegistry, Scope};
use covis_store::MemoryStore;

fn view(record: &str, session: &str) -> ReportedAction {
    ReportedAction {
        record_id: record.to_string(),
        is_internal_record: false,
        session_id: session.to_string(),
        action_type: ActionType::View,
        query: None,
        timestamp: Utc::now(),
    }
}

fn seed_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    // a and b are used together by two sessions; c only ever appears
    // alone.
    for (record, session) in [
        ("doc_a", "s1"),
        ("doc_b", "s1"),
        ("doc_a", "s2"),
        ("doc_b", "s2"),
        ("doc_b", "s3"),
        ("doc_c", "s3"),
        ("doc_a", "s4"),
    ] {
        store.report_action(&view(record, session)).unwrap();
    }
    Arc::new(store)
}

fn registry_over(store: &Arc<MemoryStore>) -> RecommenderRegistry {
    let store: Arc<dyn UsageStore> = Arc::clone(store) as Arc<dyn UsageStore>;
    RecommenderRegistry::build(store, &EngineParams::default()).unwrap()
}

#[test]
fn history_expands_into_co_used_records() {
    let store = seed_store();
    let registry = registry_over(&store);
    let recommender = registry.get(Scope::Public);

    // s4 has only seen doc_a; doc_b is its strongest co-used record.
    let recommendations = recommender.recommend_from_history("s4", None).unwrap();

    assert!(!recommendations.is_empty());
    assert_eq!(recommendations[0].record_id, "doc_b");
    assert!(
        !recommendations
            .iter()
            .any(|scored| scored.record_id == "doc_a"),
        "already preferred records must not come back"
    );
}

#[test]
fn most_similar_records_ranks_co_usage() {
    let store = seed_store();
    let registry = registry_over(&store);
    let recommender = registry.get(Scope::Public);

    let similar = recommender.most_similar_records("doc_a", None).unwrap();

    assert!(!similar.is_empty());
    assert_eq!(similar[0].record_id, "doc_b");
    assert!(
        !similar.iter().any(|scored| scored.record_id == "doc_a"),
        "a record is not its own neighbour"
    );
}

#[test]
fn unknown_session_and_record_yield_empty_results() {
    let store = seed_store();
    let registry = registry_over(&store);
    let recommender = registry.get(Scope::Public);

    assert!(recommender.recommend_from_history("nobody", None).unwrap().is_empty());
    assert!(recommender.most_similar_records("missing", None).unwrap().is_empty());
}

#[test]
fn max_count_truncates_the_ranking() {
    let store = seed_store();
    let registry = registry_over(&store);
    let recommender = registry.get(Scope::Public);

    let similar = recommender.most_similar_records("doc_b", Some(1)).unwrap();
    assert_eq!(similar.len(), 1);
}

#[test]
fn deactivated_records_leave_the_recommendations_after_a_refresh() {
    let store = seed_store();
    let registry = registry_over(&store);

    store.set_record_active("doc_b", false).unwrap();
    registry.refresh_all().unwrap();

    let recommender = registry.get(Scope::Public);
    let recommendations = recommender.recommend_from_history("s4", None).unwrap();
    assert!(
        !recommendations
            .iter()
            .any(|scored| scored.record_id == "doc_b"),
        "inactive records must not be recommended"
    );

    // Reactivation brings the history back; nothing was deleted.
    store.set_record_active("doc_b", true).unwrap();
    registry.refresh_all().unwrap();
    let recommendations = recommender.recommend_from_history("s4", None).unwrap();
    assert_eq!(recommendations[0].record_id, "doc_b");
}

#[test]
fn internal_records_are_recommended_only_internally() {
    let store = seed_store();
    let mut internal_view = view("doc_secret", "s1");
    internal_view.is_internal_record = true;
    store.report_action(&internal_view).unwrap();
    let mut internal_view = view("doc_secret", "s2");
    internal_view.is_internal_record = true;
    store.report_action(&internal_view).unwrap();

    let registry = registry_over(&store);

    let public = registry
        .get(Scope::Public)
        .most_similar_records("doc_a", None)
        .unwrap();
    assert!(
        !public.iter().any(|scored| scored.record_id == "doc_secret"),
        "internal records must stay out of the public scope"
    );

    let internal = registry
        .get(Scope::Internal)
        .most_similar_records("doc_a", None)
        .unwrap();
    assert!(
        internal.iter().any(|scored| scored.record_id == "doc_secret"),
        "internal scope sees internal records"
    );
}

#[test]
fn imported_similarities_back_up_missing_co_usage() {
    let store = seed_store();
    // doc_a and doc_c share no session, so the collaborative signal between
    // them is zero; the imported similarity carries the pair instead.
    store
        .import_record_similarity(&covis_core::SimilarityImport {
            from_record_id: "doc_a".to_string(),
            from_is_internal: false,
            to_record_id: "doc_c".to_string(),
            to_is_internal: false,
            similarity: 0.9,
        })
        .unwrap();

    let registry = registry_over(&store);
    let similar = registry
        .get(Scope::Public)
        .most_similar_records("doc_a", None)
        .unwrap();

    let imported = similar
        .iter()
        .find(|scored| scored.record_id == "doc_c")
        .expect("imported similarity should surface");
    // Scaled by the weight of the imported side of the blend.
    assert!((imported.score - 0.25 * 0.9).abs() < 1e-9);
}
