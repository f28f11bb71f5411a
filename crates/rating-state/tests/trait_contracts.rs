//! Trait contract tests for SessionStore.
//!
//! Every backend runs the same checks. Any conforming implementation must
//! pass these.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rating_state::{
    Criterion, MemorySessionStore, Ratings, Score, SessionStore, SqliteSessionStore,
    SurrealSessionStore,
};

async fn memory_store() -> Arc<dyn SessionStore> {
    Arc::new(MemorySessionStore::new())
}

async fn sqlite_store() -> Arc<dyn SessionStore> {
    Arc::new(SqliteSessionStore::in_memory().expect("sqlite in-memory"))
}

async fn surreal_store() -> Arc<dyn SessionStore> {
    Arc::new(
        SurrealSessionStore::in_memory()
            .await
            .expect("surrealdb mem://"),
    )
}

fn sample_criteria() -> Vec<Criterion> {
    vec![
        Criterion::new("clarity", "Clarity", 1.0).with_description("How clear it was."),
        Criterion::new("content", "Content Quality", 2.0),
    ]
}

fn ratings(clarity: Score, content: Score) -> Ratings {
    let mut r = Ratings::new();
    r.insert("clarity".to_string(), clarity);
    r.insert("content".to_string(), content);
    r
}

// ===========================================================================
// Contract checks
// ===========================================================================

async fn create_returns_empty_session(store: &dyn SessionStore) {
    let session = store
        .create_session("Alice", "Teacher", sample_criteria())
        .await
        .unwrap();

    assert!(session.evaluations.is_empty());
    assert!(session.id.starts_with("session_"));
    assert_eq!(session.criteria, sample_criteria());
}

async fn create_generates_unique_ids(store: &dyn SessionStore) {
    let mut ids = HashSet::new();
    for i in 0..20 {
        let s = store
            .create_session(&format!("Presenter {i}"), "Teacher", sample_criteria())
            .await
            .unwrap();
        assert!(ids.insert(s.id), "duplicate session id");
    }
}

async fn create_trims_names(store: &dyn SessionStore) {
    let session = store
        .create_session("  Alice  ", "\tTeacher\n", sample_criteria())
        .await
        .unwrap();
    assert_eq!(session.presenter, "Alice");
    assert_eq!(session.created_by, "Teacher");

    let loaded = store.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(loaded.presenter, "Alice");
    assert_eq!(loaded.created_by, "Teacher");
}

async fn get_round_trip(store: &dyn SessionStore) {
    let created = store
        .create_session("Alice", "Teacher", sample_criteria())
        .await
        .unwrap();
    let loaded = store.get_session(&created.id).await.unwrap();
    assert_eq!(loaded, Some(created));
}

async fn get_unknown_is_none(store: &dyn SessionStore) {
    let loaded = store.get_session("session_missing_000000").await.unwrap();
    assert!(loaded.is_none());
}

async fn evaluations_append_in_order(store: &dyn SessionStore) {
    let session = store
        .create_session("Alice", "Teacher", sample_criteria())
        .await
        .unwrap();

    let evaluators = ["Bob", "Carol", "Dave", "Erin"];
    let mut last = None;
    for (i, name) in evaluators.iter().enumerate() {
        let score = (i % 5) as Score + 1;
        last = store
            .add_evaluation_to_session(&session.id, name, ratings(score, score), score as f64)
            .await
            .unwrap();
        let updated = last.as_ref().expect("session exists");
        assert_eq!(updated.evaluations.len(), i + 1);
    }

    let updated = last.unwrap();
    let names: Vec<&str> = updated
        .evaluations
        .iter()
        .map(|e| e.evaluator.as_str())
        .collect();
    assert_eq!(names, evaluators);

    let reloaded = store.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(reloaded.evaluations, updated.evaluations);

    let ids: HashSet<&str> = reloaded.evaluations.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids.len(), evaluators.len());
    assert!(reloaded.evaluations.iter().all(|e| e.id.starts_with("eval_")));
}

async fn evaluation_keeps_score_and_ratings(store: &dyn SessionStore) {
    let session = store
        .create_session("Alice", "Teacher", sample_criteria())
        .await
        .unwrap();
    let overall = 14.0 / 3.0;
    let updated = store
        .add_evaluation_to_session(&session.id, "  Bob ", ratings(4, 5), overall)
        .await
        .unwrap()
        .unwrap();

    let eval = &updated.evaluations[0];
    assert_eq!(eval.evaluator, "Bob");
    assert_eq!(eval.ratings, ratings(4, 5));
    assert!((eval.overall_score - overall).abs() < 1e-9);
}

async fn add_evaluation_to_unknown_is_none(store: &dyn SessionStore) {
    let result = store
        .add_evaluation_to_session("session_missing_000000", "Bob", ratings(3, 3), 3.0)
        .await
        .unwrap();
    assert!(result.is_none());
}

async fn delete_then_get_is_none(store: &dyn SessionStore) {
    let session = store
        .create_session("Alice", "Teacher", sample_criteria())
        .await
        .unwrap();
    store
        .add_evaluation_to_session(&session.id, "Bob", ratings(5, 1), 3.0)
        .await
        .unwrap();

    assert!(store.delete_session(&session.id).await.unwrap());
    assert!(store.get_session(&session.id).await.unwrap().is_none());
    assert!(store
        .list_sessions()
        .await
        .unwrap()
        .iter()
        .all(|s| s.id != session.id));
}

async fn delete_unknown_is_false(store: &dyn SessionStore) {
    assert!(!store.delete_session("session_missing_000000").await.unwrap());
}

async fn list_is_newest_first(store: &dyn SessionStore) {
    let mut created = Vec::new();
    for name in ["First", "Second", "Third"] {
        created.push(
            store
                .create_session(name, "Teacher", sample_criteria())
                .await
                .unwrap(),
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let listed = store.list_sessions().await.unwrap();
    let presenters: Vec<&str> = listed.iter().map(|s| s.presenter.as_str()).collect();
    assert_eq!(presenters, vec!["Third", "Second", "First"]);
}

/// Back-to-back creates often share a microsecond timestamp. Ties must still
/// list in reverse insertion order.
async fn rapid_creates_list_in_reverse_insertion_order(store: &dyn SessionStore) {
    let mut ids = Vec::new();
    for i in 0..8 {
        let session = store
            .create_session(&format!("Presenter {i}"), "Teacher", sample_criteria())
            .await
            .unwrap();
        ids.push(session.id);
    }
    ids.reverse();

    let listed: Vec<String> = store
        .list_sessions()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(listed, ids);
}

async fn list_includes_evaluations(store: &dyn SessionStore) {
    let session = store
        .create_session("Alice", "Teacher", sample_criteria())
        .await
        .unwrap();
    store
        .add_evaluation_to_session(&session.id, "Bob", ratings(2, 4), 10.0 / 3.0)
        .await
        .unwrap();

    let listed = store.list_sessions().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].evaluations.len(), 1);
}

async fn ensure_ready_is_idempotent(store: &dyn SessionStore) {
    store.ensure_ready().await.unwrap();
    store.ensure_ready().await.unwrap();
    assert!(store.list_sessions().await.unwrap().is_empty());
}

// ===========================================================================
// One module per backend
// ===========================================================================

macro_rules! session_store_contract {
    ($backend:ident, $make:path) => {
        mod $backend {
            use super::*;

            #[tokio::test]
            async fn create_returns_empty_session() {
                super::create_returns_empty_session(&*$make().await).await;
            }

            #[tokio::test]
            async fn create_generates_unique_ids() {
                super::create_generates_unique_ids(&*$make().await).await;
            }

            #[tokio::test]
            async fn create_trims_names() {
                super::create_trims_names(&*$make().await).await;
            }

            #[tokio::test]
            async fn get_round_trip() {
                super::get_round_trip(&*$make().await).await;
            }

            #[tokio::test]
            async fn get_unknown_is_none() {
                super::get_unknown_is_none(&*$make().await).await;
            }

            #[tokio::test]
            async fn evaluations_append_in_order() {
                super::evaluations_append_in_order(&*$make().await).await;
            }

            #[tokio::test]
            async fn evaluation_keeps_score_and_ratings() {
                super::evaluation_keeps_score_and_ratings(&*$make().await).await;
            }

            #[tokio::test]
            async fn add_evaluation_to_unknown_is_none() {
                super::add_evaluation_to_unknown_is_none(&*$make().await).await;
            }

            #[tokio::test]
            async fn delete_then_get_is_none() {
                super::delete_then_get_is_none(&*$make().await).await;
            }

            #[tokio::test]
            async fn delete_unknown_is_false() {
                super::delete_unknown_is_false(&*$make().await).await;
            }

            #[tokio::test]
            async fn list_is_newest_first() {
                super::list_is_newest_first(&*$make().await).await;
            }

            #[tokio::test]
            async fn rapid_creates_list_in_reverse_insertion_order() {
                super::rapid_creates_list_in_reverse_insertion_order(&*$make().await).await;
            }

            #[tokio::test]
            async fn list_includes_evaluations() {
                super::list_includes_evaluations(&*$make().await).await;
            }

            #[tokio::test]
            async fn ensure_ready_is_idempotent() {
                super::ensure_ready_is_idempotent(&*$make().await).await;
            }
        }
    };
}

session_store_contract!(memory, memory_store);
session_store_contract!(sqlite, sqlite_store);
session_store_contract!(surreal, surreal_store);
