// tests/cache_tests.rs

mod common;

use std::sync::Arc;

use logisticare::{
    cache::ContentCache,
    error::AppError,
    llm::LlmService,
    models::answer::UserAnswer,
    store::{Collection, Store},
};

use common::{Calls, MockLlm, multiple_choice};

async fn setup() -> (Store, Arc<MockLlm>, ContentCache, i64) {
    let store = Store::open_in_memory().await.expect("Failed to open in-memory store");
    let llm = MockLlm::new();
    let llm_dyn: Arc<dyn LlmService> = llm.clone();
    let cache = ContentCache::new(store.clone(), llm_dyn);
    let id = store
        .questions()
        .put(&multiple_choice("Distribution", "Siapa yang menerima barang?", 0))
        .await
        .unwrap();
    (store, llm, cache, id)
}

#[tokio::test]
async fn explanation_is_generated_once_per_answer() {
    let (store, llm, cache, id) = setup().await;
    let question = store.questions().get(id).await.unwrap();
    let wrong = UserAnswer::SelectedIndex(2);

    let first = cache.explanation(&question, &wrong).await.unwrap();
    let second = cache.explanation(&question, &wrong).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(Calls::get(&llm.calls.explanation), 1);

    cache
        .explanation(&question, &UserAnswer::SelectedIndex(0))
        .await
        .unwrap();
    assert_eq!(Calls::get(&llm.calls.explanation), 2);
    assert_eq!(store.count_all(Collection::CachedExplanations).await.unwrap(), 2);
}

#[tokio::test]
async fn failures_are_not_cached() {
    let (store, llm, cache, id) = setup().await;

    llm.fail(true);
    let failed = cache.hint_for(id).await;
    assert!(matches!(failed, Err(AppError::GenerationFailed(_))));
    assert_eq!(store.count_all(Collection::CachedHints).await.unwrap(), 0);

    llm.fail(false);
    cache.hint_for(id).await.unwrap();
    cache.hint_for(id).await.unwrap();
    assert_eq!(Calls::get(&llm.calls.hint), 2);
}

#[tokio::test]
async fn invalidate_forces_regeneration() {
    let (_store, llm, cache, id) = setup().await;
    let answer = UserAnswer::SelectedIndex(1);

    cache.explanation_for(id, &answer).await.unwrap();
    cache.hint_for(id).await.unwrap();
    cache.invalidate(id).await.unwrap();
    cache.explanation_for(id, &answer).await.unwrap();
    cache.hint_for(id).await.unwrap();

    assert_eq!(Calls::get(&llm.calls.explanation), 2);
    assert_eq!(Calls::get(&llm.calls.hint), 2);
}

#[tokio::test]
async fn mismatched_answer_is_rejected_before_generation() {
    let (_store, llm, cache, id) = setup().await;

    let result = cache.explanation_for(id, &UserAnswer::BooleanChoice(true)).await;
    assert!(matches!(result, Err(AppError::ValidationFailed(_))));
    assert!(matches!(
        cache.hint_for(999).await,
        Err(AppError::NotFound(_))
    ));
    assert_eq!(Calls::get(&llm.calls.explanation), 0);
    assert_eq!(Calls::get(&llm.calls.hint), 0);
}

#[tokio::test]
async fn failed_write_still_returns_the_value() {
    let (store, llm, cache, id) = setup().await;
    sqlx::query(
        "CREATE TRIGGER reject_hints BEFORE INSERT ON cached_hints \
         BEGIN SELECT RAISE(ABORT, 'read only'); END",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let hint = cache.hint_for(id).await.unwrap();
    assert!(hint.contains("Distribution"));
    assert_eq!(store.count_all(Collection::CachedHints).await.unwrap(), 0);

    cache.hint_for(id).await.unwrap();
    assert_eq!(Calls::get(&llm.calls.hint), 2);
}
