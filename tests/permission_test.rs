//! Integration tests for the permission cascade.
//!
//! Drives `ModelService::resolve` end to end against the in-memory store,
//! account source and shared cache.

use std::sync::Arc;

use async_trait::async_trait;

use huginn::cache::MemorySharedCache;
use huginn::store::{MemoryAccounts, MemoryModelStore, ModelFilter, ModelSort, ModelStore};
use huginn::types::{App, Key, Model, ModelRecord, ModelStatus, User};
use huginn::{Huginn, HuginnError, ModelResolver, ModelService, Result};

// ============================================================================
// Fixtures
// ============================================================================

const USER: i64 = 1;
const APP: i64 = 10;
const KEY: &str = "sk-test";

fn accounts(user: &[&str], app: &[&str], key: &[&str]) -> MemoryAccounts {
    MemoryAccounts::new()
        .with_user(User::new(USER, user.iter().copied()))
        .with_app(App::new(APP, app.iter().copied()))
        .with_key(Key::new(KEY, APP, key.iter().copied()))
}

fn service(store: MemoryModelStore, accounts: MemoryAccounts) -> (ModelService, Arc<MemorySharedCache>) {
    let shared = Arc::new(MemorySharedCache::new());
    let service = Huginn::builder()
        .model_store(Arc::new(store))
        .accounts(Arc::new(accounts))
        .shared_cache(shared.clone())
        .build()
        .unwrap();
    (service, shared)
}

/// Service whose models are served from the caches only.
async fn cached_service(models: &[Model], accounts: MemoryAccounts) -> ModelService {
    let (service, _) = service(MemoryModelStore::new(), accounts);
    service.save_cache_list(models).await.unwrap();
    service
}

fn gpt(id: &str) -> Model {
    Model::new(id, format!("GPT {id}"), "gpt-4o")
}

// ============================================================================
// Scope precedence
// ============================================================================

#[tokio::test]
async fn user_scope_alone_grants_access() {
    let service = cached_service(&[gpt("a")], accounts(&["a"], &[], &[])).await;

    let model = service.resolve("gpt-4o", USER, APP, KEY).await.unwrap();
    assert_eq!(model.id, "a");
}

#[tokio::test]
async fn key_grant_absent_from_app_scope_is_rejected() {
    let models = [gpt("a"), gpt("b")];
    let service = cached_service(&models, accounts(&["a", "b"], &["b"], &["a"])).await;

    let err = service.resolve("gpt-4o", USER, APP, KEY).await.unwrap_err();
    assert!(matches!(err, HuginnError::ModelNotFound(_)));
}

#[tokio::test]
async fn key_grant_absent_from_user_scope_is_rejected() {
    let models = [gpt("a"), gpt("b")];
    let service = cached_service(&models, accounts(&["b"], &[], &["a"])).await;

    let err = service.resolve("gpt-4o", USER, APP, KEY).await.unwrap_err();
    assert!(matches!(err, HuginnError::ModelNotFound(_)));
}

#[tokio::test]
async fn narrowest_scope_picks_among_shared_grants() {
    let models = [gpt("a"), gpt("b"), gpt("c")];
    let service = cached_service(&models, accounts(&["a", "b", "c"], &["b", "c"], &["c"])).await;

    let model = service.resolve("gpt-4o", USER, APP, KEY).await.unwrap();
    assert_eq!(model.id, "c");
}

#[tokio::test]
async fn app_scope_restricts_when_key_declares_nothing() {
    let models = [gpt("a"), gpt("b")];
    let service = cached_service(&models, accounts(&["a", "b"], &["b"], &[])).await;

    let model = service.resolve("gpt-4o", USER, APP, KEY).await.unwrap();
    assert_eq!(model.id, "b");
}

#[tokio::test]
async fn key_scope_without_matching_candidate_is_rejected() {
    let models = [gpt("a"), Model::new("c", "Claude", "claude")];
    let service = cached_service(&models, accounts(&["a", "c"], &[], &["c"])).await;

    let err = service.resolve("gpt-4o", USER, APP, KEY).await.unwrap_err();
    assert!(matches!(err, HuginnError::ModelNotFound(_)));
}

// ============================================================================
// Matching and status
// ============================================================================

#[tokio::test]
async fn display_name_match_wins_over_identifier_match() {
    let models = [
        Model::new("by-id", "Other", "gpt-4o"),
        Model::new("by-name", "gpt-4o", "gpt-4o-2024-08-06"),
    ];
    let service = cached_service(&models, accounts(&["by-id", "by-name"], &[], &[])).await;

    let model = service.resolve("gpt-4o", USER, APP, KEY).await.unwrap();
    assert_eq!(model.id, "by-name");
}

#[tokio::test]
async fn disabled_only_candidate_reports_disabled() {
    let models = [gpt("a").with_status(ModelStatus::Disabled)];
    let service = cached_service(&models, accounts(&["a"], &[], &[])).await;

    let err = service.resolve("gpt-4o", USER, APP, KEY).await.unwrap_err();
    assert!(matches!(err, HuginnError::ModelDisabled(ref m) if m == "gpt-4o"));
}

#[tokio::test]
async fn disabled_candidate_is_skipped_for_enabled_one() {
    let models = [gpt("a").with_status(ModelStatus::Disabled), gpt("b")];
    let service = cached_service(&models, accounts(&["a", "b"], &[], &[])).await;

    let model = service.resolve("gpt-4o", USER, APP, KEY).await.unwrap();
    assert_eq!(model.id, "b");
}

#[tokio::test]
async fn disabled_at_key_scope_reports_disabled() {
    let models = [gpt("a").with_status(ModelStatus::Disabled), gpt("b")];
    let service = cached_service(&models, accounts(&["a", "b"], &[], &["a"])).await;

    let err = service.resolve("gpt-4o", USER, APP, KEY).await.unwrap_err();
    assert!(matches!(err, HuginnError::ModelDisabled(_)));
}

#[tokio::test]
async fn unknown_model_name_is_not_found() {
    let service = cached_service(&[gpt("a")], accounts(&["a"], &[], &[])).await;

    let err = service.resolve("claude", USER, APP, KEY).await.unwrap_err();
    assert!(matches!(err, HuginnError::ModelNotFound(_)));
    assert!(err.is_authorization());
}

#[tokio::test]
async fn user_without_models_is_not_found() {
    let service = cached_service(&[gpt("a")], accounts(&[], &["a"], &["a"])).await;

    let err = service.resolve("gpt-4o", USER, APP, KEY).await.unwrap_err();
    assert!(matches!(err, HuginnError::ModelNotFound(_)));
}

#[tokio::test]
async fn unknown_account_is_not_found() {
    let service = cached_service(&[gpt("a")], accounts(&["a"], &[], &[])).await;

    let err = service.resolve("gpt-4o", 99, APP, KEY).await.unwrap_err();
    assert!(matches!(err, HuginnError::ModelNotFound(ref m) if m == "gpt-4o"));

    let err = service.resolve("gpt-4o", USER, APP, "sk-unknown").await.unwrap_err();
    assert!(matches!(err, HuginnError::ModelNotFound(_)));
    assert!(!err.to_string().contains("sk-unknown"));
}

// ============================================================================
// Store fallback
// ============================================================================

#[tokio::test]
async fn cold_caches_refill_from_store() {
    let store = MemoryModelStore::new().with_records([
        ModelRecord::new(gpt("a")).updated_at(1),
        ModelRecord::new(gpt("b")).updated_at(2),
    ]);
    let (service, shared) = service(store, accounts(&["a", "b"], &[], &[]));

    let model = service.resolve("gpt-4o", USER, APP, KEY).await.unwrap();
    // Refill is ordered newest first.
    assert_eq!(model.id, "b");

    assert!(shared.raw("api:models", "a").await.is_some());
    assert!(shared.raw("api:models", "b").await.is_some());
    assert_eq!(service.get_cache_model("a").await.unwrap(), gpt("a"));
}

#[tokio::test]
async fn partial_cache_hit_refills_from_store() {
    let store = MemoryModelStore::new().with_records([
        ModelRecord::new(gpt("a")),
        ModelRecord::new(Model::new("c", "Claude", "claude")),
    ]);
    let (service, _) = service(store, accounts(&["a", "c"], &[], &[]));
    service.save_cache_list(&[gpt("a")]).await.unwrap();

    let model = service.resolve("claude", USER, APP, KEY).await.unwrap();
    assert_eq!(model.id, "c");
    assert!(service.get_cache_model("c").await.is_ok());
}

#[tokio::test]
async fn store_refill_ignores_inactive_records() {
    let store = MemoryModelStore::new()
        .with_records([ModelRecord::new(gpt("a").with_status(ModelStatus::Disabled))]);
    let (service, _) = service(store, accounts(&["a"], &[], &[]));

    let err = service.resolve("gpt-4o", USER, APP, KEY).await.unwrap_err();
    assert!(matches!(err, HuginnError::ModelNotFound(_)));
}

/// Store whose connection is always refused.
struct UnreachableStore;

#[async_trait]
impl ModelStore for UnreachableStore {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn find_one(&self, _filter: &ModelFilter) -> Result<Option<ModelRecord>> {
        Err(HuginnError::StoreUnavailable("mongodb://10.0.0.5:27017 connection refused".into()))
    }

    async fn find_many(&self, _filter: &ModelFilter, _sort: ModelSort) -> Result<Vec<ModelRecord>> {
        Err(HuginnError::StoreUnavailable("mongodb://10.0.0.5:27017 connection refused".into()))
    }
}

#[tokio::test]
async fn store_failure_is_reported_as_not_found() {
    let service = Huginn::builder()
        .model_store(Arc::new(UnreachableStore))
        .accounts(Arc::new(accounts(&["a"], &[], &[])))
        .shared_cache(Arc::new(MemorySharedCache::new()))
        .build()
        .unwrap();

    let err = service.resolve("gpt-4o", USER, APP, KEY).await.unwrap_err();
    assert!(matches!(err, HuginnError::ModelNotFound(ref m) if m == "gpt-4o"));
    assert!(err.is_authorization());
    assert!(!err.to_string().contains("mongodb"));
}
