//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::future::Future;
use std::sync::Arc;

use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use huginn::cache::MemorySharedCache;
use huginn::store::{MemoryAccounts, MemoryModelStore};
use huginn::telemetry;
use huginn::types::{App, ForwardConfig, Key, Model, ModelRecord, ModelStatus, User};
use huginn::{Huginn, ModelResolver, ModelService};

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Sum counter values for a metric carrying the given label.
fn counter_with_label(snapshot: &SnapshotVec, name: &str, label: (&str, &str)) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter
                && key.key().name() == name
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == label.0 && l.value() == label.1)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` keeps the sync `with_local_recorder` closure on the
/// current thread while `block_on` drives the inner async work.
fn recorded<F: Future>(fut: F) -> (F::Output, SnapshotVec) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let output = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(fut))
    });
    (output, snapshotter.snapshot().into_vec())
}

fn service(store: MemoryModelStore, user_models: &[&str]) -> ModelService {
    let accounts = MemoryAccounts::new()
        .with_user(User::new(1, user_models.iter().copied()))
        .with_app(App::new(2, Vec::<String>::new()))
        .with_key(Key::new("sk", 2, Vec::<String>::new()));
    Huginn::builder()
        .model_store(Arc::new(store))
        .accounts(Arc::new(accounts))
        .shared_cache(Arc::new(MemorySharedCache::new()))
        .build()
        .unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn cold_resolution_records_fallback_and_outcome() {
    let store = MemoryModelStore::new().with_records([ModelRecord::new(Model::new("a", "A", "a"))]);
    let service = service(store, &["a"]);

    let (result, snapshot) = recorded(service.resolve("a", 1, 2, "sk"));
    assert!(result.is_ok());

    assert_eq!(
        counter_with_label(&snapshot, telemetry::STORE_FALLBACKS_TOTAL, ("scope", "user")),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::CACHE_MISSES_TOTAL, ("tier", "local")),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::RESOLUTIONS_TOTAL, ("outcome", "ok")),
        1
    );
    assert!(
        has_histogram(&snapshot, telemetry::RESOLUTION_DURATION_SECONDS),
        "expected a duration histogram entry"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn warm_resolution_hits_local_tier() {
    let service = service(MemoryModelStore::new(), &["a"]);
    service
        .save_cache_list(&[Model::new("a", "A", "a")])
        .await
        .unwrap();

    let (result, snapshot) = recorded(service.resolve("a", 1, 2, "sk"));
    assert!(result.is_ok());

    assert_eq!(
        counter_with_label(&snapshot, telemetry::CACHE_HITS_TOTAL, ("tier", "local")),
        1
    );
    assert_eq!(counter_total(&snapshot, telemetry::STORE_FALLBACKS_TOTAL), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn rejected_resolution_records_outcome() {
    let service = service(MemoryModelStore::new(), &["a"]);
    service
        .save_cache_list(&[Model::new("a", "A", "a").with_status(ModelStatus::Disabled)])
        .await
        .unwrap();

    let (result, snapshot) = recorded(service.resolve("a", 1, 2, "sk"));
    assert!(result.is_err());

    assert_eq!(
        counter_with_label(&snapshot, telemetry::RESOLUTIONS_TOTAL, ("outcome", "disabled")),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn failed_resolution_records_error_outcome() {
    let service = service(MemoryModelStore::new(), &["a"]);

    let (result, snapshot) = recorded(service.resolve("a", 99, 2, "sk"));
    assert!(result.is_err());

    assert_eq!(
        counter_with_label(&snapshot, telemetry::RESOLUTIONS_TOTAL, ("outcome", "error")),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn forwarding_records_hops() {
    let service = service(MemoryModelStore::new(), &[]);
    let a = Model::new("a", "a", "a").with_forward(ForwardConfig::fixed("b"));
    let b = Model::new("b", "b", "b").with_forward(ForwardConfig::fixed("c"));
    service
        .save_cache_list(&[b, Model::new("c", "c", "c")])
        .await
        .unwrap();

    let (result, snapshot) = recorded(service.resolve_target(a, ""));
    assert_eq!(result.unwrap().id, "c");
    assert_eq!(counter_total(&snapshot, telemetry::FORWARD_HOPS_TOTAL), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn change_events_are_counted_by_status() {
    let service = service(MemoryModelStore::new(), &[]);
    let subscriber = service.change_feed_subscriber();

    let (_, snapshot) = recorded(async {
        subscriber
            .on_message(r#"{"action":"update","new_data":{"id":"a"}}"#)
            .await;
        subscriber.on_message("garbage").await;
    });

    assert_eq!(
        counter_with_label(&snapshot, telemetry::CHANGE_EVENTS_TOTAL, ("status", "ok")),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::CHANGE_EVENTS_TOTAL, ("status", "error")),
        1
    );
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let service = service(MemoryModelStore::new(), &["a"]);
    let _ = service.resolve("a", 1, 2, "sk").await;
}
