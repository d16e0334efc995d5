//! Serialized command service under concurrent front ends

use std::collections::BTreeSet;
use std::time::Duration;

use focus_core::{
    FilterService, FilterSync, MemoryEngine, MemoryStore, Phase, Request, RuleId,
};
use focus_test_utils::{DelayedStore, FailingStore, snapshot_with};
use serde_json::{Value, json};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_get_unique_sequential_ids() {
    let store = MemoryStore::new();
    let engine = MemoryEngine::new();
    let (handle, _task) = FilterService::spawn(FilterSync::new(store.clone(), engine.clone()));

    let mut joins = Vec::new();
    for n in 0..40 {
        let handle = handle.clone();
        joins.push(tokio::spawn(async move {
            handle.add(format!("site{}.com", n)).await.unwrap().id
        }));
    }
    let mut ids = BTreeSet::new();
    for join in joins {
        assert!(ids.insert(join.await.unwrap()), "duplicate id allocated");
    }

    let expected: BTreeSet<RuleId> = (1..=40).collect();
    assert_eq!(ids, expected);

    let persisted: BTreeSet<RuleId> = store
        .current()
        .unwrap()
        .filters
        .iter()
        .map(|f| f.id)
        .collect();
    assert_eq!(persisted, expected);
    assert_eq!(engine.active_ids().len(), 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_toggles_leave_mirror_consistent() {
    let engine = MemoryEngine::new();
    let (handle, _task) =
        FilterService::spawn(FilterSync::new(MemoryStore::new(), engine.clone()));
    for n in 0..10 {
        handle.add(format!("site{}.com", n)).await.unwrap();
    }

    let mut joins = Vec::new();
    for id in 1..=10u32 {
        for _ in 0..3 {
            let handle = handle.clone();
            joins.push(tokio::spawn(async move { handle.toggle(id).await.unwrap() }));
        }
    }
    for join in joins {
        join.await.unwrap();
    }

    // Three flips each: every rule ends disabled
    let rules = handle.list().await.unwrap();
    assert!(rules.iter().all(|r| !r.enabled));
    assert!(engine.active_ids().is_empty());
    assert!(handle.check().await.unwrap().is_healthy());
}

#[tokio::test]
async fn test_commands_sent_while_loading_are_queued() {
    let inner = MemoryStore::with_snapshot(snapshot_with(&[(4, "a.com", true)]));
    let store = DelayedStore::new(inner, Duration::from_millis(100));
    let (handle, _task) = FilterService::spawn(FilterSync::new(store, MemoryEngine::new()));

    // Sent immediately, before reconciliation can have finished
    let rule = handle.add("b.com").await.unwrap();

    assert_eq!(rule.id, 5);
    assert_eq!(handle.phase(), Phase::Ready);
}

#[tokio::test]
async fn test_ready_waits_for_startup() {
    let store = DelayedStore::new(MemoryStore::new(), Duration::from_millis(50));
    let (handle, _task) = FilterService::spawn(FilterSync::new(store, MemoryEngine::new()));

    handle.ready().await.unwrap();
    assert_eq!(handle.phase(), Phase::Ready);
}

#[tokio::test]
async fn test_failed_startup_is_retried_by_next_command() {
    let store = FailingStore::with_snapshot(snapshot_with(&[(1, "a.com", true)]));
    store.fail_loads(true);
    let (handle, _task) = FilterService::spawn(FilterSync::new(store.clone(), MemoryEngine::new()));

    let first = handle.dispatch(json!({"type": "GET_FILTERS"})).await;
    assert!(first["error"].as_str().unwrap().contains("loading"));

    store.fail_loads(false);
    let second = handle.dispatch(json!({"type": "GET_FILTERS"})).await;
    assert_eq!(second.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_persistence_failure_is_reported_over_the_wire() {
    let store = FailingStore::new();
    let (handle, _task) = FilterService::spawn(FilterSync::new(store.clone(), MemoryEngine::new()));
    handle.ready().await.unwrap();
    store.fail_saves(true);

    let reply = handle
        .dispatch(json!({"type": "ADD_FILTER", "pattern": "a.com"}))
        .await;

    assert!(reply["error"].as_str().unwrap().starts_with("Persistence failed"));
    assert_eq!(handle.list().await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_wire_scenario_add_toggle_list_clear() {
    let (handle, _task) = FilterService::spawn(FilterSync::new(MemoryStore::new(), MemoryEngine::new()));

    handle.dispatch(json!({"type": "ADD_FILTER", "pattern": "a.com"})).await;
    handle.dispatch(json!({"type": "ADD_FILTER", "pattern": "b.com"})).await;
    let toggled = handle.dispatch(json!({"type": "TOGGLE_FILTER", "id": 1})).await;
    assert_eq!(toggled["enabled"], false);

    let listed = handle.dispatch(json!({"type": "GET_FILTERS"})).await;
    let enabled: Vec<bool> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["enabled"].as_bool().unwrap())
        .collect();
    assert_eq!(enabled, vec![false, true]);

    let check = handle.dispatch(json!({"type": "CHECK_SYNC"})).await;
    assert_eq!(check["status"], "healthy");

    let cleared = handle.dispatch(json!({"type": "CLEAR_ALL"})).await;
    assert_eq!(cleared, Value::Null);
    let listed = handle.dispatch(serde_json::to_value(Request::GetFilters).unwrap()).await;
    assert_eq!(listed, json!([]));
}
