//! Restart and reconciliation against the file-backed store and ruleset
//!
//! Each test plays one process incarnation after another over the same
//! directory, the way focusd sees its files across crashes and restarts.

use std::fs;
use std::path::Path;

use focus_core::{Config, FileStore, FilterSync, Phase, RuleId, RuleStore, Settings, Snapshot};
use focus_test_utils::{FailingEngine, rule_at, snapshot_with};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::tempdir;

fn config_in(dir: &Path) -> Config {
    let mut config = Config::default();
    config.storage.path = dir.join("filters.toml");
    config.enforcement.ruleset_path = dir.join("ruleset.json");
    config
}

async fn boot(config: &Config) -> FilterSync {
    let mut sync = config.build_sync().await.unwrap();
    sync.start().await.unwrap();
    sync
}

/// `(id, urlFilter)` of every published rule
fn published(config: &Config) -> Vec<(RuleId, String)> {
    let raw = fs::read_to_string(&config.enforcement.ruleset_path).unwrap();
    let rules: Vec<Value> = serde_json::from_str(&raw).unwrap();
    rules
        .iter()
        .map(|r| {
            (
                r["id"].as_u64().unwrap() as RuleId,
                r["condition"]["urlFilter"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_crash_leftover_ruleset_is_rebuilt_from_snapshot() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    FileStore::new(&config.storage.path)
        .save(&snapshot_with(&[(1, "a.com", true), (2, "b.com", false)]))
        .await
        .unwrap();
    let stale = json!([
        {"id": 1, "priority": 1,
         "action": {"type": "redirect", "redirect": {"extensionPath": "/interceptor.html"}},
         "condition": {"urlFilter": "old.com", "resourceTypes": ["main_frame"]}},
        {"id": 5, "priority": 1,
         "action": {"type": "redirect", "redirect": {"extensionPath": "/interceptor.html"}},
         "condition": {"urlFilter": "ghost.com", "resourceTypes": ["main_frame"]}}
    ]);
    fs::write(&config.enforcement.ruleset_path, stale.to_string()).unwrap();

    let sync = boot(&config).await;

    assert_eq!(published(&config), vec![(1, "a.com".to_string())]);
    assert!(sync.check().await.unwrap().is_healthy());
    assert_eq!(sync.next_id(), 3);
}

#[tokio::test]
async fn test_next_id_after_restart_follows_highest_persisted_id() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    {
        let mut sync = boot(&config).await;
        sync.add("a.com").await.unwrap();
        sync.add("b.com").await.unwrap();
        sync.add("c.com").await.unwrap();
        sync.remove(1).await.unwrap();
    }

    let mut sync = boot(&config).await;
    let rule = sync.add("d.com").await.unwrap();

    assert_eq!(rule.id, 4);
    assert_eq!(
        published(&config),
        vec![(2, "b.com".to_string()), (3, "c.com".to_string()), (4, "d.com".to_string())]
    );
}

#[tokio::test]
async fn test_restart_reproduces_records_exactly() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let before = {
        let mut sync = boot(&config).await;
        sync.add("a.com").await.unwrap();
        sync.add("b.com/*").await.unwrap();
        sync.toggle(2).await.unwrap();
        sync.list().unwrap()
    };

    let sync = boot(&config).await;

    assert_eq!(sync.list().unwrap(), before);
    assert_eq!(published(&config), vec![(1, "a.com".to_string())]);
}

#[tokio::test]
async fn test_corrupt_snapshot_is_moved_aside() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    fs::write(&config.storage.path, "filters = [[[ not toml").unwrap();

    let mut sync = boot(&config).await;

    assert_eq!(sync.phase(), Phase::Ready);
    assert!(sync.list().unwrap().is_empty());
    let corrupt = FileStore::new(&config.storage.path).corrupt_path();
    assert_eq!(fs::read_to_string(corrupt).unwrap(), "filters = [[[ not toml");

    assert_eq!(sync.add("a.com").await.unwrap().id, 1);
}

#[tokio::test]
async fn test_divergence_from_failed_enforcement_heals_on_restart() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    {
        let engine = FailingEngine::new();
        let mut sync = FilterSync::new(FileStore::new(&config.storage.path), engine.clone());
        sync.start().await.unwrap();
        engine.fail(true);
        sync.add("a.com").await.unwrap();
        assert_eq!(sync.divergences(), 1);
    }

    let sync = boot(&config).await;

    assert_eq!(published(&config), vec![(1, "a.com".to_string())]);
    assert!(sync.check().await.unwrap().is_healthy());
}

#[tokio::test]
async fn test_settings_are_carried_through_mutations() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let store = FileStore::new(&config.storage.path);
    let settings = Settings {
        strict_mode: true,
        notifications: false,
    };
    store
        .save(&Snapshot::new(vec![rule_at(1, "a.com", true)], settings.clone()))
        .await
        .unwrap();

    {
        let mut sync = boot(&config).await;
        sync.add("b.com").await.unwrap();
        sync.clear_all().await.unwrap();
    }

    let snapshot = store.load().await.unwrap();
    assert!(snapshot.filters.is_empty());
    assert_eq!(snapshot.settings, settings);
}

#[tokio::test]
async fn test_missing_directory_is_created_on_first_write() {
    let dir = tempdir().unwrap();
    let config = config_in(&dir.path().join("nested").join("state"));

    let mut sync = boot(&config).await;
    sync.add("a.com").await.unwrap();

    assert!(config.storage.path.exists());
    assert!(config.enforcement.ruleset_path.exists());
}
