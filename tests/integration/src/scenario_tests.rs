//! End-to-end scenarios through a daemon socket
//!
//! Front ends talk newline-delimited JSON to a `FocusServer` hosting a core
//! built from a real config, exactly as focusd wires it.
#![cfg(unix)]

use std::path::Path;
use std::time::Duration;

use focus_core::{Config, Error, FilterService, FilterSync};
use focus_daemon::FocusServer;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Daemon {
    stop: oneshot::Sender<()>,
    join: JoinHandle<()>,
    core: JoinHandle<FilterSync>,
}

impl Daemon {
    async fn start(config: &Config) -> Self {
        let mut sync = config.build_sync().await.unwrap();
        sync.start().await.unwrap();
        let (handle, core) = FilterService::spawn_with_capacity(sync, config.server.queue_depth);
        let server = FocusServer::new(handle);
        let socket = config.server.socket.clone();
        let (stop, stopped) = oneshot::channel::<()>();
        let join = tokio::spawn(async move {
            server
                .run_unix(&socket, async {
                    let _ = stopped.await;
                })
                .await
                .unwrap();
        });
        Self { stop, join, core }
    }

    async fn shutdown(self) {
        let _ = self.stop.send(());
        self.join.await.unwrap();
    }

    /// Stop serving and wait for the core to release the filters
    ///
    /// Every front end must have disconnected first.
    async fn shutdown_and_release(self) -> FilterSync {
        let _ = self.stop.send(());
        self.join.await.unwrap();
        self.core.await.unwrap()
    }
}

struct FrontEnd {
    lines: tokio::io::Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl FrontEnd {
    async fn attach(socket: &Path) -> Self {
        for _ in 0..50 {
            if let Ok(stream) = UnixStream::connect(socket).await {
                let (read, writer) = stream.into_split();
                return Self {
                    lines: BufReader::new(read).lines(),
                    writer,
                };
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("daemon never came up at {}", socket.display());
    }

    async fn send(&mut self, request: Value) -> Value {
        let mut line = request.to_string();
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await.unwrap();
        let reply = self.lines.next_line().await.unwrap().unwrap();
        serde_json::from_str(&reply).unwrap()
    }
}

fn workspace() -> (TempDir, Config) {
    let dir = tempdir().unwrap();
    let mut config = Config::default();
    config.storage.path = dir.path().join("filters.toml");
    config.enforcement.ruleset_path = dir.path().join("ruleset.json");
    config.server.socket = dir.path().join("focusd.sock");
    (dir, config)
}

fn published_ids(path: &Path) -> Vec<u64> {
    let raw = std::fs::read_to_string(path).unwrap();
    let rules: Vec<Value> = serde_json::from_str(&raw).unwrap();
    rules.iter().map(|r| r["id"].as_u64().unwrap()).collect()
}

#[tokio::test]
async fn test_cold_start_add_is_enforced() {
    let (_dir, config) = workspace();
    let daemon = Daemon::start(&config).await;
    let mut ui = FrontEnd::attach(&config.server.socket).await;

    let rule = ui.send(json!({"type": "ADD_FILTER", "pattern": "example.com/*"})).await;

    assert_eq!(rule["id"], 1);
    assert_eq!(rule["pattern"], "example.com/*");
    assert_eq!(rule["enabled"], true);
    assert_eq!(published_ids(&config.enforcement.ruleset_path), vec![1]);
    daemon.shutdown().await;
}

#[tokio::test]
async fn test_toggle_withdraws_only_that_enforcement_entry() {
    let (_dir, config) = workspace();
    let daemon = Daemon::start(&config).await;
    let mut ui = FrontEnd::attach(&config.server.socket).await;

    ui.send(json!({"type": "ADD_FILTER", "pattern": "a.com"})).await;
    ui.send(json!({"type": "ADD_FILTER", "pattern": "b.com"})).await;
    let toggled = ui.send(json!({"type": "TOGGLE_FILTER", "id": 1})).await;

    assert_eq!(toggled["enabled"], false);
    assert_eq!(published_ids(&config.enforcement.ruleset_path), vec![2]);
    daemon.shutdown().await;
}

#[tokio::test]
async fn test_restart_does_not_reuse_ids() {
    let (_dir, config) = workspace();
    let daemon = Daemon::start(&config).await;
    let mut ui = FrontEnd::attach(&config.server.socket).await;
    ui.send(json!({"type": "ADD_FILTER", "pattern": "a.com"})).await;
    drop(ui);
    daemon.shutdown_and_release().await;

    let daemon = Daemon::start(&config).await;
    let mut ui = FrontEnd::attach(&config.server.socket).await;
    let rule = ui.send(json!({"type": "ADD_FILTER", "pattern": "b.com"})).await;

    assert_eq!(rule["id"], 2);
    let listed = ui.send(json!({"type": "GET_FILTERS"})).await;
    assert_eq!(listed.as_array().unwrap().len(), 2);
    daemon.shutdown().await;
}

#[tokio::test]
async fn test_remove_of_unknown_id_changes_nothing() {
    let (_dir, config) = workspace();
    let daemon = Daemon::start(&config).await;
    let mut ui = FrontEnd::attach(&config.server.socket).await;
    ui.send(json!({"type": "ADD_FILTER", "pattern": "a.com"})).await;
    let before = std::fs::read_to_string(&config.storage.path).unwrap();

    let removed = ui.send(json!({"type": "REMOVE_FILTER", "id": 999})).await;

    assert_eq!(removed, json!(false));
    assert_eq!(std::fs::read_to_string(&config.storage.path).unwrap(), before);
    assert_eq!(published_ids(&config.enforcement.ruleset_path), vec![1]);
    daemon.shutdown().await;
}

#[tokio::test]
async fn test_front_ends_see_each_others_changes() {
    let (_dir, config) = workspace();
    let daemon = Daemon::start(&config).await;
    let mut terminal = FrontEnd::attach(&config.server.socket).await;
    let mut script = FrontEnd::attach(&config.server.socket).await;

    terminal.send(json!({"type": "ADD_FILTER", "pattern": "a.com"})).await;
    script.send(json!({"type": "CLEAR_ALL"})).await;
    let listed = terminal.send(json!({"type": "GET_FILTERS"})).await;

    assert_eq!(listed, json!([]));
    assert!(published_ids(&config.enforcement.ruleset_path).is_empty());
    let unknown = script.send(json!({"type": "EXPORT"})).await;
    assert_eq!(unknown, json!({"error": "Unknown request type"}));
    daemon.shutdown().await;
}

#[tokio::test]
async fn test_second_core_cannot_take_over_running_daemon_files() {
    let (_dir, config) = workspace();
    let daemon = Daemon::start(&config).await;
    let mut ui = FrontEnd::attach(&config.server.socket).await;
    ui.send(json!({"type": "ADD_FILTER", "pattern": "a.com"})).await;

    let mut embedded = config.build_sync().await.unwrap();
    let refused = embedded.start().await;

    assert!(matches!(refused, Err(Error::LockFailed { .. })));
    let rule = ui.send(json!({"type": "ADD_FILTER", "pattern": "b.com"})).await;
    assert_eq!(rule["id"], 2);
    assert_eq!(published_ids(&config.enforcement.ruleset_path), vec![1, 2]);

    drop(ui);
    let core = daemon.shutdown_and_release().await;
    drop(core);
    embedded.start().await.unwrap();
    assert_eq!(embedded.list().unwrap().len(), 2);
    assert_eq!(embedded.next_id(), 3);
}
