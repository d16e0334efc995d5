//! Connection to the rule sync core
//!
//! Every client speaks the same JSON command channel: requests go out as
//! `{"type": ...}` objects and replies come back as bare values or
//! `{"error": ...}`. [`SocketClient`] talks to a running `focusd`,
//! [`LocalClient`] hosts a core in-process.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use focus_core::{CheckReport, FilterRule, Request, RuleId, ServiceHandle};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{CliError, Result};

/// A front end's view of the command channel
#[async_trait]
pub trait FilterClient: Send + Sync {
    /// Send one request and return the raw reply value
    async fn send(&self, request: Request) -> Result<Value>;

    async fn add(&self, pattern: &str) -> Result<FilterRule> {
        let reply = self
            .send(Request::AddFilter {
                pattern: pattern.to_string(),
            })
            .await?;
        decode(reply)
    }

    async fn remove(&self, id: RuleId) -> Result<bool> {
        decode(self.send(Request::RemoveFilter { id }).await?)
    }

    async fn toggle(&self, id: RuleId) -> Result<Option<FilterRule>> {
        decode(self.send(Request::ToggleFilter { id }).await?)
    }

    async fn list(&self) -> Result<Vec<FilterRule>> {
        decode(self.send(Request::GetFilters).await?)
    }

    async fn clear_all(&self) -> Result<()> {
        self.send(Request::ClearAll).await.and_then(expect_ok)?;
        Ok(())
    }

    async fn check(&self) -> Result<CheckReport> {
        decode(self.send(Request::CheckSync).await?)
    }
}

fn expect_ok(reply: Value) -> Result<Value> {
    match reply.get("error").and_then(Value::as_str) {
        Some(message) => Err(CliError::Daemon {
            message: message.to_string(),
        }),
        None => Ok(reply),
    }
}

fn decode<T: DeserializeOwned>(reply: Value) -> Result<T> {
    let reply = expect_ok(reply)?;
    Ok(serde_json::from_value(reply)?)
}

/// Client for a `focusd` listening on a unix socket
#[cfg(unix)]
pub struct SocketClient {
    path: PathBuf,
    conn: Mutex<Connection>,
}

#[cfg(unix)]
struct Connection {
    lines: tokio::io::Lines<tokio::io::BufReader<tokio::net::unix::OwnedReadHalf>>,
    writer: tokio::net::unix::OwnedWriteHalf,
}

#[cfg(unix)]
impl SocketClient {
    pub async fn connect(path: &Path) -> Result<Self> {
        use tokio::io::AsyncBufReadExt;

        let stream = tokio::net::UnixStream::connect(path)
            .await
            .map_err(|source| CliError::Connect {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(socket = %path.display(), "Connected to focusd");
        let (read, writer) = stream.into_split();
        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(Connection {
                lines: tokio::io::BufReader::new(read).lines(),
                writer,
            }),
        })
    }
}

#[cfg(unix)]
#[async_trait]
impl FilterClient for SocketClient {
    async fn send(&self, request: Request) -> Result<Value> {
        use tokio::io::AsyncWriteExt;

        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        tracing::debug!(request = request.kind(), "Sending request");

        let mut conn = self.conn.lock().await;
        conn.writer.write_all(line.as_bytes()).await?;
        conn.writer.flush().await?;
        match conn.lines.next_line().await? {
            Some(reply) => Ok(serde_json::from_str(&reply)?),
            None => Err(CliError::Connect {
                path: self.path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "daemon closed the connection",
                ),
            }),
        }
    }
}

/// Client for a core hosted inside this process
#[derive(Clone)]
pub struct LocalClient {
    handle: ServiceHandle,
}

impl LocalClient {
    pub fn new(handle: ServiceHandle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl FilterClient for LocalClient {
    async fn send(&self, request: Request) -> Result<Value> {
        let raw = serde_json::to_value(&request)?;
        Ok(self.handle.dispatch(raw).await)
    }
}
