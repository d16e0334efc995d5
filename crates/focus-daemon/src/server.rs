//! Line-oriented JSON server
//!
//! Transport only: every request is handed to the [`ServiceHandle`] and the
//! reply value is written back verbatim.

use std::future::Future;
use std::path::Path;

use focus_core::ServiceHandle;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

/// Serves the command channel of one filter service
///
/// Cloning is cheap; every connection task holds its own clone.
///
/// # Example
///
/// ```ignore
/// use focus_core::{FilterService, FilterSync, MemoryEngine, MemoryStore};
/// use focus_daemon::FocusServer;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let sync = FilterSync::new(MemoryStore::new(), MemoryEngine::new());
///     let (handle, _task) = FilterService::spawn(sync);
///     FocusServer::new(handle).run_stdio().await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct FocusServer {
    handle: ServiceHandle,
}

impl FocusServer {
    pub fn new(handle: ServiceHandle) -> Self {
        Self { handle }
    }

    /// The service this server forwards to
    pub fn handle(&self) -> &ServiceHandle {
        &self.handle
    }

    /// Handle a single request line
    ///
    /// Returns the serialized reply. Only a line that is not JSON at all is
    /// an `Err`; command failures come back as `{"error": ...}` replies.
    pub async fn handle_message(&self, message: &str) -> Result<String> {
        let raw: Value = serde_json::from_str(message)?;
        let reply = self.handle.dispatch(raw).await;
        serde_json::to_string(&reply).map_err(Error::from)
    }

    /// Answer request lines from `reader` until it reaches end of input
    pub async fn serve_connection<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            tracing::debug!(request = %line, "Received message");

            let response = match self.handle_message(line).await {
                Ok(response) => response,
                Err(e) => json!({ "error": format!("Invalid request: {}", e) }).to_string(),
            };

            tracing::debug!(response = %response, "Sending reply");
            writer.write_all(response.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok(())
    }

    /// Serve a single client on stdin/stdout
    ///
    /// Returns once stdin is closed.
    pub async fn run_stdio(&self) -> Result<()> {
        tracing::info!("Listening on stdio");
        let stdin = BufReader::new(tokio::io::stdin());
        self.serve_connection(stdin, tokio::io::stdout()).await
    }

    /// Bind `path` and serve every client that connects until `shutdown` resolves
    ///
    /// The socket file is removed again on the way out.
    #[cfg(unix)]
    pub async fn run_unix(&self, path: &Path, shutdown: impl Future<Output = ()>) -> Result<()> {
        let listener = bind_socket(path).await?;
        tracing::info!(socket = %path.display(), "Listening on unix socket");

        tokio::pin!(shutdown);
        let result = loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let stream = match accepted {
                        Ok((stream, _)) => stream,
                        Err(e) => break Err(Error::from(e)),
                    };
                    let server = self.clone();
                    tokio::spawn(async move {
                        tracing::debug!("Client connected");
                        let (read, write) = stream.into_split();
                        if let Err(e) = server.serve_connection(BufReader::new(read), write).await {
                            tracing::warn!(error = %e, "Connection closed with error");
                        }
                        tracing::debug!("Client disconnected");
                    });
                }
                () = &mut shutdown => break Ok(()),
            }
        };

        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!(socket = %path.display(), error = %e, "Could not remove socket file");
        }
        result
    }
}

/// Bind a listener at `path`, replacing a socket file left by a dead daemon
#[cfg(unix)]
pub async fn bind_socket(path: &Path) -> Result<tokio::net::UnixListener> {
    use tokio::net::{UnixListener, UnixStream};

    if path.exists() {
        if UnixStream::connect(path).await.is_ok() {
            return Err(Error::SocketInUse {
                path: path.to_path_buf(),
            });
        }
        tracing::info!(socket = %path.display(), "Removing stale socket file");
        std::fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(UnixListener::bind(path)?)
}
